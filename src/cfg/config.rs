// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{fs, path::Path};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

use crate::cfg::enums::TransportKind;

/// Every knob named in spec.md §6, grouped by logical domain the way the
/// teacher groups iSCSI negotiation keys.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Config {
    /// Remote device address and transport selection.
    pub network: Network,
    /// Identity and shared secret used for HMAC/PIN authentication.
    pub auth: Auth,
    /// Size/capacity bounds for frames and the pending table.
    #[serde(default)]
    pub limits: Limits,
    /// Per-operation and per-connection timeouts.
    #[serde(default)]
    pub timeouts: Timeouts,
    /// Worker pool sizing for callback dispatch (spec.md §5).
    #[serde(default)]
    pub threads: Threads,
    /// Logging knobs (file + level). The logging subsystem itself is a
    /// non-core collaborator; only the knobs live in core config.
    #[serde(default)]
    pub logging: Logging,
}

/// Remote device address and transport selection.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Network {
    /// Host name or IP address of the device.
    pub host: String,
    /// Port to connect on. Defaults to 8123 (plain) / 8443 (TLS) when
    /// omitted, matching `TransportKind::default_port`.
    #[serde(default)]
    pub port: Option<u16>,
    /// Plain TCP or TLS.
    #[serde(default = "default_transport")]
    pub transport: TransportKind,
}

fn default_transport() -> TransportKind {
    TransportKind::Plain
}

impl Network {
    pub fn resolved_port(&self) -> u16 {
        self.port.unwrap_or_else(|| self.transport.default_port())
    }
}

/// Identity and shared secret for the HMAC/PIN auth envelope (spec.md
/// §4.B).
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Auth {
    /// Identity reported in `HMACauth.identity`. Must have ACL setup on
    /// the device.
    pub identity: i64,
    /// Shared secret used for the HMAC-SHA1 computation. Kept behind a
    /// read-only view by [`crate::session::Session`] (Design Note,
    /// spec.md §9).
    #[serde(with = "hex_bytes")]
    pub hmac_key: Vec<u8>,
    /// PIN used for `InstantSecureErase` (may be empty).
    #[serde(default)]
    pub pin: Vec<u8>,
    /// Cluster version advertised on every request header.
    #[serde(default)]
    pub cluster_version: i64,
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        hex::decode(&s).map_err(serde::de::Error::custom)
    }
}

/// Size/capacity bounds (spec.md §3 "Frame (PDU)" and "Listener state").
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct Limits {
    /// Maximum protobuf / value length per frame.
    #[serde(default = "default_pdu_proto_max_len")]
    pub pdu_proto_max_len: u32,
    /// Pending-table capacity. REDESIGN FLAG (spec.md §9): kinetic-c
    /// hard-codes 1024 with a comment suggesting it should be higher;
    /// exposed here as configurable, default 1024.
    #[serde(default = "default_max_pending_messages")]
    pub max_pending_messages: u16,
    /// Bounded command-queue capacity (MPSC, spec.md §4.F).
    #[serde(default = "default_max_queue_messages")]
    pub max_queue_messages: usize,
    /// Maximum number of sockets the listener multiplexes.
    #[serde(default = "default_max_fds")]
    pub max_fds: usize,
    /// Peer-to-peer recursion depth cap (spec.md §4.D).
    #[serde(default = "default_p2p_depth_cap")]
    pub p2p_depth_cap: u32,
}

fn default_pdu_proto_max_len() -> u32 {
    1024 * 1024
}
fn default_max_pending_messages() -> u16 {
    1024
}
fn default_max_queue_messages() -> usize {
    32
}
fn default_max_fds() -> usize {
    1000
}
fn default_p2p_depth_cap() -> u32 {
    1000
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            pdu_proto_max_len: default_pdu_proto_max_len(),
            max_pending_messages: default_max_pending_messages(),
            max_queue_messages: default_max_queue_messages(),
            max_fds: default_max_fds(),
            p2p_depth_cap: default_p2p_depth_cap(),
        }
    }
}

/// Per-operation and per-connection timeouts (spec.md §5).
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct Timeouts {
    /// Default per-operation deadline. 0 means "no timeout" (spec.md
    /// §8 boundary case).
    #[serde(default = "default_operation_timeout_secs")]
    pub operation_timeout_secs: u64,
    /// Timeout applied to individual socket reads/writes.
    #[serde(default = "default_connection_timeout_secs")]
    pub connection_timeout_secs: u64,
    /// Listener poll/tick interval.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

fn default_operation_timeout_secs() -> u64 {
    20
}
fn default_connection_timeout_secs() -> u64 {
    30
}
fn default_tick_interval_ms() -> u64 {
    100
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            operation_timeout_secs: default_operation_timeout_secs(),
            connection_timeout_secs: default_connection_timeout_secs(),
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

/// Worker pool sizing for completion-callback dispatch (spec.md §5, §6).
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct Threads {
    #[serde(default = "default_one")]
    pub writer_threads: usize,
    #[serde(default = "default_one")]
    pub reader_threads: usize,
    #[serde(default = "default_threadpool")]
    pub max_threadpool_threads: usize,
}

fn default_one() -> usize {
    1
}
fn default_threadpool() -> usize {
    4
}

impl Default for Threads {
    fn default() -> Self {
        Self {
            writer_threads: default_one(),
            reader_threads: default_one(),
            max_threadpool_threads: default_threadpool(),
        }
    }
}

/// Logging knobs (spec.md §6).
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct Logging {
    #[serde(default)]
    pub log_file: Option<String>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Loads configuration from a YAML file, matching the teacher's
    /// `serde_yaml`-based config convention.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {path:?}"))?;
        let cfg: Config = serde_yaml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {path:?}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.limits.max_pending_messages > 0,
            "limits.max_pending_messages must be > 0"
        );
        ensure!(
            self.limits.max_queue_messages > 0,
            "limits.max_queue_messages must be > 0"
        );
        ensure!(
            self.limits.pdu_proto_max_len > 0,
            "limits.pdu_proto_max_len must be > 0"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_literals() {
        let yaml = r#"
network:
  host: "127.0.0.1"
auth:
  identity: 1
  hmac_key: "6173646661736466"
"#;
        let cfg: Config = serde_yaml::from_str(yaml).expect("parses");
        assert_eq!(cfg.limits.max_pending_messages, 1024);
        assert_eq!(cfg.limits.max_queue_messages, 32);
        assert_eq!(cfg.limits.p2p_depth_cap, 1000);
        assert_eq!(cfg.network.resolved_port(), 8123);
    }
}
