// SPDX-License-Identifier: AGPL-3.0-or-later

use core::fmt;

use serde::{Deserialize, Serialize};

/// Transport selection for a session's TCP connection.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Plain,
    Tls,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TransportKind::Plain => "plain",
            TransportKind::Tls => "tls",
        })
    }
}

impl TransportKind {
    /// Default device port for this transport kind (spec.md §6).
    pub fn default_port(self) -> u16 {
        match self {
            TransportKind::Plain => 8123,
            TransportKind::Tls => 8443,
        }
    }
}
