// SPDX-License-Identifier: AGPL-3.0-or-later

//! The session (spec.md §3 "Session"): everything an operation builder
//! needs to assemble and send a request, shared behind an `Arc` between
//! the caller, the builders, and the listener task.

use std::sync::{
    Arc,
    atomic::{AtomicI64, AtomicU64, Ordering},
};

use tokio::sync::Mutex as AsyncMutex;

use crate::{
    cfg::config::{Auth, Limits, Timeouts},
    transport::AsyncWriteHalf,
};

/// Shared session state (spec.md §3). Cheap to clone (wraps an `Arc`
/// internally via [`Session::shared`]); the sequence counter and write
/// half are the only pieces of mutable state.
pub struct Session {
    identity: i64,
    hmac_key: Vec<u8>,
    pin: Vec<u8>,
    cluster_version: AtomicI64,
    sequence: AtomicU64,
    operation_timeout_secs: u64,
    /// Peer-to-peer recursion depth cap (spec.md §4.D, `Limits::p2p_depth_cap`).
    p2p_depth_cap: u32,
    /// Guards the transport's write half so two requests never interleave
    /// their header/protobuf/value writes (spec.md §4.E "write lock").
    writer: AsyncMutex<Box<dyn AsyncWriteHalf>>,
}

impl Session {
    pub fn new(auth: &Auth, timeouts: &Timeouts, limits: &Limits, writer: Box<dyn AsyncWriteHalf>) -> Arc<Self> {
        Arc::new(Self {
            identity: auth.identity,
            hmac_key: auth.hmac_key.clone(),
            pin: auth.pin.clone(),
            cluster_version: AtomicI64::new(auth.cluster_version),
            sequence: AtomicU64::new(1),
            operation_timeout_secs: timeouts.operation_timeout_secs,
            p2p_depth_cap: limits.p2p_depth_cap,
            writer: AsyncMutex::new(writer),
        })
    }

    /// Assigns the next unique-within-session sequence number (spec.md
    /// §3 invariant).
    pub fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::Relaxed)
    }

    pub fn cluster_version(&self) -> i64 {
        self.cluster_version.load(Ordering::Relaxed)
    }

    /// Updates the cluster version after a successful `SETCLUSTERVERSION`
    /// (spec.md §4.D).
    pub fn set_cluster_version(&self, version: i64) {
        self.cluster_version.store(version, Ordering::Relaxed);
    }

    pub fn identity(&self) -> i64 {
        self.identity
    }

    pub fn hmac_key(&self) -> &[u8] {
        &self.hmac_key
    }

    pub fn pin(&self) -> &[u8] {
        &self.pin
    }

    pub fn operation_timeout_secs(&self) -> u64 {
        self.operation_timeout_secs
    }

    pub fn p2p_depth_cap(&self) -> u32 {
        self.p2p_depth_cap
    }

    pub(crate) fn writer(&self) -> &AsyncMutex<Box<dyn AsyncWriteHalf>> {
        &self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullWriter;
    impl tokio::io::AsyncWrite for NullWriter {
        fn poll_write(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            buf: &[u8],
        ) -> std::task::Poll<std::io::Result<usize>> {
            std::task::Poll::Ready(Ok(buf.len()))
        }
        fn poll_flush(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::task::Poll::Ready(Ok(()))
        }
        fn poll_shutdown(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::task::Poll::Ready(Ok(()))
        }
    }
    impl AsyncWriteHalf for NullWriter {}

    fn test_session() -> Arc<Session> {
        let auth = Auth {
            identity: 1,
            hmac_key: b"secret".to_vec(),
            pin: vec![],
            cluster_version: 0,
        };
        let timeouts = Timeouts {
            operation_timeout_secs: 20,
            connection_timeout_secs: 30,
            tick_interval_ms: 100,
        };
        Session::new(&auth, &timeouts, &Limits::default(), Box::new(NullWriter))
    }

    #[test]
    fn sequence_numbers_are_unique_and_increasing() {
        let session = test_session();
        let a = session.next_sequence();
        let b = session.next_sequence();
        assert!(b > a);
    }

    #[test]
    fn cluster_version_updates_are_visible() {
        let session = test_session();
        assert_eq!(session.cluster_version(), 0);
        session.set_cluster_version(7);
        assert_eq!(session.cluster_version(), 7);
    }
}
