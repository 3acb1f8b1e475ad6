// SPDX-License-Identifier: AGPL-3.0-or-later

//! The non-core, user-facing handle (spec.md §2 component J): owns the
//! listener task and the set of live sessions, and exposes
//! `create_session`/`destroy_session`/`submit` plus one typed method per
//! builder in the catalog. None of the core (codec, pending table,
//! listener, builders) depends on this module; it only calls down into
//! it, per Design Note "Global state" in spec.md §9.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use anyhow::Result;
use bytes::Bytes;
use tokio::{sync::oneshot, task::JoinHandle, time::Instant};

use crate::{
    cfg::config::{Auth, Config, Limits, Network, Timeouts},
    listener::{self, ConnId, ListenerHandle},
    op::{
        self, DeviceInfo, Entry, KeyRange, Operation, OperationKind, P2pRequest,
    },
    proto,
    session::Session,
    status::Status,
    transport,
};

/// Owns the listener task. Cloning is cheap (an `Arc`-backed handle);
/// dropping the last clone does not stop the listener — call
/// [`Client::shutdown`] explicitly.
#[derive(Clone)]
pub struct Client {
    listener: ListenerHandle,
    next_conn_id: Arc<AtomicU64>,
}

impl Client {
    /// Spawns the listener task per `config`. Returns the client handle
    /// and the listener's `JoinHandle`, which the caller should await
    /// after [`Client::shutdown`].
    pub fn start(config: &Config) -> (Self, JoinHandle<()>) {
        let (listener, join) = listener::spawn(
            config.limits.pdu_proto_max_len,
            config.limits.max_queue_messages,
            std::time::Duration::from_millis(config.timeouts.tick_interval_ms),
            config.limits.max_pending_messages,
            config.threads.max_threadpool_threads,
        );
        (
            Self {
                listener,
                next_conn_id: Arc::new(AtomicU64::new(1)),
            },
            join,
        )
    }

    /// Opens a TCP connection to `network` and registers a new session
    /// with the listener (spec.md §6 `create_session`).
    pub async fn create_session(
        &self,
        network: &Network,
        auth: &Auth,
        timeouts: &Timeouts,
        limits: &Limits,
    ) -> Result<SessionHandle> {
        let (reader, writer) = transport::connect_plain(network).await?;
        let session = Session::new(auth, timeouts, limits, writer);
        let id = self.next_conn_id.fetch_add(1, Ordering::Relaxed);
        self.listener.add_connection(id, session.clone(), reader).await;
        Ok(SessionHandle {
            id,
            session,
            listener: self.listener.clone(),
        })
    }

    /// Closes a session's connection, failing any operation still in
    /// flight on it with `CONN_CLOSED` (spec.md §6 `destroy_session`).
    pub async fn destroy_session(&self, session: &SessionHandle) {
        self.listener.close_connection(session.id).await;
    }

    /// Stops the listener, failing every operation still in flight
    /// across every session with `CONN_CLOSED`.
    pub async fn shutdown(&self) {
        self.listener.shutdown().await;
    }
}

/// One authenticated connection. Every typed method here builds a
/// request (`op::builder`), hands it to the listener
/// (`ListenerHandle::submit`), and awaits completion through a oneshot
/// channel installed as the operation's callback.
#[derive(Clone)]
pub struct SessionHandle {
    id: ConnId,
    session: Arc<Session>,
    listener: ListenerHandle,
}

impl SessionHandle {
    async fn submit(&self, sequence: u64, kind: OperationKind, message: proto::Message, value: Bytes) -> Status {
        let (tx, rx) = oneshot::channel();
        let operation = Operation::new(sequence, kind, Box::new(move |result| {
            let _ = tx.send(result.status);
        }));
        let timeout_secs = self.session.operation_timeout_secs();
        let deadline = (timeout_secs > 0).then(|| Instant::now() + std::time::Duration::from_secs(timeout_secs));

        if self.listener.submit(self.id, operation, message, value, deadline).await.is_err() {
            return Status::ConnClosed;
        }
        rx.await.unwrap_or(Status::ConnClosed)
    }

    pub async fn noop(&self) -> Status {
        let (message, sequence, kind) = op::builder::noop::build(&self.session);
        self.submit(sequence, kind, message, Bytes::new()).await
    }

    pub async fn flush(&self) -> Status {
        let (message, sequence, kind) = op::builder::flush::build(&self.session);
        self.submit(sequence, kind, message, Bytes::new()).await
    }

    pub async fn put(&self, entry: Entry) -> (Entry, Status) {
        let value = entry.value.clone();
        let result = op::builder::put::build(&self.session, entry);
        self.run_entry_op(result, value).await
    }

    pub async fn get(&self, entry: Entry) -> (Entry, Status) {
        let result = op::builder::get::build(&self.session, entry, op::builder::get::GetKind::Exact);
        self.run_entry_op(result, Vec::new()).await
    }

    pub async fn get_next(&self, entry: Entry) -> (Entry, Status) {
        let result = op::builder::get::build(&self.session, entry, op::builder::get::GetKind::Next);
        self.run_entry_op(result, Vec::new()).await
    }

    pub async fn get_previous(&self, entry: Entry) -> (Entry, Status) {
        let result = op::builder::get::build(&self.session, entry, op::builder::get::GetKind::Previous);
        self.run_entry_op(result, Vec::new()).await
    }

    pub async fn delete(&self, entry: Entry) -> (Entry, Status) {
        let result = op::builder::delete::build(&self.session, entry);
        self.run_entry_op(result, Vec::new()).await
    }

    /// `value` is the caller-proposed payload; whether it actually rides
    /// the wire is decided by [`OperationKind::sends_value`] (spec.md
    /// §4.D step 4 — true only for PUT, even though GET-family callers
    /// have no payload of their own to offer here).
    async fn run_entry_op(
        &self,
        built: Result<(proto::Message, u64, OperationKind), crate::error::BuildError>,
        value: Vec<u8>,
    ) -> (Entry, Status) {
        let (message, sequence, kind) = match built {
            Ok(v) => v,
            Err(e) => return (Entry::default(), e.as_status()),
        };
        let shared = match &kind {
            OperationKind::Put(e) | OperationKind::Get(e) | OperationKind::GetNext(e) | OperationKind::GetPrevious(e) | OperationKind::Delete(e) => e.clone(),
            _ => unreachable!("run_entry_op only called for Entry-carrying kinds"),
        };
        let wire_value = if kind.sends_value() { Bytes::from(value) } else { Bytes::new() };
        let status = self.submit(sequence, kind, message, wire_value).await;
        let entry = Arc::try_unwrap(shared)
            .map(|m| m.into_inner().expect("entry mutex poisoned"))
            .unwrap_or_else(|arc| arc.lock().expect("entry mutex poisoned").clone());
        (entry, status)
    }

    pub async fn get_key_range(&self, range: KeyRange) -> (KeyRange, Status) {
        let built = op::builder::key_range::build(&self.session, range);
        let (message, sequence, kind) = match built {
            Ok(v) => v,
            Err(e) => return (KeyRange::default(), e.as_status()),
        };
        let shared = match &kind {
            OperationKind::GetKeyRange(r) => r.clone(),
            _ => unreachable!(),
        };
        let status = self.submit(sequence, kind, message, Bytes::new()).await;
        let range = Arc::try_unwrap(shared)
            .map(|m| m.into_inner().expect("range mutex poisoned"))
            .unwrap_or_else(|arc| arc.lock().expect("range mutex poisoned").clone());
        (range, status)
    }

    pub async fn get_log(&self) -> (Option<DeviceInfo>, Status) {
        let (message, sequence, kind) = op::builder::get_log::build(&self.session);
        let shared = match &kind {
            OperationKind::GetLog(s) => s.clone(),
            _ => unreachable!(),
        };
        let status = self.submit(sequence, kind, message, Bytes::new()).await;
        let info = Arc::try_unwrap(shared)
            .map(|m| m.into_inner().expect("device info mutex poisoned"))
            .unwrap_or_else(|arc| arc.lock().expect("device info mutex poisoned").clone());
        (info, status)
    }

    pub async fn p2p_push(&self, request: P2pRequest) -> (P2pRequest, Status) {
        let built = op::builder::p2p::build(&self.session, request);
        let (message, sequence, kind) = match built {
            Ok(v) => v,
            Err(e) => {
                return (
                    P2pRequest {
                        peer: op::P2pPeer { hostname: String::new(), port: 0, tls: false },
                        operations: Vec::new(),
                    },
                    e.as_status(),
                );
            },
        };
        let shared = match &kind {
            OperationKind::P2p(r) => r.clone(),
            _ => unreachable!(),
        };
        let status = self.submit(sequence, kind, message, Bytes::new()).await;
        let request = Arc::try_unwrap(shared)
            .map(|m| m.into_inner().expect("p2p mutex poisoned"))
            .unwrap_or_else(|arc| arc.lock().expect("p2p mutex poisoned").clone());
        (request, status)
    }

    pub async fn set_cluster_version(&self, new_version: i64) -> Status {
        let (message, sequence, kind) = op::builder::cluster_version::build(&self.session, new_version);
        let status = self.submit(sequence, kind, message, Bytes::new()).await;
        if status.is_success() {
            self.session.set_cluster_version(new_version);
        }
        status
    }

    pub async fn instant_secure_erase(&self) -> Status {
        let (message, sequence, kind) = op::builder::secure_erase::build(&self.session);
        self.submit(sequence, kind, message, Bytes::new()).await
    }
}
