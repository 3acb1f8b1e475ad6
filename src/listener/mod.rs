// SPDX-License-Identifier: AGPL-3.0-or-later

//! The listener (spec.md §4.F "Design Note: Cooperative reactor"): a
//! single Tokio task that owns every connection's pending table and read
//! half, driven by `tokio::select!` over a bounded command queue, a
//! `FuturesUnordered` of per-connection reads, and a periodic tick.
//!
//! No socket read, write, or pending-table mutation ever happens outside
//! this task; callers only ever talk to it through [`ListenerHandle`].

pub mod command;

use std::{collections::HashMap, sync::Arc, time::Duration};

use bytes::Bytes;
use futures::stream::{FuturesUnordered, StreamExt};
use prost::Message as _;
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::Instant,
};
use tracing::{debug, warn};

pub use command::{ConnId, ListenerCommand};

use crate::{
    codec::frame,
    error::FrameError,
    op::{self, Operation},
    pending::PendingTable,
    proto,
    session::Session,
    status::Status,
    transport::AsyncReadHalf,
    worker::{CallbackJob, WorkerPool},
};

/// A handle callers use to talk to a running listener task.
#[derive(Clone)]
pub struct ListenerHandle {
    cmd_tx: mpsc::Sender<ListenerCommand>,
}

impl ListenerHandle {
    pub async fn add_connection(&self, id: ConnId, session: Arc<Session>, reader: Box<dyn AsyncReadHalf>) {
        let _ = self
            .cmd_tx
            .send(ListenerCommand::AddConnection { id, session, reader })
            .await;
    }

    pub async fn close_connection(&self, id: ConnId) {
        let _ = self.cmd_tx.send(ListenerCommand::CloseConnection { id }).await;
    }

    /// Hands an already-built request to the listener for correlation
    /// and transmission. Returns `Err` only if the command queue itself
    /// is closed (listener shut down); per-operation overload/send
    /// failures are reported to the operation's own callback instead.
    pub async fn submit(
        &self,
        id: ConnId,
        operation: Operation,
        message: proto::Message,
        value: Bytes,
        deadline: Option<Instant>,
    ) -> Result<(), mpsc::error::SendError<ListenerCommand>> {
        self.cmd_tx
            .send(ListenerCommand::Submit { id, operation, message, value, deadline })
            .await
    }

    pub async fn shutdown(&self) {
        let _ = self.cmd_tx.send(ListenerCommand::Shutdown).await;
    }
}

struct Connection {
    session: Arc<Session>,
    pending: PendingTable,
}

type ReadOutcome = (ConnId, Box<dyn AsyncReadHalf>, Result<frame::Frame, FrameError>);

async fn read_one(id: ConnId, mut reader: Box<dyn AsyncReadHalf>, max_len: u32) -> ReadOutcome {
    let result = frame::read_frame(&mut reader, max_len).await;
    (id, reader, result)
}

/// Spawns the listener task, returning a handle and its `JoinHandle`.
/// `callback_workers` sizes the worker pool that runs user completion
/// callbacks off this task (spec.md §5 "Worker pool").
pub fn spawn(
    max_len: u32,
    max_queue_messages: usize,
    tick_interval: Duration,
    pending_capacity: u16,
    callback_workers: usize,
) -> (ListenerHandle, JoinHandle<()>) {
    let (cmd_tx, cmd_rx) = mpsc::channel(max_queue_messages);
    let workers = WorkerPool::spawn(callback_workers);
    let join = tokio::spawn(run(cmd_rx, max_len, tick_interval, pending_capacity, workers));
    (ListenerHandle { cmd_tx }, join)
}

async fn run(
    mut cmd_rx: mpsc::Receiver<ListenerCommand>,
    max_len: u32,
    tick_interval: Duration,
    pending_capacity: u16,
    workers: WorkerPool,
) {
    let mut conns: HashMap<ConnId, Connection> = HashMap::new();
    let mut reads: FuturesUnordered<std::pin::Pin<Box<dyn std::future::Future<Output = ReadOutcome> + Send>>> =
        FuturesUnordered::new();
    let mut tick = tokio::time::interval(tick_interval);

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(ListenerCommand::AddConnection { id, session, reader }) => {
                        conns.insert(id, Connection { session, pending: PendingTable::new(pending_capacity) });
                        reads.push(Box::pin(read_one(id, reader, max_len)));
                    },
                    Some(ListenerCommand::CloseConnection { id }) => {
                        close_connection(&mut conns, id, &workers).await;
                    },
                    Some(ListenerCommand::Submit { id, operation, message, value, deadline }) => {
                        handle_submit(&mut conns, max_len, id, operation, message, value, deadline, &workers).await;
                    },
                    Some(ListenerCommand::Shutdown) | None => {
                        for (_, mut conn) in conns.drain() {
                            for op in conn.pending.drain_all() {
                                complete(&workers, op, Status::ConnClosed, None, Bytes::new()).await;
                            }
                        }
                        return;
                    },
                }
            },
            Some((id, reader, result)) = reads.next(), if !reads.is_empty() => {
                match result {
                    Ok(frame) => {
                        handle_frame(&mut conns, id, &frame, &workers).await;
                        reads.push(Box::pin(read_one(id, reader, max_len)));
                    },
                    Err(e) if e.is_decode_error() => {
                        // Socket is fine, frame content wasn't (spec.md §4.F/§7:
                        // "the session remains open and resyncs on the next
                        // frame"). Only the message-level reply that decoded
                        // far enough to expose an ack sequence can be blamed on
                        // a specific operation; everything else is dropped with
                        // no pending-table effect.
                        warn!(?id, error = %e, "frame decode failed, resyncing");
                        if let FrameError::ValueTooShort { message, .. } = &e {
                            fail_in_assembly_op(&mut conns, id, message, &workers).await;
                        }
                        reads.push(Box::pin(read_one(id, reader, max_len)));
                    },
                    Err(e) => {
                        warn!(?id, error = %e, "connection read failed, closing");
                        close_connection(&mut conns, id, &workers).await;
                    },
                }
            },
            _ = tick.tick() => {
                let now = Instant::now();
                for conn in conns.values_mut() {
                    for op in conn.pending.drain_expired(now) {
                        complete(&workers, op, Status::OperationTimedOut, None, Bytes::new()).await;
                    }
                }
            },
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn handle_submit(
    conns: &mut HashMap<ConnId, Connection>,
    max_len: u32,
    id: ConnId,
    operation: Operation,
    message: proto::Message,
    value: Bytes,
    deadline: Option<Instant>,
    workers: &WorkerPool,
) {
    let Some(conn) = conns.get_mut(&id) else {
        complete(workers, operation, Status::ConnClosed, None, Bytes::new()).await;
        return;
    };

    let session = conn.session.clone();
    let slot = match conn.pending.acquire(operation, deadline) {
        Ok(slot) => slot,
        Err((operation, _)) => {
            complete(workers, operation, Status::SessionOverloaded, None, Bytes::new()).await;
            return;
        },
    };

    if let Err(e) = op::sender::send_request(&session, max_len, &message, &value).await
        && let Some(op) = conn.pending.release(slot)
    {
        complete(workers, op, e.as_status(), None, Bytes::new()).await;
    }
}

/// The value payload was short, but the `Message` that precedes it on the
/// wire decoded fine. If its `Command` and `ack_sequence` are recoverable,
/// fail exactly that in-assembly operation with `PROTO_DECODE`; any other
/// pending operation on the connection is left untouched.
async fn fail_in_assembly_op(
    conns: &mut HashMap<ConnId, Connection>,
    id: ConnId,
    message: &proto::Message,
    workers: &WorkerPool,
) {
    let Some(conn) = conns.get_mut(&id) else { return };
    let Some(bytes) = message.command_bytes.as_deref() else { return };
    let Ok(command) = proto::Command::decode(bytes) else { return };
    let Some(ack_sequence) = command.header.and_then(|h| h.ack_sequence) else { return };

    if let Some(slot) = conn.pending.lookup(ack_sequence as u64)
        && let Some(op) = conn.pending.release(slot)
    {
        complete(workers, op, Status::ProtoDecode, None, Bytes::new()).await;
    }
}

async fn handle_frame(conns: &mut HashMap<ConnId, Connection>, id: ConnId, frame: &frame::Frame, workers: &WorkerPool) {
    let Some(conn) = conns.get_mut(&id) else { return };

    let command = match frame.message.command_bytes.as_deref() {
        Some(bytes) => match proto::Command::decode(bytes) {
            Ok(c) => c,
            Err(e) => {
                warn!(?id, error = %e, "failed to decode reply command");
                return;
            },
        },
        None => return,
    };

    let header = command.header.unwrap_or_default();
    let Some(ack_sequence) = header.ack_sequence else {
        maybe_reply_unsolicited_noop(&conn.session, &header).await;
        return;
    };

    if let Some(id) = conn.pending.lookup(ack_sequence as u64) {
        if let Some(op) = conn.pending.release(id) {
            let status = status_of(&command);
            complete(workers, op, status, Some(&command), frame.value.clone()).await;
        }
    } else {
        debug!(ack_sequence, "no pending operation for ack sequence, dropping reply");
    }
}

/// Mirrors kinetic-c's unsolicited-NOP keep-alive handling
/// (SPEC_FULL.md §4 "Supplemented from original_source/"): a NOOP with
/// no ack sequence is the device pinging us; reply in kind.
async fn maybe_reply_unsolicited_noop(session: &Arc<Session>, header: &proto::Header) {
    if header.message_type != Some(proto::header::MessageType::Noop as i32) {
        return;
    }
    let reply = proto::Command {
        header: Some(proto::Header {
            message_type: Some(proto::header::MessageType::NoopResponse as i32),
            ..Default::default()
        }),
        ..Default::default()
    };
    let message = proto::Message {
        command_bytes: Some(reply.encode_to_vec()),
        ..Default::default()
    };
    if let Err(e) = op::sender::send_request(session, u32::MAX, &message, &[]).await {
        warn!(error = %e, "failed to answer unsolicited keep-alive");
    }
}

fn status_of(command: &proto::Command) -> Status {
    command
        .status
        .as_ref()
        .and_then(|s| s.code)
        .and_then(|c| proto::status::StatusCode::try_from(c).ok())
        .map(Status::from_proto_code)
        .unwrap_or(Status::Invalid)
}

async fn complete(workers: &WorkerPool, op: Operation, status: Status, command: Option<&proto::Command>, value: Bytes) {
    workers
        .submit(CallbackJob {
            op,
            status,
            command: command.cloned(),
            value,
        })
        .await;
}

async fn close_connection(conns: &mut HashMap<ConnId, Connection>, id: ConnId, workers: &WorkerPool) {
    if let Some(mut conn) = conns.remove(&id) {
        for op in conn.pending.drain_all() {
            complete(workers, op, Status::ConnClosed, None, Bytes::new()).await;
        }
    }
}
