// SPDX-License-Identifier: AGPL-3.0-or-later

//! Commands accepted by the listener's bounded queue, mirroring
//! kinetic-c's `MSG_TYPE` (`MSG_ADD_SOCKET` / `MSG_CLOSE_SOCKET` /
//! `MSG_EXPECT_RESPONSE` / `MSG_SHUTDOWN`, see
//! `examples/original_source/src/lib/bus/listener_internal.h`).

use std::sync::Arc;

use bytes::Bytes;
use tokio::time::Instant;

use crate::{op::Operation, proto, session::Session, transport::AsyncReadHalf};

/// Identifies one multiplexed connection within the listener.
pub type ConnId = u64;

pub enum ListenerCommand {
    /// `MSG_ADD_SOCKET`: register a new connection's read half and its
    /// session (which already owns the write half).
    AddConnection {
        id: ConnId,
        session: Arc<Session>,
        reader: Box<dyn AsyncReadHalf>,
    },
    /// `MSG_CLOSE_SOCKET`: drop a connection, failing every outstanding
    /// operation on it with `CONN_CLOSED`.
    CloseConnection { id: ConnId },
    /// `MSG_EXPECT_RESPONSE`: register an in-flight operation so a later
    /// reply (or a timeout) can be correlated and completed.
    Submit {
        id: ConnId,
        operation: Operation,
        message: proto::Message,
        value: Bytes,
        deadline: Option<Instant>,
    },
    /// `MSG_SHUTDOWN`: stop the listener, failing everything in flight.
    Shutdown,
}
