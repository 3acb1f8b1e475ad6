//! Per-message-type operation builders (spec.md §4.D).
//!
//! Each builder: increments the session's sequence counter, populates
//! the command header/body, decides the auth mode, and returns a
//! `(Message, OperationKind)` pair ready for [`crate::op::sender::send_request`].
//! None of these ever touch the network or block.

// SPDX-License-Identifier: AGPL-3.0-or-later

pub mod cluster_version;
pub mod delete;
pub mod flush;
pub mod get;
pub mod get_log;
pub mod key_range;
pub mod noop;
pub mod p2p;
pub mod put;
pub mod secure_erase;

use prost::Message as _;

use crate::{codec::auth, op::OperationKind, proto, session::Session};

/// Builds the `Command` header common to every message (cluster
/// version, sequence, message type) and packs it + auth into a
/// `Message`. Shared by every per-type builder in this module.
pub(super) fn finish(
    session: &Session,
    body: Option<proto::Body>,
    kind: &OperationKind,
) -> (proto::Message, u64) {
    let sequence = session.next_sequence();

    let header = proto::Header {
        cluster_version: Some(session.cluster_version()),
        sequence: Some(sequence as i64),
        message_type: Some(kind.message_type() as i32),
        timeout: Some(session.operation_timeout_secs() as i64),
        ..Default::default()
    };

    let command = proto::Command {
        header: Some(header),
        body,
        status: None,
    };

    let mut message = proto::Message {
        command_bytes: Some(command.encode_to_vec()),
        ..Default::default()
    };

    if kind.uses_pin_auth() {
        auth::apply_pin_auth(&mut message, session.pin());
    } else {
        auth::apply_hmac_auth(&mut message, session.identity(), session.hmac_key());
    }

    (message, sequence)
}
