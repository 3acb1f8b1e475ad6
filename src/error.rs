// SPDX-License-Identifier: AGPL-3.0-or-later

//! Error kinds at the core's synchronous seams (spec.md §7).
//!
//! These are distinct from [`crate::status::Status`]: a `FrameError` or
//! `SendError` is returned synchronously to the caller and never reaches
//! a completion callback, whereas `Status` is what a callback eventually
//! observes.

use thiserror::Error;

use crate::{proto, status::Status};

/// Errors raised while decoding a frame off the wire (spec.md §4.A).
///
/// [`FrameError::Io`] is a transport-level failure: the socket itself is
/// broken, so the connection cannot be resynced and must be closed.
/// Every other variant means the expected number of bytes arrived but
/// their *content* was invalid; per spec.md §4.F/§7 these are decode
/// errors, not transport errors, so the session stays open and resyncs
/// on the next frame.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("header too short: need 9 bytes, got {0}")]
    HeaderTooShort(usize),
    #[error("bad version magic: expected 0x46 ('F'), got 0x{0:02x}")]
    BadMagic(u8),
    #[error("protobuf length {0} exceeds PDU_PROTO_MAX_LEN ({1})")]
    BufferOverrun(u32, u32),
    #[error("failed to decode Message protobuf: {0}")]
    ProtoDecode(#[from] prost::DecodeError),
    #[error("value shorter than declared: need {declared} bytes, got {got}")]
    ValueTooShort {
        declared: u32,
        got: usize,
        /// The `Message` that decoded fine before the value read failed,
        /// so the caller can still recover `ack_sequence` and fail only
        /// the one in-assembly operation instead of the whole session.
        message: Box<proto::Message>,
    },
}

impl FrameError {
    pub fn as_status(&self) -> Status {
        match self {
            FrameError::Io(_) => Status::ConnClosed,
            FrameError::HeaderTooShort(_) | FrameError::BadMagic(_) => Status::ProtoDecode,
            FrameError::BufferOverrun(..) => Status::BufferOverrun,
            FrameError::ProtoDecode(_) => Status::ProtoDecode,
            FrameError::ValueTooShort { .. } => Status::ProtoDecode,
        }
    }

    /// `true` for decode-class errors where the socket is fine but the
    /// frame content wasn't; these resync rather than close the
    /// connection (spec.md §4.F, §7: "malformed header magic acts as a
    /// weak resync").
    pub fn is_decode_error(&self) -> bool {
        !matches!(self, FrameError::Io(_))
    }
}

/// Errors raised synchronously from [`crate::op::sender::send_request`]
/// (spec.md §4.E). The caller observes these directly; the completion
/// callback is NOT invoked.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("packed command exceeds PDU_PROTO_MAX_LEN ({0} > {1})")]
    BufferOverrun(usize, u32),
    #[error("too many operations are in flight (queue capacity reached)")]
    SessionOverloaded,
    #[error("connection is closed")]
    ConnClosed,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SendError {
    pub fn as_status(&self) -> Status {
        match self {
            SendError::BufferOverrun(..) => Status::BufferOverrun,
            SendError::SessionOverloaded => Status::SessionOverloaded,
            SendError::ConnClosed | SendError::Io(_) => Status::ConnClosed,
        }
    }
}

/// Errors raised while constructing an operation (spec.md §4.D), before
/// it is ever enqueued.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("peer-to-peer operation nesting exceeds the depth cap (1000)")]
    P2pDepthExceeded,
    #[error("operation is missing a required field: {0}")]
    InvalidOperation(&'static str),
}

impl BuildError {
    pub fn as_status(&self) -> Status {
        match self {
            BuildError::P2pDepthExceeded | BuildError::InvalidOperation(_) => {
                Status::OperationInvalid
            },
        }
    }
}
