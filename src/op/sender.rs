// SPDX-License-Identifier: AGPL-3.0-or-later

//! Writing a built request to the wire (spec.md §4.E).
//!
//! Called from the listener task only: the write half lives behind
//! [`crate::session::Session`]'s mutex so corking is atomic across the
//! header/protobuf/value triple, matching kinetic-c's
//! `KineticOperation_SendRequest` write-mutex critical section.

use tracing::trace;
use prost::Message as _;

use crate::{codec::frame, error::SendError, proto, session::Session};

/// Serializes and writes one request. Returns synchronously to the
/// caller on failure; the operation's completion callback is never
/// invoked from here (spec.md §7: synchronous failures bypass the
/// callback entirely).
pub async fn send_request(
    session: &Session,
    max_len: u32,
    message: &proto::Message,
    value: &[u8],
) -> Result<(), SendError> {
    let packed_len = message.encoded_len();
    if packed_len as u32 > max_len {
        return Err(SendError::BufferOverrun(packed_len, max_len));
    }

    let mut writer = session.writer().lock().await;
    writer.begin_packet();
    let result = frame::write_frame(&mut *writer, message, value, max_len).await;
    writer.finish_packet();

    result.map_err(|e| match e {
        crate::error::FrameError::BufferOverrun(got, max) => {
            SendError::BufferOverrun(got as usize, max)
        },
        _ => SendError::Io(std::io::Error::other(e)),
    })?;

    trace!(bytes = packed_len + value.len(), "wrote request frame");
    Ok(())
}
