// SPDX-License-Identifier: AGPL-3.0-or-later

//! The 9-byte frame header and the staged PDU read (spec.md §4.A, §6).
//!
//! ```text
//! 0      : uint8  version magic = 0x46 ('F')
//! 1..4   : uint32 protobuf_length  (be)
//! 5..8   : uint32 value_length     (be)
//! 9..9+P : protobuf Message bytes
//! 9+P..  : value bytes              (value_length)
//! ```

use anyhow::Result;
use bytes::{Bytes, BytesMut};
use prost::Message as _;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use zerocopy::{
    FromBytes, Immutable, IntoBytes, KnownLayout, byteorder::big_endian::U32,
};

use crate::{error::FrameError, proto};

pub const VERSION_MAGIC: u8 = 0x46;
pub const HEADER_LEN: usize = 9;

#[repr(C)]
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Debug, Clone, Copy)]
pub struct Header {
    pub version: u8,
    pub protobuf_len: U32,
    pub value_len: U32,
}

const _: () = assert!(size_of::<Header>() == HEADER_LEN);

impl Header {
    pub fn new(protobuf_len: u32, value_len: u32) -> Self {
        Self {
            version: VERSION_MAGIC,
            protobuf_len: U32::new(protobuf_len),
            value_len: U32::new(value_len),
        }
    }

    pub fn to_bytes(self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out.copy_from_slice(self.as_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FrameError> {
        if bytes.len() < HEADER_LEN {
            return Err(FrameError::HeaderTooShort(bytes.len()));
        }
        let hdr =
            Header::read_from_bytes(&bytes[..HEADER_LEN]).expect("length checked above");
        if hdr.version != VERSION_MAGIC {
            return Err(FrameError::BadMagic(hdr.version));
        }
        Ok(hdr)
    }

    pub fn protobuf_len(&self) -> u32 {
        self.protobuf_len.get()
    }

    pub fn value_len(&self) -> u32 {
        self.value_len.get()
    }
}

/// One fully decoded frame: header, parsed `Message`, and the raw value
/// payload (empty if `value_len == 0`).
#[derive(Debug, Clone)]
pub struct Frame {
    pub header: Header,
    pub message: proto::Message,
    pub value: Bytes,
}

/// Reads exactly one frame off `reader`, honoring `max_len` for both
/// length fields (spec.md §3, §6).
///
/// Each of the three stages (header / protobuf / value) issues its own
/// `read_exact`; a short read simply suspends the `Future` at that
/// `.await` and resumes when the runtime re-polls the socket for
/// readability, so partial reads never lose state.
pub async fn read_frame<R>(reader: &mut R, max_len: u32) -> Result<Frame, FrameError>
where R: AsyncRead + Unpin {
    let mut hdr_buf = [0u8; HEADER_LEN];
    reader.read_exact(&mut hdr_buf).await?;
    let header = Header::from_bytes(&hdr_buf)?;

    if header.protobuf_len() > max_len {
        return Err(FrameError::BufferOverrun(header.protobuf_len(), max_len));
    }
    if header.value_len() > max_len {
        return Err(FrameError::BufferOverrun(header.value_len(), max_len));
    }

    let mut proto_buf = BytesMut::zeroed(header.protobuf_len() as usize);
    reader.read_exact(&mut proto_buf).await?;
    let message = proto::Message::decode(proto_buf.freeze())?;

    let value = if header.value_len() > 0 {
        let mut value_buf = BytesMut::zeroed(header.value_len() as usize);
        if reader.read_exact(&mut value_buf).await.is_err() {
            return Err(FrameError::ValueTooShort {
                declared: header.value_len(),
                got: 0,
                message: Box::new(message),
            });
        }
        value_buf.freeze()
    } else {
        Bytes::new()
    };

    Ok(Frame {
        header,
        message,
        value,
    })
}

/// Writes one frame, corking the transport around the three writes so
/// header + protobuf + value land in one flight (spec.md §4.A, §4.E).
pub async fn write_frame<W>(
    writer: &mut W,
    message: &proto::Message,
    value: &[u8],
    max_len: u32,
) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
{
    let packed_len = message.encoded_len();
    if packed_len as u32 > max_len {
        return Err(FrameError::BufferOverrun(packed_len as u32, max_len));
    }
    if value.len() as u32 > max_len {
        return Err(FrameError::BufferOverrun(value.len() as u32, max_len));
    }

    let header = Header::new(packed_len as u32, value.len() as u32);
    let header_bytes = header.to_bytes();
    let mut proto_bytes = BytesMut::with_capacity(packed_len);
    message
        .encode(&mut proto_bytes)
        .expect("BytesMut has unbounded capacity");

    writer.write_all(&header_bytes).await?;
    writer.write_all(&proto_bytes).await?;
    if !value.is_empty() {
        writer.write_all(value).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trips() {
        let h = Header::new(123, 456);
        let bytes = h.to_bytes();
        let back = Header::from_bytes(&bytes).expect("decodes");
        assert_eq!(back.protobuf_len(), 123);
        assert_eq!(back.value_len(), 456);
        assert_eq!(bytes[0], VERSION_MAGIC);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = Header::new(1, 1).to_bytes();
        bytes[0] = 0x00;
        let err = Header::from_bytes(&bytes).expect_err("bad magic rejected");
        assert!(matches!(err, FrameError::BadMagic(0x00)));
    }

    #[test]
    fn rejects_short_header() {
        let err = Header::from_bytes(&[0x46, 0, 0]).expect_err("short header rejected");
        assert!(matches!(err, FrameError::HeaderTooShort(3)));
    }

    #[tokio::test]
    async fn frame_round_trips_over_a_pipe() {
        let (mut client, mut server) = tokio::io::duplex(8192);

        let cmd = proto::Command {
            header: Some(proto::Header {
                sequence: Some(1),
                ..Default::default()
            }),
            ..Default::default()
        };
        let msg = proto::Message {
            command_bytes: Some(cmd.encode_to_vec()),
            ..Default::default()
        };

        let value = b"hello".to_vec();
        let max_len = 1 << 20;

        let write_fut = write_frame(&mut client, &msg, &value, max_len);
        let read_fut = read_frame(&mut server, max_len);
        let (w, r) = tokio::join!(write_fut, read_fut);
        w.expect("write succeeds");
        let frame = r.expect("read succeeds");

        assert_eq!(frame.header.protobuf_len() as usize, msg.encoded_len());
        assert_eq!(frame.value.as_ref(), value.as_slice());
        let decoded_cmd = proto::Command::decode(
            frame
                .message
                .command_bytes
                .expect("command_bytes set")
                .as_slice(),
        )
        .expect("command decodes");
        assert_eq!(decoded_cmd.header.expect("header set").sequence, Some(1));
    }

    #[tokio::test]
    async fn protobuf_length_at_max_succeeds_at_max_plus_one_fails() {
        let msg = proto::Message {
            command_bytes: Some(vec![0u8; 10]),
            ..Default::default()
        };
        let packed_len = msg.encoded_len() as u32;

        let (mut client, mut server) = tokio::io::duplex(1 << 20);
        let write_fut = write_frame(&mut client, &msg, &[], packed_len);
        let read_fut = read_frame(&mut server, packed_len);
        let (w, r) = tokio::join!(write_fut, read_fut);
        w.expect("exactly at max succeeds");
        r.expect("exactly at max succeeds");

        let (mut client2, _server2) = tokio::io::duplex(1 << 20);
        let err = write_frame(&mut client2, &msg, &[], packed_len - 1)
            .await
            .expect_err("over max by one fails");
        assert!(matches!(err, FrameError::BufferOverrun(..)));
    }
}
