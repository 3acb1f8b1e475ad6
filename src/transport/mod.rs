// SPDX-License-Identifier: AGPL-3.0-or-later

//! The transport is modelled as an abstract byte-duplex (spec.md §1
//! non-goals: "The concrete socket transport (plain vs. TLS)... modelled
//! as an abstract byte-duplex with 'cork'/'uncork' hints").
//!
//! Only the plain-TCP concrete instance is provided here; TLS is a
//! collaborator a caller can plug in by implementing [`AsyncReadHalf`] /
//! [`AsyncWriteHalf`] over `tokio_rustls`'s split halves (see DESIGN.md).

use anyhow::{Context, Result};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::{TcpStream, tcp::OwnedWriteHalf},
};

use crate::cfg::config::Network;

/// The read half of a session's transport.
pub trait AsyncReadHalf: AsyncRead + Unpin + Send {}
impl<T: AsyncRead + Unpin + Send> AsyncReadHalf for T {}

/// The write half of a session's transport, plus the corking hints
/// spec.md §4.A/§4.E describe. The default no-op implementations are
/// correct for any transport that doesn't support coalescing writes;
/// [`crate::op::sender`] additionally builds one contiguous buffer
/// per request so header+protobuf+value always reach the transport in
/// a single `write_all`, regardless of whether cork/uncork do anything.
pub trait AsyncWriteHalf: AsyncWrite + Unpin + Send {
    fn begin_packet(&mut self) {}
    fn finish_packet(&mut self) {}
}
impl AsyncWriteHalf for OwnedWriteHalf {}

/// Connects a plain TCP transport to the device named in `network`.
pub async fn connect_plain(
    network: &Network,
) -> Result<(Box<dyn AsyncReadHalf>, Box<dyn AsyncWriteHalf>)> {
    let addr = format!("{}:{}", network.host, network.resolved_port());
    let stream = TcpStream::connect(&addr)
        .await
        .with_context(|| format!("failed to connect to {addr}"))?;
    stream.set_nodelay(true)?;
    let (r, w) = stream.into_split();
    Ok((Box::new(r), Box::new(w)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connects_to_a_loopback_listener() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        let accept = tokio::spawn(async move { listener.accept().await });

        let network = Network {
            host: addr.ip().to_string(),
            port: Some(addr.port()),
            transport: crate::cfg::enums::TransportKind::Plain,
        };
        let (_r, _w) = connect_plain(&network).await.expect("connects");
        accept.await.expect("join").expect("accepted");
    }
}
