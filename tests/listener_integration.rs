// SPDX-License-Identifier: AGPL-3.0-or-later

//! End-to-end scenarios against a loopback TCP peer speaking the wire
//! format directly (no real device needed), covering the literal
//! scenarios enumerated in spec.md §8.

use kinetic_client_rs::{
    cfg::config::{Auth, Config, Limits, Logging, Network, Threads, Timeouts},
    cfg::enums::TransportKind,
    client::Client,
    codec::frame,
    op::Entry,
    proto,
    status::Status,
};
use prost::Message as _;
use tokio::net::TcpListener;

fn test_config(port: u16, max_pending_messages: u16, max_queue_messages: usize) -> Config {
    Config {
        network: Network {
            host: "127.0.0.1".into(),
            port: Some(port),
            transport: TransportKind::Plain,
        },
        auth: Auth {
            identity: 1,
            hmac_key: b"asdfasdf".to_vec(),
            pin: b"1234".to_vec(),
            cluster_version: 0,
        },
        limits: Limits {
            max_pending_messages,
            max_queue_messages,
            ..Limits::default()
        },
        timeouts: Timeouts {
            operation_timeout_secs: 1,
            connection_timeout_secs: 30,
            tick_interval_ms: 20,
        },
        threads: Threads::default(),
        logging: Logging::default(),
    }
}

async fn bind_loopback() -> (TcpListener, u16) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = listener.local_addr().expect("addr").port();
    (listener, port)
}

/// Decodes the Command out of a received frame.
fn decode_command(frame: &frame::Frame) -> proto::Command {
    proto::Command::decode(
        frame
            .message
            .command_bytes
            .as_deref()
            .expect("request carries command_bytes"),
    )
    .expect("command decodes")
}

fn reply_message(reply: &proto::Command) -> proto::Message {
    proto::Message {
        command_bytes: Some(reply.encode_to_vec()),
        ..Default::default()
    }
}

#[tokio::test]
async fn noop_round_trip_completes_with_success() {
    let (listener, port) = bind_loopback().await;

    let device = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.expect("accept");
        let frame = frame::read_frame(&mut stream, 1 << 20).await.expect("read request");
        assert_eq!(frame.header.value_len(), 0, "NOOP carries no value");
        let command = decode_command(&frame);
        let sequence = command.header.expect("header").sequence;

        let reply = proto::Command {
            header: Some(proto::Header {
                ack_sequence: sequence,
                message_type: Some(proto::header::MessageType::NoopResponse as i32),
                ..Default::default()
            }),
            status: Some(proto::Status {
                code: Some(proto::status::StatusCode::Success as i32),
                ..Default::default()
            }),
            ..Default::default()
        };
        frame::write_frame(&mut stream, &reply_message(&reply), &[], 1 << 20)
            .await
            .expect("write reply");
    });

    let config = test_config(port, 1024, 32);
    let (client, _join) = Client::start(&config);
    let session = client
        .create_session(&config.network, &config.auth, &config.timeouts, &config.limits)
        .await
        .expect("connects");

    let status = session.noop().await;
    assert_eq!(status, Status::Success);

    device.await.expect("device task");
    client.shutdown().await;
}

#[tokio::test]
async fn put_then_get_round_trips_the_value() {
    let (listener, port) = bind_loopback().await;

    let device = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.expect("accept");

        // PUT
        let put_frame = frame::read_frame(&mut stream, 1 << 20).await.expect("read put");
        let put_command = decode_command(&put_frame);
        let put_seq = put_command.header.expect("header").sequence;
        let put_reply = proto::Command {
            header: Some(proto::Header {
                ack_sequence: put_seq,
                message_type: Some(proto::header::MessageType::PutResponse as i32),
                ..Default::default()
            }),
            status: Some(proto::Status {
                code: Some(proto::status::StatusCode::Success as i32),
                ..Default::default()
            }),
            ..Default::default()
        };
        frame::write_frame(&mut stream, &reply_message(&put_reply), &[], 1 << 20)
            .await
            .expect("write put reply");

        // GET
        let get_frame = frame::read_frame(&mut stream, 1 << 20).await.expect("read get");
        let get_command = decode_command(&get_frame);
        let get_seq = get_command.header.expect("header").sequence;
        let get_reply = proto::Command {
            header: Some(proto::Header {
                ack_sequence: get_seq,
                message_type: Some(proto::header::MessageType::GetResponse as i32),
                ..Default::default()
            }),
            status: Some(proto::Status {
                code: Some(proto::status::StatusCode::Success as i32),
                ..Default::default()
            }),
            body: Some(proto::Body {
                key_value: Some(proto::KeyValue {
                    key: Some(b"K1".to_vec()),
                    ..Default::default()
                }),
                ..Default::default()
            }),
        };
        frame::write_frame(&mut stream, &reply_message(&get_reply), b"hello", 1 << 20)
            .await
            .expect("write get reply");
    });

    let config = test_config(port, 1024, 32);
    let (client, _join) = Client::start(&config);
    let session = client
        .create_session(&config.network, &config.auth, &config.timeouts, &config.limits)
        .await
        .expect("connects");

    let (_entry, put_status) = session
        .put(Entry {
            key: b"K1".to_vec(),
            value: b"hello".to_vec(),
            new_version: b"v1".to_vec(),
            ..Default::default()
        })
        .await;
    assert_eq!(put_status, Status::Success);

    let (entry, get_status) = session
        .get(Entry {
            key: b"K1".to_vec(),
            ..Default::default()
        })
        .await;
    assert_eq!(get_status, Status::Success);
    assert_eq!(entry.value, b"hello");

    device.await.expect("device task");
    client.shutdown().await;
}

#[tokio::test]
async fn get_miss_surfaces_not_found_not_success() {
    let (listener, port) = bind_loopback().await;

    let device = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.expect("accept");
        let frame = frame::read_frame(&mut stream, 1 << 20).await.expect("read get");
        let command = decode_command(&frame);
        let sequence = command.header.expect("header").sequence;
        let reply = proto::Command {
            header: Some(proto::Header {
                ack_sequence: sequence,
                message_type: Some(proto::header::MessageType::GetResponse as i32),
                ..Default::default()
            }),
            status: Some(proto::Status {
                code: Some(proto::status::StatusCode::NotFound as i32),
                ..Default::default()
            }),
            ..Default::default()
        };
        frame::write_frame(&mut stream, &reply_message(&reply), &[], 1 << 20)
            .await
            .expect("write reply");
    });

    let config = test_config(port, 1024, 32);
    let (client, _join) = Client::start(&config);
    let session = client
        .create_session(&config.network, &config.auth, &config.timeouts, &config.limits)
        .await
        .expect("connects");

    let (_entry, status) = session
        .get(Entry {
            key: b"missing".to_vec(),
            ..Default::default()
        })
        .await;
    assert_eq!(status, Status::NotFound);
    assert!(!status.is_success());

    device.await.expect("device task");
    client.shutdown().await;
}

#[tokio::test]
async fn timed_out_operation_ignores_a_late_reply() {
    let (listener, port) = bind_loopback().await;

    let device = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.expect("accept");
        // Black hole: read the request, then stay silent well past the
        // operation timeout before finally (too late) replying.
        let frame = frame::read_frame(&mut stream, 1 << 20).await.expect("read request");
        let command = decode_command(&frame);
        let sequence = command.header.expect("header").sequence;

        tokio::time::sleep(std::time::Duration::from_millis(1500)).await;

        let reply = proto::Command {
            header: Some(proto::Header {
                ack_sequence: sequence,
                message_type: Some(proto::header::MessageType::NoopResponse as i32),
                ..Default::default()
            }),
            status: Some(proto::Status {
                code: Some(proto::status::StatusCode::Success as i32),
                ..Default::default()
            }),
            ..Default::default()
        };
        let _ = frame::write_frame(&mut stream, &reply_message(&reply), &[], 1 << 20).await;
        // Keep the stream alive until the test is done inspecting it.
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    });

    let config = test_config(port, 1024, 32);
    let (client, _join) = Client::start(&config);
    let session = client
        .create_session(&config.network, &config.auth, &config.timeouts, &config.limits)
        .await
        .expect("connects");

    let status = session.noop().await;
    assert_eq!(status, Status::OperationTimedOut);

    device.await.expect("device task");
    client.shutdown().await;
}

#[tokio::test]
async fn thirty_third_enqueue_is_rejected_as_overloaded() {
    let (listener, port) = bind_loopback().await;

    // The device accepts the connection but never reads or replies, so
    // every submitted NOOP stays pending until the table fills.
    let device = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("accept");
        tokio::time::sleep(std::time::Duration::from_millis(500)).await;
        drop(stream);
    });

    let config = test_config(port, 32, 64);
    let (client, _join) = Client::start(&config);
    let session = client
        .create_session(&config.network, &config.auth, &config.timeouts, &config.limits)
        .await
        .expect("connects");

    let mut pending = Vec::new();
    for _ in 0..32 {
        pending.push(tokio::spawn({
            let session = session.clone();
            async move { session.noop().await }
        }));
    }
    // Give the listener a chance to drain the submit queue and fill the
    // pending table before the 33rd enqueue.
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    let status = session.noop().await;
    assert_eq!(status, Status::SessionOverloaded);

    client.shutdown().await;
    for handle in pending {
        let _ = handle.await;
    }
    let _ = device.await;
}

#[test]
fn p2p_chain_nested_past_the_depth_cap_is_rejected() {
    use kinetic_client_rs::op::{P2pNode, P2pPeer, P2pRequest};

    let mut node = P2pNode {
        key: b"leaf".to_vec(),
        ..Default::default()
    };
    for _ in 0..1001 {
        node = P2pNode {
            key: b"k".to_vec(),
            chained: Some(Box::new(node)),
            ..Default::default()
        };
    }

    let request = P2pRequest {
        peer: P2pPeer { hostname: "peer".into(), port: 8123, tls: false },
        operations: vec![node],
    };

    let auth = Auth {
        identity: 1,
        hmac_key: b"asdfasdf".to_vec(),
        pin: vec![],
        cluster_version: 0,
    };
    let timeouts = Timeouts {
        operation_timeout_secs: 20,
        connection_timeout_secs: 30,
        tick_interval_ms: 100,
    };

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
    impl kinetic_client_rs::transport::AsyncWriteHalf for NullWriter {}

    let session = kinetic_client_rs::session::Session::new(&auth, &timeouts, &Limits::default(), Box::new(NullWriter));
    let err = match kinetic_client_rs::op::builder::p2p::build(&session, request) {
        Ok(_) => panic!("expected the depth cap to reject the chain"),
        Err(e) => e,
    };
    assert_eq!(err.as_status(), Status::OperationInvalid);
}
