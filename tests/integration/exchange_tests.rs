//! End-to-end tests for `LineClient` against a real Unix domain socket.
//!
//! Each test binds a listener in a temporary directory, plays the peer in a
//! spawned task, and drives the client through connect, send and read.

use std::time::Duration;

use line_client::client::read_line_from;
use line_client::{AppError, ClientConfig, LineClient, Request};
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use super::test_helpers::{
    accept_request, bind_listener, config_for, socket_dir, spawn_replying_peer,
};

#[tokio::test]
async fn peer_reply_is_printed_as_answer() {
    let sock = socket_dir();
    let listener = bind_listener(&sock.path);
    let peer = spawn_replying_peer(listener, b"102\n");

    let client = LineClient::new(&config_for(&sock.path));
    let line = client
        .exchange(&Request::default(), &CancellationToken::new())
        .await
        .expect("exchange");

    assert_eq!(line.bytes, b"102");
    assert!(!line.saw_eof);
    assert_eq!(line.render(), "102");

    let request = peer.await.expect("peer task");
    assert_eq!(request, b"100 + 2 102");
}

#[tokio::test]
async fn silent_close_reports_eof() {
    let sock = socket_dir();
    let listener = bind_listener(&sock.path);
    let peer = spawn_replying_peer(listener, b"");

    let client = LineClient::new(&config_for(&sock.path));
    let line = client
        .exchange(&Request::default(), &CancellationToken::new())
        .await
        .expect("exchange");

    assert!(line.saw_eof);
    assert!(line.bytes.is_empty());
    assert_eq!(line.render(), "Got EOF");
    peer.await.expect("peer task");
}

#[tokio::test]
async fn partial_reply_then_close_keeps_bytes() {
    let sock = socket_dir();
    let listener = bind_listener(&sock.path);
    let peer = spawn_replying_peer(listener, b"10");

    let client = LineClient::new(&config_for(&sock.path));
    let line = client
        .exchange(&Request::default(), &CancellationToken::new())
        .await
        .expect("exchange");

    assert!(line.saw_eof);
    assert_eq!(line.bytes, b"10");
    peer.await.expect("peer task");
}

#[tokio::test]
async fn trailing_data_after_newline_is_ignored() {
    let sock = socket_dir();
    let listener = bind_listener(&sock.path);
    let peer = spawn_replying_peer(listener, b"102\nextra\n");

    let client = LineClient::new(&config_for(&sock.path));
    let line = client
        .exchange(&Request::default(), &CancellationToken::new())
        .await
        .expect("exchange");

    assert_eq!(line.bytes, b"102");
    assert!(!line.saw_eof);
    peer.await.expect("peer task");
}

#[tokio::test]
async fn missing_socket_is_connect_error() {
    let sock = socket_dir();
    let client = LineClient::new(&config_for(&sock.path));

    let result = client
        .exchange(&Request::default(), &CancellationToken::new())
        .await;
    assert!(matches!(result, Err(AppError::Connect(_))));
}

#[tokio::test]
async fn custom_request_sent_verbatim() {
    let sock = socket_dir();
    let listener = bind_listener(&sock.path);
    let peer = spawn_replying_peer(listener, b"ok\n");

    let request = Request::from_line("7 * 6 42").expect("valid request");
    let client = LineClient::new(&config_for(&sock.path));
    client
        .exchange(&request, &CancellationToken::new())
        .await
        .expect("exchange");

    assert_eq!(peer.await.expect("peer task"), b"7 * 6 42");
}

#[tokio::test]
async fn stalled_peer_times_out_with_deadline() {
    let sock = socket_dir();
    let listener = bind_listener(&sock.path);
    let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
    let peer = tokio::spawn(async move {
        let (stream, _) = accept_request(&listener).await;
        let _ = release_rx.await;
        drop(stream);
    });

    let config = ClientConfig {
        read_timeout_seconds: 1,
        ..config_for(&sock.path)
    };
    let client = LineClient::new(&config);
    let result = client
        .exchange(&Request::default(), &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(AppError::Timeout(_))));
    let _ = release_tx.send(());
    peer.await.expect("peer task");
}

#[tokio::test]
async fn cancellation_interrupts_unbounded_wait() {
    let sock = socket_dir();
    let listener = bind_listener(&sock.path);
    let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
    let peer = tokio::spawn(async move {
        let (stream, _) = accept_request(&listener).await;
        let _ = release_rx.await;
        drop(stream);
    });

    let ct = CancellationToken::new();
    let cancel = ct.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();
    });

    let client = LineClient::new(&config_for(&sock.path));
    let result = client.exchange(&Request::default(), &ct).await;

    assert!(matches!(result, Err(AppError::Cancelled(_))));
    let _ = release_tx.send(());
    peer.await.expect("peer task");
}

#[tokio::test]
async fn connection_released_after_exchange() {
    let sock = socket_dir();
    let listener = bind_listener(&sock.path);
    let peer = tokio::spawn(async move {
        let (mut stream, _) = accept_request(&listener).await;
        stream.write_all(b"102\n").await.expect("write reply");
        read_line_from(&mut stream, 0).await.expect("read after reply")
    });

    let client = LineClient::new(&config_for(&sock.path));
    client
        .exchange(&Request::default(), &CancellationToken::new())
        .await
        .expect("exchange");

    let after = peer.await.expect("peer task");
    assert!(after.saw_eof, "peer must observe the client closing");
    assert!(after.bytes.is_empty(), "client must not send a second request");
}
