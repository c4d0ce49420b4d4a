// Shared harness for relay integration tests: a fake game server plus a relay bound to
// ephemeral ports inside the test's own runtime.
#![allow(dead_code)]

use futures_util::StreamExt;
use relay_server::RelayConfig;
use std::time::Duration;
use tokio::{
    io::AsyncWriteExt,
    net::{TcpListener, TcpStream},
    time::timeout,
};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

// Upper bound for any single wait so a broken relay fails the test instead of hanging it.
pub const WAIT: Duration = Duration::from_secs(5);
// How long "nothing arrives" assertions listen for.
pub const QUIET: Duration = Duration::from_millis(200);

pub const HELLO_LINE: &str = r#"{"topic":"heartbeat","body":{"timestamp":"hello"}}"#;

pub struct Harness {
    pub relay_url: String,
    // Stands in for the Unity TCP server.
    pub upstream: TcpListener,
}

pub async fn start_relay(max_line_bytes: usize) -> Harness {
    // Bind to ephemeral ports to avoid collisions with local services.
    let upstream = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind fake upstream");
    let upstream_port = upstream.local_addr().expect("upstream addr").port();

    let relay_url = spawn_relay(RelayConfig {
        upstream_host: "127.0.0.1".to_string(),
        upstream_port,
        max_line_bytes,
    })
    .await;

    Harness {
        relay_url,
        upstream,
    }
}

// Starts a relay with an arbitrary config and returns its ws:// URL.
pub async fn spawn_relay(config: RelayConfig) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind relay listener");
    let addr = listener.local_addr().expect("relay addr");
    tokio::spawn(async move {
        relay_server::run(listener, config)
            .await
            .expect("relay failed");
    });
    format!("ws://{addr}/")
}

// Opens a browser connection and waits until the relay is pumping both directions.
//
// Messages sent before the upstream connection exists are dropped, so tests first
// push a greeting through the upstream side and wait for it on the browser side.
pub async fn connect_pair(harness: &Harness) -> (WsClient, TcpStream) {
    let (mut ws, _) = timeout(WAIT, connect_async(harness.relay_url.as_str()))
        .await
        .expect("relay connect timed out")
        .expect("relay handshake");
    let (mut tcp, _) = timeout(WAIT, harness.upstream.accept())
        .await
        .expect("upstream accept timed out")
        .expect("upstream accept");

    tcp.write_all(format!("{HELLO_LINE}\n").as_bytes())
        .await
        .expect("write greeting");
    assert_eq!(next_text(&mut ws).await, HELLO_LINE);

    (ws, tcp)
}

pub async fn next_message(ws: &mut WsClient) -> Option<Message> {
    loop {
        let next = timeout(WAIT, ws.next()).await.expect("ws read timed out");
        match next {
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
            Some(Ok(message)) => return Some(message),
            Some(Err(_)) | None => return None,
        }
    }
}

pub async fn next_text(ws: &mut WsClient) -> String {
    match next_message(ws).await {
        Some(Message::Text(text)) => text.as_str().to_string(),
        other => panic!("expected text frame, got {other:?}"),
    }
}

// Asserts the browser receives nothing for a short while.
pub async fn assert_quiet(ws: &mut WsClient) {
    if let Ok(message) = timeout(QUIET, ws.next()).await {
        panic!("expected no message, got {message:?}");
    }
}

// Waits for the relay to close the browser socket and returns the close code, if any.
pub async fn close_code(ws: &mut WsClient) -> Option<u16> {
    loop {
        match next_message(ws).await {
            Some(Message::Close(frame)) => return frame.map(|f| u16::from(f.code)),
            Some(Message::Text(_) | Message::Binary(_)) => continue,
            Some(_) => continue,
            None => return None,
        }
    }
}
