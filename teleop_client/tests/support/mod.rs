// Shared harness for client integration tests: a fake relay speaking WebSocket on an
// ephemeral port, plus a client wired to it with fast reconnect timings.
#![allow(dead_code)]

use futures_util::StreamExt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use teleop_client::domain::BackoffPolicy;
use teleop_client::{EventHub, EventKind, SocketTransport, UnifiedClient};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{sleep, timeout};
use tokio_tungstenite::{WebSocketStream, accept_async, tungstenite::Message};

pub type ServerWs = WebSocketStream<TcpStream>;

// Upper bound for any single wait so a broken client fails the test instead of hanging it.
pub const WAIT: Duration = Duration::from_secs(5);
// How long "nothing happens" assertions watch for.
pub const QUIET: Duration = Duration::from_millis(300);

pub struct FakeRelay {
    pub url: String,
    listener: TcpListener,
}

impl FakeRelay {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake relay");
        let addr = listener.local_addr().expect("fake relay addr");
        Self {
            url: format!("ws://{addr}/"),
            listener,
        }
    }

    pub async fn accept(&self) -> ServerWs {
        let (tcp, _) = timeout(WAIT, self.listener.accept())
            .await
            .expect("accept timed out")
            .expect("accept");
        accept_async(tcp).await.expect("server handshake")
    }

    // Accepts the TCP connection but leaves the WebSocket handshake unanswered.
    pub async fn accept_stalled(&self) -> TcpStream {
        let (tcp, _) = timeout(WAIT, self.listener.accept())
            .await
            .expect("accept timed out")
            .expect("accept");
        tcp
    }

    pub async fn assert_no_connection(&self) {
        if timeout(QUIET, self.listener.accept()).await.is_ok() {
            panic!("unexpected connection attempt");
        }
    }
}

pub struct TestClient {
    pub client: UnifiedClient,
    pub socket: Arc<SocketTransport>,
    pub hub: Arc<EventHub>,
}

pub fn fast_policy() -> BackoffPolicy {
    BackoffPolicy::new(Duration::from_millis(50), Duration::from_millis(200))
}

pub fn socket_client(url: &str) -> TestClient {
    let hub = Arc::new(EventHub::new());
    let socket = Arc::new(SocketTransport::new(url, fast_policy(), hub.clone()));
    let client = UnifiedClient::new(socket.clone(), hub.clone());
    TestClient {
        client,
        socket,
        hub,
    }
}

pub fn count_events(hub: &EventHub, kind: EventKind) -> Arc<AtomicUsize> {
    let count = Arc::new(AtomicUsize::new(0));
    let seen = count.clone();
    hub.on(kind, move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    count
}

// Polls `check` until it holds or WAIT runs out.
pub async fn eventually<F>(what: &str, check: F)
where
    F: Fn() -> bool,
{
    let outcome = timeout(WAIT, async {
        while !check() {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(outcome.is_ok(), "timed out waiting for {what}");
}

// Next text frame from the client, skipping control frames.
pub async fn next_text(ws: &mut ServerWs) -> String {
    loop {
        let next = timeout(WAIT, ws.next()).await.expect("server read timed out");
        match next {
            Some(Ok(Message::Text(text))) => return text.as_str().to_string(),
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
            other => panic!("expected text frame, got {other:?}"),
        }
    }
}

// Waits for the client to end the session; true when it sent a close frame.
pub async fn closed_by_client(ws: &mut ServerWs) -> bool {
    loop {
        let next = timeout(WAIT, ws.next()).await.expect("server read timed out");
        match next {
            Some(Ok(Message::Close(_))) => return true,
            Some(Ok(_)) => continue,
            Some(Err(_)) | None => return false,
        }
    }
}
