//! WebSocket transport to the line-framed relay.
//!
//! One supervisor task per [`SocketTransport::connect`] call owns the socket. It reconnects
//! after every close that was not requested locally, waiting a capped exponential delay
//! between attempts, until [`SocketTransport::disconnect`] flips the shutdown flag.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use crate::domain::backoff::BackoffPolicy;
use crate::domain::connection::{ConnectionState, TransportKind};
use crate::domain::envelope::Envelope;
use crate::domain::errors::{SendError, TransportError};
use crate::domain::ports::Transport;
use crate::interface_adapters::events::{ClientEvent, EventHub};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type FirstResult = oneshot::Sender<Result<(), TransportError>>;

// How long a local close waits for the server's close frame.
const CLOSE_GRACE: Duration = Duration::from_secs(1);

pub struct SocketTransport {
    inner: Arc<Inner>,
}

struct Inner {
    url: String,
    policy: BackoffPolicy,
    hub: Arc<EventHub>,
    state: watch::Sender<ConnectionState>,
    // Set by disconnect(); cancels connects, backoff sleeps and open sessions.
    shutdown: watch::Sender<bool>,
    outbound: Mutex<Option<mpsc::UnboundedSender<String>>>,
    supervisor: Mutex<Option<JoinHandle<()>>>,
}

impl SocketTransport {
    pub fn new(url: impl Into<String>, policy: BackoffPolicy, hub: Arc<EventHub>) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        let (shutdown, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                url: url.into(),
                policy,
                hub,
                state,
                shutdown,
                outbound: Mutex::new(None),
                supervisor: Mutex::new(None),
            }),
        }
    }

    pub fn url(&self) -> &str {
        &self.inner.url
    }

    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    // Joins the attempt another caller started and resolves with its outcome.
    async fn await_pending_attempt(&self) -> Result<(), TransportError> {
        let mut states = self.inner.state.subscribe();
        let settled = states
            .wait_for(|s| matches!(s, ConnectionState::Connected | ConnectionState::Disconnected))
            .await
            .map(|s| *s);
        match settled {
            Ok(ConnectionState::Connected) => Ok(()),
            _ if *self.inner.shutdown.borrow() => Err(TransportError::Closed),
            _ => Err(TransportError::Connect(
                "connect attempt in progress failed".to_string(),
            )),
        }
    }
}

#[async_trait]
impl Transport for SocketTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Socket
    }

    fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    async fn connect(&self) -> Result<(), TransportError> {
        let mut started = false;
        self.inner.state.send_if_modified(|state| {
            if matches!(state, ConnectionState::Connecting | ConnectionState::Connected) {
                return false;
            }
            *state = ConnectionState::Connecting;
            started = true;
            true
        });
        if !started {
            debug!(url = %self.inner.url, "Connect already in progress or established");
            return self.await_pending_attempt().await;
        }

        if let Some(stale) = lock(&self.inner.supervisor).take() {
            stale.abort();
        }
        self.inner.shutdown.send_replace(false);

        let (first_tx, first_rx) = oneshot::channel();
        let handle = tokio::spawn(supervise(self.inner.clone(), first_tx));
        *lock(&self.inner.supervisor) = Some(handle);

        first_rx.await.unwrap_or(Err(TransportError::Closed))
    }

    async fn disconnect(&self) {
        self.inner.shutdown.send_replace(true);
        let handle = lock(&self.inner.supervisor).take();
        if let Some(handle) = handle {
            match handle.await {
                Err(e) if e.is_panic() => warn!(error = %e, "Socket supervisor panicked"),
                _ => {}
            }
        }
        *lock(&self.inner.outbound) = None;
        self.inner.state.send_replace(ConnectionState::Disconnected);
    }

    fn send(&self, envelope: &Envelope) -> Result<(), SendError> {
        if !self.state().is_connected() {
            return Err(SendError::NotConnected);
        }
        let text = serde_json::to_string(envelope).map_err(|e| SendError::Encode(e.to_string()))?;
        let outbound = lock(&self.inner.outbound);
        let Some(tx) = outbound.as_ref() else {
            return Err(SendError::NotConnected);
        };
        tx.send(text).map_err(|_| SendError::NotConnected)
    }
}

impl Drop for SocketTransport {
    fn drop(&mut self) {
        // Stops a supervisor that would otherwise retry forever.
        self.inner.shutdown.send_replace(true);
    }
}

async fn supervise(inner: Arc<Inner>, first: FirstResult) {
    let mut first = Some(first);
    let mut backoff = inner.policy.start();
    let mut shutdown = inner.shutdown.subscribe();

    loop {
        inner.state.send_replace(ConnectionState::Connecting);
        let attempt = tokio::select! {
            _ = shutdown_requested(&mut shutdown) => break,
            result = connect_async(inner.url.as_str()) => result,
        };

        match attempt {
            Ok((stream, _)) => {
                backoff.reset();
                run_session(&inner, stream, &mut shutdown, &mut first).await;
            }
            Err(e) => {
                warn!(url = %inner.url, error = %e, "WebSocket connect failed");
                inner.state.send_replace(ConnectionState::Disconnected);
                inner.hub.emit(&ClientEvent::TransportError(e.to_string()));
                if let Some(first) = first.take() {
                    let _ = first.send(Err(TransportError::Connect(e.to_string())));
                }
            }
        }

        if *shutdown.borrow() {
            break;
        }

        let delay = backoff.next_delay();
        info!(
            url = %inner.url,
            attempt = backoff.attempts(),
            delay_ms = delay.as_millis() as u64,
            "Reconnecting"
        );
        tokio::select! {
            _ = shutdown_requested(&mut shutdown) => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }

    inner.state.send_replace(ConnectionState::Disconnected);
    if let Some(first) = first.take() {
        let _ = first.send(Err(TransportError::Closed));
    }
    debug!(url = %inner.url, "Socket supervisor stopped");
}

async fn run_session(
    inner: &Inner,
    stream: WsStream,
    shutdown: &mut watch::Receiver<bool>,
    first: &mut Option<FirstResult>,
) {
    let (mut write, mut read) = stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    *lock(&inner.outbound) = Some(tx);
    inner.state.send_replace(ConnectionState::Connected);
    info!(url = %inner.url, "Connected");
    inner.hub.emit(&ClientEvent::Connected);
    if let Some(first) = first.take() {
        let _ = first.send(Ok(()));
    }

    loop {
        tokio::select! {
            _ = shutdown_requested(shutdown) => {
                inner.state.send_replace(ConnectionState::Closing);
                *lock(&inner.outbound) = None;
                let _ = write.send(Message::Close(None)).await;
                // Wait briefly for the close handshake so the relay sees a clean close.
                let _ = tokio::time::timeout(CLOSE_GRACE, async {
                    while let Some(Ok(message)) = read.next().await {
                        if message.is_close() {
                            break;
                        }
                    }
                })
                .await;
                break;
            }
            outgoing = rx.recv() => {
                let Some(text) = outgoing else { break };
                if let Err(e) = write.send(Message::text(text)).await {
                    warn!(error = %e, "WebSocket write failed");
                    inner.hub.emit(&ClientEvent::TransportError(e.to_string()));
                    break;
                }
            }
            incoming = read.next() => match incoming {
                Some(Ok(Message::Text(text))) => inner.hub.dispatch_text(text.as_str()),
                Some(Ok(Message::Close(frame))) => {
                    info!(?frame, "Server closed connection");
                    break;
                }
                Some(Ok(Message::Binary(bytes))) => {
                    debug!(len = bytes.len(), "Ignoring binary frame");
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(error = %e, "WebSocket read failed");
                    inner.hub.emit(&ClientEvent::TransportError(e.to_string()));
                    break;
                }
                None => break,
            },
        }
    }

    *lock(&inner.outbound) = None;
    inner.state.send_replace(ConnectionState::Disconnected);
    info!(url = %inner.url, "Disconnected");
    inner.hub.emit(&ClientEvent::Disconnected);
}

async fn shutdown_requested(rx: &mut watch::Receiver<bool>) {
    // A dropped sender also ends the wait.
    let _ = rx.wait_for(|stop| *stop).await;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
