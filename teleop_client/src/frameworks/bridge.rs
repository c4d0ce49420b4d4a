//! In-process transport for when the client runs inside the game host.
//!
//! Readiness takes two signals: the host must report that its receive callback is
//! registered, and it must expose a send entry point. There is no reconnection; the bridge
//! lives as long as the host does.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use crate::domain::connection::{ConnectionState, TransportKind};
use crate::domain::envelope::Envelope;
use crate::domain::errors::{SendError, TransportError};
use crate::domain::ports::{BridgeHost, Transport};
use crate::interface_adapters::events::{ClientEvent, EventHub};

// Hosts may expose their send function without telling us; re-check this often.
const READY_POLL: Duration = Duration::from_millis(100);

pub struct BridgeTransport {
    host: Arc<dyn BridgeHost>,
    hub: Arc<EventHub>,
    ready_timeout: Duration,
    callback_registered: AtomicBool,
    ready: watch::Sender<bool>,
}

impl BridgeTransport {
    pub fn new(host: Arc<dyn BridgeHost>, hub: Arc<EventHub>, ready_timeout: Duration) -> Self {
        let (ready, _) = watch::channel(false);
        Self {
            host,
            hub,
            ready_timeout,
            callback_registered: AtomicBool::new(false),
            ready,
        }
    }

    // Called by the host once it can deliver messages to us.
    pub fn on_callback_registered(&self) {
        self.callback_registered.store(true, Ordering::SeqCst);
        self.refresh();
    }

    // Re-evaluates readiness; returns whether the bridge is usable now.
    pub fn refresh(&self) -> bool {
        let ready = self.is_ready();
        let changed = self.ready.send_if_modified(|current| {
            if *current == ready {
                return false;
            }
            *current = ready;
            true
        });
        if changed {
            if ready {
                info!("Bridge ready");
                self.hub.emit(&ClientEvent::Connected);
            } else {
                info!("Bridge no longer ready");
                self.hub.emit(&ClientEvent::Disconnected);
            }
        }
        ready
    }

    // Host -> client entry point.
    pub fn deliver(&self, message: Value) {
        self.hub.dispatch_value(message);
    }

    fn is_ready(&self) -> bool {
        self.callback_registered.load(Ordering::SeqCst) && self.host.exposes_send()
    }

    async fn wait_ready(&self) {
        let mut ready = self.ready.subscribe();
        while !self.refresh() {
            tokio::select! {
                _ = ready.changed() => {}
                _ = tokio::time::sleep(READY_POLL) => {}
            }
        }
    }
}

#[async_trait]
impl Transport for BridgeTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Bridge
    }

    // Reads through refresh() so a host that drops its send entry point is reported.
    fn state(&self) -> ConnectionState {
        if self.refresh() {
            ConnectionState::Connected
        } else if self.callback_registered.load(Ordering::SeqCst) {
            ConnectionState::Connecting
        } else {
            ConnectionState::Disconnected
        }
    }

    async fn connect(&self) -> Result<(), TransportError> {
        if self.refresh() {
            return Ok(());
        }
        info!(timeout_ms = self.ready_timeout.as_millis() as u64, "Waiting for bridge host");

        match tokio::time::timeout(self.ready_timeout, self.wait_ready()).await {
            Ok(()) => Ok(()),
            Err(_) => {
                warn!(
                    timeout_ms = self.ready_timeout.as_millis() as u64,
                    "Bridge host never became ready"
                );
                self.hub
                    .emit(&ClientEvent::TransportError("bridge ready timeout".to_string()));
                Err(TransportError::ReadyTimeout(self.ready_timeout))
            }
        }
    }

    async fn disconnect(&self) {
        self.callback_registered.store(false, Ordering::SeqCst);
        self.refresh();
    }

    fn send(&self, envelope: &Envelope) -> Result<(), SendError> {
        if !self.state().is_connected() {
            return Err(SendError::NotConnected);
        }
        let value = serde_json::to_value(envelope).map_err(|e| SendError::Encode(e.to_string()))?;
        self.host.send_to_host(value).map_err(SendError::Transport)
    }
}

/// Host side of the bridge backed by a channel, for embedding processes and tests.
pub struct ChannelBridgeHost {
    exposes_send: AtomicBool,
    tx: mpsc::UnboundedSender<Value>,
}

impl ChannelBridgeHost {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Value>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let host = Self {
            exposes_send: AtomicBool::new(true),
            tx,
        };
        (host, rx)
    }

    pub fn set_exposes_send(&self, exposed: bool) {
        self.exposes_send.store(exposed, Ordering::SeqCst);
    }
}

impl BridgeHost for ChannelBridgeHost {
    fn exposes_send(&self) -> bool {
        self.exposes_send.load(Ordering::SeqCst) && !self.tx.is_closed()
    }

    fn send_to_host(&self, message: Value) -> Result<(), String> {
        self.tx
            .send(message)
            .map_err(|_| "host receiver dropped".to_string())
    }
}
