//! Listener registry and inbound dispatch.
//!
//! Both transports feed raw frames into an [`EventHub`], which decodes them and fans the
//! result out to listeners registered for the matching [`EventKind`]. Listeners run on the
//! caller's task, one after another, with the registry unlocked so they may add or remove
//! listeners themselves.

use crate::domain::envelope::Envelope;
use crate::domain::status::PlayerStatus;
use crate::interface_adapters::protocol::{
    ActionResult, FormattedError, Heartbeat, InboundMessage, decode_inbound, envelope_from_value,
    parse_envelope,
};
use serde_json::Value;
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Connected,
    Disconnected,
    TransportError,
    PlayerStatus,
    ActionResult,
    ServerError,
    Heartbeat,
    Unknown,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Connected => "connected",
            EventKind::Disconnected => "disconnected",
            EventKind::TransportError => "transport_error",
            EventKind::PlayerStatus => "player_status",
            EventKind::ActionResult => "action_result",
            EventKind::ServerError => "server_error",
            EventKind::Heartbeat => "heartbeat",
            EventKind::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone)]
pub enum ClientEvent {
    Connected,
    Disconnected,
    TransportError(String),
    PlayerStatus(Arc<PlayerStatus>),
    ActionResult(ActionResult),
    ServerError(FormattedError),
    Heartbeat(Heartbeat),
    Unknown(Envelope),
}

impl ClientEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ClientEvent::Connected => EventKind::Connected,
            ClientEvent::Disconnected => EventKind::Disconnected,
            ClientEvent::TransportError(_) => EventKind::TransportError,
            ClientEvent::PlayerStatus(_) => EventKind::PlayerStatus,
            ClientEvent::ActionResult(_) => EventKind::ActionResult,
            ClientEvent::ServerError(_) => EventKind::ServerError,
            ClientEvent::Heartbeat(_) => EventKind::Heartbeat,
            ClientEvent::Unknown(_) => EventKind::Unknown,
        }
    }
}

impl From<InboundMessage> for ClientEvent {
    fn from(message: InboundMessage) -> Self {
        match message {
            InboundMessage::PlayerStatus(status) => ClientEvent::PlayerStatus(Arc::new(status)),
            InboundMessage::ActionResult(result) => ClientEvent::ActionResult(result),
            InboundMessage::ServerError(error) => ClientEvent::ServerError(error),
            InboundMessage::Heartbeat(beat) => ClientEvent::Heartbeat(beat),
            InboundMessage::Unknown(envelope) => ClientEvent::Unknown(envelope),
        }
    }
}

/// Handle returned by [`EventHub::on`]; pass it to [`EventHub::off`] to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

pub type Listener = Arc<dyn Fn(&ClientEvent) -> Result<(), String> + Send + Sync>;

#[derive(Default)]
pub struct EventHub {
    next_id: AtomicU64,
    listeners: Mutex<HashMap<EventKind, Vec<(ListenerId, Listener)>>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<F>(&self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(&ClientEvent) -> Result<(), String> + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.registry()
            .entry(kind)
            .or_default()
            .push((id, Arc::new(listener)));
        id
    }

    // Returns false when the id was never registered or is already gone.
    pub fn off(&self, id: ListenerId) -> bool {
        let mut registry = self.registry();
        for entries in registry.values_mut() {
            if let Some(pos) = entries.iter().position(|(entry_id, _)| *entry_id == id) {
                entries.remove(pos);
                return true;
            }
        }
        false
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.registry().get(&kind).map_or(0, Vec::len)
    }

    pub fn emit(&self, event: &ClientEvent) {
        let kind = event.kind();
        // Snapshot so listeners can touch the registry while they run.
        let snapshot: Vec<(ListenerId, Listener)> =
            self.registry().get(&kind).cloned().unwrap_or_default();

        for (id, listener) in snapshot {
            match catch_unwind(AssertUnwindSafe(|| listener(event))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(event = kind.as_str(), listener = id.0, error = %e, "Listener failed"),
                Err(_) => warn!(event = kind.as_str(), listener = id.0, "Listener panicked"),
            }
        }
    }

    // Entry point for socket frames.
    pub fn dispatch_text(&self, text: &str) {
        match parse_envelope(text) {
            Ok(envelope) => self.dispatch_envelope(envelope),
            Err(e) => warn!(error = %e, "Dropping malformed frame"),
        }
    }

    // Entry point for bridge messages.
    pub fn dispatch_value(&self, value: Value) {
        match envelope_from_value(value) {
            Ok(envelope) => self.dispatch_envelope(envelope),
            Err(e) => warn!(error = %e, "Dropping host message without topic"),
        }
    }

    pub fn dispatch_envelope(&self, envelope: Envelope) {
        let topic = envelope.topic.clone();
        match decode_inbound(envelope) {
            Ok(message) => {
                let event = ClientEvent::from(message);
                if event.kind() == EventKind::Unknown {
                    debug!(topic = %topic, "Unhandled topic");
                }
                self.emit(&event);
            }
            Err(e) => warn!(topic = %topic, error = %e, "Dropping malformed payload"),
        }
    }

    fn registry(&self) -> MutexGuard<'_, HashMap<EventKind, Vec<(ListenerId, Listener)>>> {
        // A poisoned registry is still structurally valid.
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
