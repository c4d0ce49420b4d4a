use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::connection::{ConnectionState, TransportKind};
use crate::domain::envelope::{ActionKind, Envelope, ItemType, create_action_message};
use crate::domain::errors::{SendError, TransportError};
use crate::domain::ports::Transport;
use crate::interface_adapters::events::{ClientEvent, EventHub, EventKind, ListenerId};

/// One client API over whichever transport was selected at startup.
///
/// Cheap to clone; clones share the transport and the listener registry.
#[derive(Clone)]
pub struct UnifiedClient {
    transport: Arc<dyn Transport>,
    hub: Arc<EventHub>,
}

impl UnifiedClient {
    pub fn new(transport: Arc<dyn Transport>, hub: Arc<EventHub>) -> Self {
        Self { transport, hub }
    }

    pub async fn connect(&self) -> Result<(), TransportError> {
        info!(transport = %self.transport.kind(), "Connecting");
        self.transport.connect().await
    }

    pub async fn disconnect(&self) {
        self.transport.disconnect().await;
    }

    pub fn send_action(
        &self,
        action: ActionKind,
        item_type: ItemType,
        count: u32,
    ) -> Result<(), SendError> {
        let envelope = create_action_message(action, item_type, count)?;
        self.send(&envelope)
    }

    pub fn place_item(&self, item_type: ItemType, count: u32) -> Result<(), SendError> {
        self.send_action(ActionKind::PlaceItem, item_type, count)
    }

    pub fn reset_mission(&self) -> Result<(), SendError> {
        self.send(&Envelope::reset_mission())
    }

    pub fn on<F>(&self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(&ClientEvent) -> Result<(), String> + Send + Sync + 'static,
    {
        self.hub.on(kind, listener)
    }

    pub fn off(&self, id: ListenerId) -> bool {
        self.hub.off(id)
    }

    pub fn is_connected(&self) -> bool {
        self.transport.state().is_connected()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.transport.state()
    }

    pub fn kind(&self) -> TransportKind {
        self.transport.kind()
    }

    pub fn hub(&self) -> &Arc<EventHub> {
        &self.hub
    }

    fn send(&self, envelope: &Envelope) -> Result<(), SendError> {
        let state = self.transport.state();
        if !state.is_connected() {
            warn!(topic = %envelope.topic, state = %state, "Not connected, message not sent");
            return Err(SendError::NotConnected);
        }
        self.transport.send(envelope)
    }
}
