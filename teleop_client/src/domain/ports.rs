use async_trait::async_trait;
use serde_json::Value;

use crate::domain::connection::{ConnectionState, TransportKind};
use crate::domain::envelope::Envelope;
use crate::domain::errors::{SendError, TransportError};

// Port shared by every way of reaching the game. The facade only talks to this.
#[async_trait]
pub trait Transport: Send + Sync {
    fn kind(&self) -> TransportKind;

    fn state(&self) -> ConnectionState;

    // Resolves once the transport is usable, or with the reason it never became usable.
    async fn connect(&self) -> Result<(), TransportError>;

    // Stops the transport and any pending reconnect. Idempotent.
    async fn disconnect(&self);

    // Hands one envelope to the transport. Never blocks on the network.
    fn send(&self, envelope: &Envelope) -> Result<(), SendError>;
}

// Port for the embedding host's outbound entry point used by the bridge transport.
pub trait BridgeHost: Send + Sync {
    fn exposes_send(&self) -> bool;

    fn send_to_host(&self, message: Value) -> Result<(), String>;
}
