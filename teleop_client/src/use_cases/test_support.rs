use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::domain::connection::{ConnectionState, TransportKind};
use crate::domain::envelope::Envelope;
use crate::domain::errors::{SendError, TransportError};
use crate::domain::ports::Transport;

// In-memory transport that records every envelope it is asked to send.
pub(crate) struct RecordingTransport {
    state: Mutex<ConnectionState>,
    pub(crate) sent: Arc<Mutex<Vec<Envelope>>>,
    pub(crate) fail_connect: bool,
}

impl RecordingTransport {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(ConnectionState::Disconnected),
            sent: Arc::new(Mutex::new(Vec::new())),
            fail_connect: false,
        }
    }

    pub(crate) fn set_state(&self, state: ConnectionState) {
        *self.state.lock().expect("state mutex poisoned") = state;
    }

    pub(crate) fn sent(&self) -> Vec<Envelope> {
        self.sent.lock().expect("sent mutex poisoned").clone()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Socket
    }

    fn state(&self) -> ConnectionState {
        *self.state.lock().expect("state mutex poisoned")
    }

    async fn connect(&self) -> Result<(), TransportError> {
        if self.fail_connect {
            return Err(TransportError::Connect("refused".to_string()));
        }
        self.set_state(ConnectionState::Connected);
        Ok(())
    }

    async fn disconnect(&self) {
        self.set_state(ConnectionState::Disconnected);
    }

    fn send(&self, envelope: &Envelope) -> Result<(), SendError> {
        self.sent
            .lock()
            .expect("sent mutex poisoned")
            .push(envelope.clone());
        Ok(())
    }
}
