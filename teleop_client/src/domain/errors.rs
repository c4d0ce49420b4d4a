use std::{fmt, time::Duration};

// Domain-level errors for the client side of the protocol.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    ZeroCount,
    UnknownItemType(String),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::ZeroCount => f.write_str("item count must be at least 1"),
            ProtocolError::UnknownItemType(item) => write!(f, "unknown item type `{item}`"),
        }
    }
}

impl std::error::Error for ProtocolError {}

#[derive(Debug)]
pub enum NormalizeError {
    // The one hard requirement on a status payload.
    MissingInventory,
    // `inventory` was present but not an object; carries the JSON type found.
    Malformed(&'static str),
}

impl fmt::Display for NormalizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NormalizeError::MissingInventory => f.write_str("status payload has no inventory"),
            NormalizeError::Malformed(found) => {
                write!(f, "status inventory must be an object, found {found}")
            }
        }
    }
}

impl std::error::Error for NormalizeError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    // The host never signalled readiness within the allowed window.
    ReadyTimeout(Duration),
    Connect(String),
    // The transport was shut down while a connect was in flight.
    Closed,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::ReadyTimeout(after) => {
                write!(f, "bridge not ready after {} ms", after.as_millis())
            }
            TransportError::Connect(reason) => write!(f, "connect failed: {reason}"),
            TransportError::Closed => f.write_str("transport closed"),
        }
    }
}

impl std::error::Error for TransportError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendError {
    NotConnected,
    InvalidRequest(ProtocolError),
    Encode(String),
    Transport(String),
}

impl fmt::Display for SendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendError::NotConnected => f.write_str("not connected"),
            SendError::InvalidRequest(e) => write!(f, "invalid request: {e}"),
            SendError::Encode(e) => write!(f, "failed to encode message: {e}"),
            SendError::Transport(e) => write!(f, "transport rejected message: {e}"),
        }
    }
}

impl std::error::Error for SendError {}

impl From<ProtocolError> for SendError {
    fn from(e: ProtocolError) -> Self {
        SendError::InvalidRequest(e)
    }
}
