pub mod backoff;
pub mod connection;
pub mod envelope;
pub mod errors;
pub mod heartbeat;
pub mod ports;
pub mod status;

pub use backoff::{Backoff, BackoffPolicy};
pub use connection::{ConnectionState, TransportKind};
pub use envelope::{ActionKind, ActionRequest, Envelope, ItemType};
pub use errors::{NormalizeError, ProtocolError, SendError, TransportError};
pub use ports::{BridgeHost, Transport};
pub use status::{PlayerStatus, normalize};
