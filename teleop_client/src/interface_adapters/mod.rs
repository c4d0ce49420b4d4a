pub mod events;
pub mod protocol;

pub use events::{ClientEvent, EventHub, EventKind, ListenerId};
pub use protocol::{ActionResult, FormattedError, InboundMessage, format_error};
