pub mod domain;
pub mod frameworks;
pub mod interface_adapters;
pub mod use_cases;

pub use domain::{ActionKind, ConnectionState, Envelope, ItemType, PlayerStatus, TransportKind};
pub use frameworks::bridge::{BridgeTransport, ChannelBridgeHost};
pub use frameworks::config::{ClientConfig, Profile};
pub use frameworks::socket::SocketTransport;
pub use frameworks::transport::{HostEnvironment, SelectedTransport};
pub use interface_adapters::{ClientEvent, EventHub, EventKind, ListenerId};
pub use use_cases::{StatusBoard, UnifiedClient};
