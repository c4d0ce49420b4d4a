// Network adapter for browser sockets; each socket is paired with its own upstream TCP stream.

pub mod relay;

pub use relay::ws_handler;
