// Interface adapters: browser-facing WebSocket handling and shared handler state.

pub mod net;
pub mod state;
