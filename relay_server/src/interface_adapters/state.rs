use std::sync::Arc;

// Read-only settings shared by every relay session. Sessions never share mutable state.
#[derive(Debug, Clone)]
pub struct AppState {
    // host:port of the game's TCP server.
    pub upstream_addr: Arc<str>,
    // Cap on a single upstream line, buffered or complete.
    pub max_line_bytes: usize,
}
