use std::{env, net::IpAddr};

// Runtime settings for the relay. Every value can be overridden from the environment
// (or a local `.env`), falling back to the ports the Unity build ships with.

pub const DEFAULT_LISTEN_PORT: u16 = 50001;
pub const DEFAULT_UPSTREAM_PORT: u16 = 50002;
// One MiB of unframed bytes is far beyond any status payload the game emits.
pub const DEFAULT_MAX_LINE_BYTES: usize = 1024 * 1024;

pub fn listen_host() -> IpAddr {
    env::var("LISTEN_HOST")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(IpAddr::from([127, 0, 0, 1]))
}

pub fn listen_port() -> u16 {
    env::var("LISTEN_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_LISTEN_PORT)
}

pub fn upstream_host() -> String {
    env::var("UPSTREAM_HOST")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| "127.0.0.1".to_string())
}

pub fn upstream_port() -> u16 {
    env::var("UPSTREAM_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_UPSTREAM_PORT)
}

pub fn max_line_bytes() -> usize {
    env::var("RELAY_MAX_LINE_BYTES")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(DEFAULT_MAX_LINE_BYTES)
}

/// Where each browser connection gets forwarded, plus per-connection limits.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub upstream_host: String,
    pub upstream_port: u16,
    pub max_line_bytes: usize,
}

impl RelayConfig {
    pub fn from_env() -> Self {
        Self {
            upstream_host: upstream_host(),
            upstream_port: upstream_port(),
            max_line_bytes: max_line_bytes(),
        }
    }

    pub fn upstream_addr(&self) -> String {
        format!("{}:{}", self.upstream_host, self.upstream_port)
    }
}
