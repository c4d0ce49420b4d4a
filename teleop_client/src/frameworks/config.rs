use std::{env, time::Duration};

use crate::domain::backoff::BackoffPolicy;

// Client settings. A profile picks the defaults; each value can be overridden from the
// environment (or a local `.env`). Values that fail to parse keep the profile default.

pub const DEFAULT_SOCKET_URL: &str = "ws://localhost:50001";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Profile {
    #[default]
    Development,
    Production,
}

impl Profile {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Some(Profile::Development),
            "production" | "prod" => Some(Profile::Production),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub profile: Profile,
    pub socket_url: String,
    pub reconnect: BackoffPolicy,
    pub heartbeat_timeout: Duration,
    pub bridge_ready_timeout: Duration,
}

impl ClientConfig {
    pub fn defaults(profile: Profile) -> Self {
        let (initial, max, heartbeat) = match profile {
            Profile::Development => (3_000, 30_000, 10_000),
            Profile::Production => (5_000, 60_000, 15_000),
        };
        Self {
            profile,
            socket_url: DEFAULT_SOCKET_URL.to_string(),
            reconnect: BackoffPolicy::new(
                Duration::from_millis(initial),
                Duration::from_millis(max),
            ),
            heartbeat_timeout: Duration::from_millis(heartbeat),
            bridge_ready_timeout: Duration::from_secs(10),
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    // Builds a config from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let profile = lookup("TELEOP_PROFILE")
            .and_then(|v| Profile::parse(&v))
            .unwrap_or_default();
        let defaults = Self::defaults(profile);

        let millis = |key: &str, fallback: Duration| {
            lookup(key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(fallback)
        };

        let reconnect = BackoffPolicy::new(
            millis("RECONNECT_INITIAL_MS", defaults.reconnect.initial),
            millis("RECONNECT_MAX_MS", defaults.reconnect.max),
        );

        Self {
            profile,
            socket_url: lookup("SOCKET_URL")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.socket_url),
            reconnect,
            heartbeat_timeout: millis("HEARTBEAT_TIMEOUT_MS", defaults.heartbeat_timeout),
            bridge_ready_timeout: millis("BRIDGE_READY_TIMEOUT_MS", defaults.bridge_ready_timeout),
        }
    }
}
