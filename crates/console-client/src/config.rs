//! Client configuration.

use serde::Deserialize;
use std::time::Duration;

use crate::error::ConsoleResult;

/// Console client configuration loaded from environment variables.
///
/// Environment variables are prefixed with `CONSOLE_`:
/// - `CONSOLE_SERVER_URL`: Console backend URL (default: "http://localhost:8000")
/// - `CONSOLE_POLL_INTERVAL_MS`: Delay between status checks (default: 1000)
/// - `CONSOLE_MAX_POLL_ATTEMPTS`: Status checks before giving up (default: 600, 0 = unbounded)
/// - `CONSOLE_REQUEST_TIMEOUT_SECS`: Per-request HTTP timeout (default: 30)
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Console backend URL
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Delay between status checks in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Maximum number of status checks per job; 0 disables the bound
    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,

    /// HTTP request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_server_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_max_poll_attempts() -> u32 {
    600
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl ClientConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> ConsoleResult<Self> {
        Ok(envy::prefixed("CONSOLE_").from_env::<ClientConfig>()?)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Poll bound, or `None` when polling is unbounded.
    pub fn max_poll_attempts(&self) -> Option<u32> {
        match self.max_poll_attempts {
            0 => None,
            n => Some(n),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            poll_interval_ms: default_poll_interval_ms(),
            max_poll_attempts: default_max_poll_attempts(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}
