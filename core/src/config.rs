//! Client configuration.

use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_LOGIN_LOCATION: &str = "login.html";

/// Where the backend lives and where to send the user when the session ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Origin every operation path is appended to. Never ends with `/`.
    pub base_url: String,
    /// Navigation target written on a missing or rejected token.
    pub login_location: String,
    /// Applied by `ReqwestTransport`; `None` leaves the platform default.
    pub timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }

    pub fn with_login_location(mut self, location: &str) -> Self {
        self.login_location = location.to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            login_location: DEFAULT_LOGIN_LOCATION.to_string(),
            timeout: None,
        }
    }
}
