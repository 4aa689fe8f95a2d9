//! Configuration for the default HTTP adapter

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::TransportError;

/// Configuration for [`ReqwestHttpClient`](crate::ReqwestHttpClient)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Timeout for establishing a TCP connection
    /// Default: 5 seconds
    pub connect_timeout: Duration,

    /// Timeout for a whole request, body included
    /// Default: 10 seconds
    pub request_timeout: Duration,

    /// User-Agent header sent with every request
    /// Default: "dlna-sdk/<version> UPnP/1.0"
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(10),
            user_agent: format!("dlna-sdk/{} UPnP/1.0", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpConfig {
    /// Create a new HttpConfig with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Short timeouts, for LAN devices that either answer fast or not at all
    pub fn lan() -> Self {
        Self {
            connect_timeout: Duration::from_secs(2),
            request_timeout: Duration::from_secs(5),
            ..Default::default()
        }
    }

    /// Validate the configuration and return any issues
    pub fn validate(&self) -> Result<(), TransportError> {
        if self.connect_timeout.is_zero() || self.request_timeout.is_zero() {
            return Err(TransportError::InvalidRequest(
                "HTTP timeouts must be greater than 0".to_string(),
            ));
        }

        if self.connect_timeout > self.request_timeout {
            return Err(TransportError::InvalidRequest(
                "Connect timeout must not exceed request timeout".to_string(),
            ));
        }

        if self.user_agent.trim().is_empty() {
            return Err(TransportError::InvalidRequest(
                "User agent must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    pub fn with_timeouts(mut self, connect: Duration, request: Duration) -> Self {
        self.connect_timeout = connect;
        self.request_timeout = request;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}
