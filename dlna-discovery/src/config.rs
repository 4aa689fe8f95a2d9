//! Configuration for the device registry

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::DiscoveryError;

/// Configuration for [`DeviceRegistry`](crate::DeviceRegistry) and
/// [`SsdpClient`](crate::SsdpClient)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Search target sent in the M-SEARCH `ST` header
    /// Default: "ssdp:all"
    pub search_target: String,

    /// How long `search_default` listens before returning its snapshot
    /// Default: 2 seconds
    pub search_timeout: Duration,

    /// Maximum response delay (`MX`) requested from devices, in seconds
    /// Default: 2
    pub mx: u8,

    /// Timeout for fetching one device description document
    /// Default: 5 seconds
    pub description_timeout: Duration,

    /// When set, a key whose description fetch failed may be retried once
    /// this much time has passed. `None` never retries.
    /// Default: None
    pub failure_retry_after: Option<Duration>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            search_target: "ssdp:all".to_string(),
            search_timeout: Duration::from_millis(2000),
            mx: 2,
            description_timeout: Duration::from_secs(5),
            failure_retry_after: None,
        }
    }
}

impl DiscoveryConfig {
    /// Create a new DiscoveryConfig with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Search only for media servers instead of every UPnP device
    pub fn media_servers() -> Self {
        Self {
            search_target: "urn:schemas-upnp-org:device:MediaServer:1".to_string(),
            ..Default::default()
        }
    }

    /// Short listening window for interactive use
    pub fn quick() -> Self {
        Self {
            search_timeout: Duration::from_millis(1000),
            mx: 1,
            description_timeout: Duration::from_secs(2),
            ..Default::default()
        }
    }

    /// Validate the configuration and return any issues
    pub fn validate(&self) -> Result<(), DiscoveryError> {
        if self.search_target.trim().is_empty() {
            return Err(DiscoveryError::Protocol(
                "Search target must not be empty".to_string(),
            ));
        }

        if self.mx == 0 || self.mx > 5 {
            return Err(DiscoveryError::Protocol(
                "MX must be between 1 and 5 seconds".to_string(),
            ));
        }

        if self.description_timeout.is_zero() {
            return Err(DiscoveryError::Protocol(
                "Description timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn with_search_target(mut self, target: impl Into<String>) -> Self {
        self.search_target = target.into();
        self
    }

    pub fn with_search_timeout(mut self, timeout: Duration) -> Self {
        self.search_timeout = timeout;
        self
    }

    pub fn with_mx(mut self, mx: u8) -> Self {
        self.mx = mx;
        self
    }

    pub fn with_description_timeout(mut self, timeout: Duration) -> Self {
        self.description_timeout = timeout;
        self
    }

    pub fn with_failure_retry_after(mut self, retry_after: Duration) -> Self {
        self.failure_retry_after = Some(retry_after);
        self
    }
}
