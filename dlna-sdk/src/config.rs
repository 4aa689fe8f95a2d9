//! Aggregated configuration

use std::time::Duration;

use dlna_discovery::DiscoveryConfig;
use dlna_subtitles::SubtitleConfig;
use dlna_transport::HttpConfig;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Result, SdkError};

/// Environment variable overriding the search timeout, in milliseconds
pub const SEARCH_TIMEOUT_ENV: &str = "DLNA_SEARCH_TIMEOUT_MS";

/// Environment variable overriding the search target
pub const SEARCH_TARGET_ENV: &str = "DLNA_SEARCH_TARGET";

/// Configuration for a [`MediaService`](crate::MediaService)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SdkConfig {
    pub http: HttpConfig,
    pub discovery: DiscoveryConfig,
    pub subtitles: SubtitleConfig,
}

impl SdkConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults, with discovery overrides from the environment
    ///
    /// Unparseable values are logged and ignored.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|name| std::env::var(name).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(raw) = lookup(SEARCH_TIMEOUT_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(ms) => self.discovery.search_timeout = Duration::from_millis(ms),
                Err(_) => warn!(variable = SEARCH_TIMEOUT_ENV, value = %raw, "Ignoring invalid override"),
            }
        }

        if let Some(target) = lookup(SEARCH_TARGET_ENV) {
            if !target.trim().is_empty() {
                self.discovery.search_target = target;
            }
        }

        self
    }

    /// Validate every section, reporting the first problem found
    pub fn validate(&self) -> Result<()> {
        self.http
            .validate()
            .map_err(|e| SdkError::Config(format!("http: {}", e)))?;
        self.discovery
            .validate()
            .map_err(|e| SdkError::Config(format!("discovery: {}", e)))?;
        self.subtitles
            .validate()
            .map_err(|e| SdkError::Config(format!("subtitles: {}", e)))?;
        Ok(())
    }

    pub fn with_http(mut self, http: HttpConfig) -> Self {
        self.http = http;
        self
    }

    pub fn with_discovery(mut self, discovery: DiscoveryConfig) -> Self {
        self.discovery = discovery;
        self
    }

    pub fn with_subtitles(mut self, subtitles: SubtitleConfig) -> Self {
        self.subtitles = subtitles;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn overrides(pairs: &[(&str, &str)]) -> SdkConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        SdkConfig::default().with_overrides(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(SdkConfig::default().validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let config = overrides(&[
            (SEARCH_TIMEOUT_ENV, "3500"),
            (SEARCH_TARGET_ENV, "urn:schemas-upnp-org:device:MediaServer:1"),
        ]);
        assert_eq!(config.discovery.search_timeout, Duration::from_millis(3500));
        assert_eq!(config.discovery.search_target, "urn:schemas-upnp-org:device:MediaServer:1");
    }

    #[test]
    fn test_invalid_overrides_are_ignored() {
        let config = overrides(&[(SEARCH_TIMEOUT_ENV, "soon"), (SEARCH_TARGET_ENV, "  ")]);
        assert_eq!(config, SdkConfig::default());
    }

    #[test]
    fn test_validate_names_the_section() {
        let config = SdkConfig::default()
            .with_subtitles(SubtitleConfig::default().with_batch_size(0));
        match config.validate() {
            Err(SdkError::Config(message)) => assert!(message.starts_with("subtitles:")),
            other => panic!("expected a config error, got {:?}", other),
        }
    }

    #[test]
    fn test_partial_json() {
        let config: SdkConfig =
            serde_json::from_str(r#"{"discovery": {"search_target": "ssdp:all", "mx": 3}}"#).unwrap();
        assert_eq!(config.discovery.mx, 3);
        assert_eq!(config.subtitles, SubtitleConfig::default());
    }
}
