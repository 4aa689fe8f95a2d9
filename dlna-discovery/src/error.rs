//! Error types for the discovery system.

use dlna_transport::TransportError;
use thiserror::Error;

/// Error type for discovery operations.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// `search` was called before `start`
    #[error("Discovery has not been started")]
    NotStarted,

    /// Socket, multicast or HTTP connection failure
    #[error("Network error: {0}")]
    Network(String),

    /// The remote side answered, but not with something usable
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Malformed description XML or device snapshot
    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<TransportError> for DiscoveryError {
    fn from(error: TransportError) -> Self {
        match error {
            TransportError::Status { .. } => DiscoveryError::Protocol(error.to_string()),
            other => DiscoveryError::Network(other.to_string()),
        }
    }
}

/// Convenience Result type alias for discovery operations.
pub type Result<T> = std::result::Result<T, DiscoveryError>;
