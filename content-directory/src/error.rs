//! Error types for ContentDirectory operations

use dlna_transport::SoapError;
use thiserror::Error;

/// Errors raised by [`ContentDirectoryClient`](crate::ContentDirectoryClient)
#[derive(Debug, Error)]
pub enum ContentDirectoryError {
    /// The SOAP exchange failed: network, HTTP status, fault or envelope shape
    #[error(transparent)]
    Soap(#[from] SoapError),

    /// The action response is missing `Result` or carries malformed DIDL-Lite
    #[error("Invalid ContentDirectory response: {0}")]
    Protocol(String),

    /// The device does not advertise a ContentDirectory service
    #[error("Device {0} has no ContentDirectory service")]
    MissingService(String),
}

/// Convenience alias for ContentDirectory results
pub type Result<T> = std::result::Result<T, ContentDirectoryError>;
