//! Error types for the transport layer

use thiserror::Error;

/// Errors raised by an [`HttpClient`](crate::HttpClient) implementation
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection, DNS or I/O failure while talking to the remote host
    #[error("Network error: {0}")]
    Network(String),

    /// The remote host answered with a non-success status code
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// The response body could not be read or decoded
    #[error("Invalid response body: {0}")]
    Body(String),

    /// The request could not be built (bad URL, bad header value)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Errors that can occur during SOAP communication
#[derive(Debug, Error)]
pub enum SoapError {
    /// Network or HTTP communication error
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// XML parsing error or missing envelope element
    #[error("XML parsing error: {0}")]
    Parse(String),

    /// SOAP fault returned by the server
    #[error("SOAP fault: error code {code} ({description})")]
    Fault { code: u16, description: String },
}

impl SoapError {
    /// True when the failure happened below the SOAP layer (socket, DNS, body read)
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            SoapError::Transport(TransportError::Network(_) | TransportError::Body(_))
        )
    }
}

/// Convenience alias for transport results
pub type Result<T> = std::result::Result<T, TransportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_display() {
        let error = TransportError::Status {
            status: 404,
            url: "http://192.168.1.20:8200/ctl".to_string(),
        };
        assert_eq!(error.to_string(), "HTTP 404 from http://192.168.1.20:8200/ctl");
    }

    #[test]
    fn test_soap_error_classification() {
        let network: SoapError = TransportError::Network("connection refused".to_string()).into();
        assert!(network.is_network());

        let status: SoapError = TransportError::Status {
            status: 500,
            url: "http://host/ctl".to_string(),
        }
        .into();
        assert!(!status.is_network());

        let fault = SoapError::Fault {
            code: 701,
            description: "No such object".to_string(),
        };
        assert!(!fault.is_network());
        assert!(fault.to_string().contains("701"));
    }
}
