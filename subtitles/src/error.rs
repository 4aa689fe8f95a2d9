//! Error types for subtitle extraction

use dlna_transport::TransportError;
use thiserror::Error;

/// Errors raised while indexing a remote MP4 file
#[derive(Debug, Error)]
pub enum SubtitleError {
    /// The byte stream is not a well-formed box sequence
    #[error("Not an MP4 file: {reason} at offset {pos}")]
    NotMp4 { pos: u64, reason: String },

    /// HEAD or range request failed, including non-success statuses
    #[error(transparent)]
    Network(#[from] TransportError),

    /// The server answered without the data needed (no Content-Length, short range body)
    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl SubtitleError {
    pub(crate) fn not_mp4(pos: u64, reason: impl Into<String>) -> Self {
        SubtitleError::NotMp4 {
            pos,
            reason: reason.into(),
        }
    }
}

/// Convenience alias for subtitle results
pub type Result<T> = std::result::Result<T, SubtitleError>;
