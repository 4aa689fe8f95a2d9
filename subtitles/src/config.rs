//! Configuration for the subtitle extractor

use serde::{Deserialize, Serialize};

use crate::error::SubtitleError;

/// Tuning for [`SubtitleExtractor`](crate::SubtitleExtractor)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubtitleConfig {
    /// Range size used while the engine is still parsing the movie header
    /// Default: 64 KiB
    pub initial_chunk_size: u64,

    /// Range size used once the engine is ready
    /// Default: 1 MiB
    pub chunk_size: u64,

    /// Samples requested per extraction batch and track
    /// Default: 1000
    pub extraction_batch_size: u32,

    /// Bytes fetched to read one box header; 16 covers a 64-bit size
    /// Default: 16
    pub header_probe_size: u64,
}

impl Default for SubtitleConfig {
    fn default() -> Self {
        Self {
            initial_chunk_size: 64 * 1024,
            chunk_size: 1024 * 1024,
            extraction_batch_size: 1000,
            header_probe_size: 16,
        }
    }
}

impl SubtitleConfig {
    /// Create a new SubtitleConfig with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Smaller ranges for memory-constrained clients
    pub fn low_memory() -> Self {
        Self {
            initial_chunk_size: 16 * 1024,
            chunk_size: 256 * 1024,
            extraction_batch_size: 250,
            ..Default::default()
        }
    }

    /// Validate the configuration and return any issues
    pub fn validate(&self) -> Result<(), SubtitleError> {
        if self.initial_chunk_size == 0 || self.chunk_size == 0 {
            return Err(SubtitleError::Protocol(
                "Chunk sizes must be greater than 0".to_string(),
            ));
        }

        if self.initial_chunk_size > self.chunk_size {
            return Err(SubtitleError::Protocol(
                "Initial chunk size must not exceed chunk size".to_string(),
            ));
        }

        if self.extraction_batch_size == 0 {
            return Err(SubtitleError::Protocol(
                "Extraction batch size must be greater than 0".to_string(),
            ));
        }

        if self.header_probe_size < 16 {
            return Err(SubtitleError::Protocol(
                "Header probe must cover at least 16 bytes".to_string(),
            ));
        }

        Ok(())
    }

    pub fn with_chunk_sizes(mut self, initial: u64, chunk: u64) -> Self {
        self.initial_chunk_size = initial;
        self.chunk_size = chunk;
        self
    }

    pub fn with_batch_size(mut self, batch: u32) -> Self {
        self.extraction_batch_size = batch;
        self
    }
}
