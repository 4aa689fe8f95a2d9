use thiserror::Error;

#[derive(Error, Debug)]
pub enum SdkError {
    #[error("Transport error: {0}")]
    Transport(#[from] dlna_transport::TransportError),

    #[error("Discovery error: {0}")]
    Discovery(#[from] dlna_discovery::DiscoveryError),

    #[error("ContentDirectory error: {0}")]
    ContentDirectory(#[from] content_directory::ContentDirectoryError),

    #[error("Subtitle error: {0}")]
    Subtitles(#[from] dlna_subtitles::SubtitleError),

    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, SdkError>;
