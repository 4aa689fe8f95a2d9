//! MediaService - entry point tying discovery, browsing and subtitles together

use std::sync::Arc;

use content_directory::ContentDirectoryClient;
use dlna_discovery::{Device, DeviceRegistry, DiscoveryAdapter, SsdpClient};
use dlna_subtitles::SubtitleExtractor;
use dlna_transport::{HttpClient, ReqwestHttpClient};
use tracing::{debug, info};

use crate::config::SdkConfig;
use crate::error::{Result, SdkError};

/// Owns the collaborators shared by every operation
///
/// Nothing is global: build one with injected adapters for tests, or with
/// [`MediaService::with_defaults`] for the real network.
///
/// # Example
///
/// ```rust,no_run
/// use dlna_sdk::MediaService;
///
/// # async fn run() -> Result<(), dlna_sdk::SdkError> {
/// let service = MediaService::with_defaults()?;
/// for device in service.search().await? {
///     let directory = service.content_directory(&device)?;
///     println!("{}: {} entries", device.name, directory.browse_root().await?.len());
/// }
/// # Ok(())
/// # }
/// ```
pub struct MediaService {
    http: Arc<dyn HttpClient>,
    registry: DeviceRegistry,
    config: SdkConfig,
}

impl MediaService {
    /// Build a service from explicit collaborators
    pub fn new(
        adapter: Arc<dyn DiscoveryAdapter>,
        http: Arc<dyn HttpClient>,
        config: SdkConfig,
    ) -> Result<Self> {
        config.validate()?;
        let registry = DeviceRegistry::new(adapter, http.clone(), config.discovery.clone());

        Ok(Self {
            http,
            registry,
            config,
        })
    }

    /// SSDP over UDP and `reqwest`, configured from the environment
    pub fn with_defaults() -> Result<Self> {
        let config = SdkConfig::from_env();
        let http = Arc::new(ReqwestHttpClient::with_config(&config.http)?);
        let adapter = Arc::new(SsdpClient::new(config.discovery.mx));
        Self::new(adapter, http, config)
    }

    pub fn config(&self) -> &SdkConfig {
        &self.config
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    pub async fn start(&self) -> Result<()> {
        self.registry.start().await?;
        Ok(())
    }

    pub async fn stop(&self) -> Result<()> {
        self.registry.stop().await?;
        Ok(())
    }

    /// Start discovery if needed and return the media servers found within
    /// the configured search timeout
    ///
    /// The registry is stopped again once the snapshot is taken.
    pub async fn search(&self) -> Result<Vec<Device>> {
        self.registry.start().await?;
        let devices = self.registry.search_default().await?;
        info!(found = devices.len(), "Media server search complete");
        Ok(devices)
    }

    /// A resolved device by discovery key
    pub async fn device(&self, key: &str) -> Result<Device> {
        self.registry
            .device(key)
            .await
            .ok_or_else(|| SdkError::DeviceNotFound(key.to_string()))
    }

    /// ContentDirectory client for a device's advertised service
    pub fn content_directory(&self, device: &Device) -> Result<ContentDirectoryClient> {
        Ok(ContentDirectoryClient::for_device(device, self.http.clone())?)
    }

    /// ContentDirectory client for a device already in the registry
    pub async fn content_directory_for(&self, key: &str) -> Result<ContentDirectoryClient> {
        let device = self.device(key).await?;
        self.content_directory(&device)
    }

    /// Subtitle extractor for a direct media URL
    pub fn subtitles(&self, url: impl Into<String>) -> Result<SubtitleExtractor> {
        let url = url.into();
        debug!(%url, "Creating subtitle extractor");
        Ok(SubtitleExtractor::with_config(
            url,
            self.http.clone(),
            self.config.subtitles.clone(),
        )?)
    }
}
