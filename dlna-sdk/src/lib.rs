//! # DLNA SDK
//!
//! Find media servers on the local network, browse their catalogs and pull
//! subtitle tracks out of remote MP4 files.
//!
//! ```rust,no_run
//! use dlna_sdk::{init_tracing, MediaService};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     init_tracing()?;
//!
//!     let service = MediaService::with_defaults()?;
//!     let devices = service.search().await?;
//!
//!     if let Some(device) = devices.first() {
//!         let directory = service.content_directory(device)?;
//!         for item in directory.browse_root().await? {
//!             println!("{:?} {:?}", item.kind, item.title);
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! dlna-sdk (MediaService, SdkConfig, SdkError)
//!     ├── dlna-discovery     SSDP adapter, description parsing, DeviceRegistry
//!     ├── content-directory  Browse/Search SOAP actions, DIDL-Lite normalization
//!     └── dlna-subtitles     Ranged MP4 indexing, demux-driven cue extraction
//!             ↓
//!         dlna-transport (HttpClient, SoapClient)
//! ```
//!
//! Every crate is re-exported, so applications only need this one.

mod config;
mod error;
pub mod logging;
mod service;

pub use config::{SdkConfig, SEARCH_TARGET_ENV, SEARCH_TIMEOUT_ENV};
pub use error::{Result, SdkError};
pub use logging::{init_tracing, LoggingError};
pub use service::MediaService;

pub use content_directory;
pub use dlna_discovery;
pub use dlna_subtitles;
pub use dlna_transport;

pub use content_directory::{CatalogItem, ContentDirectoryClient, ItemKind, Resource};
pub use dlna_discovery::{Device, DeviceRegistry, Service};
pub use dlna_subtitles::{Cue, DemuxEngine, SubtitleExtractor, SubtitleTrack};
