//! UPnP/DLNA media server discovery
//!
//! This crate finds media servers on the local network with SSDP, fetches
//! their device descriptions and keeps an inventory keyed by USN.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use dlna_discovery::{DeviceRegistry, DiscoveryConfig, SsdpClient};
//! use dlna_transport::ReqwestHttpClient;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = DiscoveryConfig::default();
//! let registry = DeviceRegistry::new(
//!     Arc::new(SsdpClient::new(config.mx)),
//!     Arc::new(ReqwestHttpClient::new()?),
//!     config,
//! );
//!
//! registry.start().await?;
//! for device in registry.search_default().await? {
//!     println!("Found {} at {}", device.name, device.location);
//! }
//! # Ok(())
//! # }
//! ```

mod config;
pub mod device;
mod error;
mod registry;
pub mod ssdp;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use config::DiscoveryConfig;
pub use device::{Device, DeviceDescription, Service};
pub use error::{DiscoveryError, Result};
pub use registry::{DeviceEntry, DeviceRegistry};
pub use ssdp::{parse_ssdp_message, DiscoveryAdapter, SsdpClient, SsdpEvent, SsdpHeaders};
