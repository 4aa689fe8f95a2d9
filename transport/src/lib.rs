//! Transport layer for UPnP/DLNA devices
//!
//! This crate provides the narrow HTTP interface every other crate of the SDK
//! talks through, a `reqwest`-backed implementation of it, and a minimal SOAP
//! client for UPnP control endpoints.
//!
//! ```no_run
//! use std::sync::Arc;
//! use dlna_transport::{HttpClient, HttpRequest, ReqwestHttpClient, SoapClient};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let http: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new()?);
//!
//! // Plain ranged fetch
//! let head = http
//!     .execute(HttpRequest::get("http://192.168.1.20:8200/MediaItems/22.mp4").range(0, 15))
//!     .await?;
//! println!("{} bytes", head.bytes().len());
//!
//! // SOAP action
//! let soap = SoapClient::new(http);
//! let response = soap
//!     .call(
//!         "http://192.168.1.20:8200/ctl/ContentDir",
//!         "urn:schemas-upnp-org:service:ContentDirectory:1",
//!         "GetSearchCapabilities",
//!         "",
//!     )
//!     .await?;
//! println!("{}", response.name);
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod http;
mod soap;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use config::HttpConfig;
pub use error::{Result, SoapError, TransportError};
pub use http::{HttpClient, HttpRequest, HttpResponse, Method, ReqwestHttpClient};
pub use soap::{child_ignore_case, child_text, SoapClient};

/// Re-exported so downstream crates parse responses with the same XML tree type
pub use xmltree::Element;
