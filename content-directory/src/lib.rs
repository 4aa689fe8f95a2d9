//! UPnP ContentDirectory client
//!
//! Builds `Browse`, `Search` and `GetSearchCapabilities` requests, sends them
//! through the SOAP client and normalizes the DIDL-Lite results.
//!
//! ```no_run
//! use std::sync::Arc;
//! use content_directory::ContentDirectoryClient;
//! use dlna_transport::ReqwestHttpClient;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let http = Arc::new(ReqwestHttpClient::new()?);
//! let client = ContentDirectoryClient::new("http://192.168.1.20:8200/ctl/ContentDir", http);
//!
//! for item in client.browse_root().await? {
//!     println!("{:?} {:?}", item.kind, item.title);
//! }
//! # Ok(())
//! # }
//! ```

mod client;
pub mod didl;
mod error;
pub mod request;
mod response;

pub use client::{ContentDirectoryClient, CONTENT_DIRECTORY_SERVICE, ROOT_CONTAINER};
pub use didl::{parse_didl, CatalogItem, ItemKind, Resource};
pub use error::{ContentDirectoryError, Result};
pub use request::{search_criteria, BrowseFlag, BrowseRequest, SearchRequest};
pub use response::{BrowseResponse, SearchResponse};
