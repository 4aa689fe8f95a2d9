//! ContentDirectory client bound to one media server

use std::sync::Arc;

use dlna_discovery::Device;
use dlna_transport::{child_text, HttpClient, SoapClient};
use tracing::debug;

use crate::didl::CatalogItem;
use crate::error::{ContentDirectoryError, Result};
use crate::request::{BrowseRequest, SearchRequest};
use crate::response::{BrowseResponse, SearchResponse};

/// Service type every request is addressed to
pub const CONTENT_DIRECTORY_SERVICE: &str = "urn:schemas-upnp-org:service:ContentDirectory:1";

/// Object id of the root container
pub const ROOT_CONTAINER: &str = "0";

/// Browses and searches the catalog of one media server
#[derive(Debug, Clone)]
pub struct ContentDirectoryClient {
    control_url: String,
    soap: SoapClient,
}

impl ContentDirectoryClient {
    /// Create a client for an absolute control URL
    pub fn new(control_url: impl Into<String>, http: Arc<dyn HttpClient>) -> Self {
        Self::with_soap(control_url, SoapClient::new(http))
    }

    pub fn with_soap(control_url: impl Into<String>, soap: SoapClient) -> Self {
        Self {
            control_url: control_url.into(),
            soap,
        }
    }

    /// Create a client for a discovered device's ContentDirectory service
    pub fn for_device(device: &Device, http: Arc<dyn HttpClient>) -> Result<Self> {
        let control_url = device
            .content_directory_control_url()
            .ok_or_else(|| ContentDirectoryError::MissingService(device.id.clone()))?;

        debug!(device = %device.name, %control_url, "ContentDirectory client bound");
        Ok(Self::new(control_url, http))
    }

    pub fn control_url(&self) -> &str {
        &self.control_url
    }

    /// Children of `container_id`; 0/0 means from the start with the server's page size
    pub async fn browse(
        &self,
        container_id: &str,
        starting_index: u32,
        requested_count: u32,
    ) -> Result<Vec<CatalogItem>> {
        Ok(self
            .browse_page(container_id, starting_index, requested_count)
            .await?
            .items)
    }

    /// Children of the root container
    pub async fn browse_root(&self) -> Result<Vec<CatalogItem>> {
        self.browse(ROOT_CONTAINER, 0, 0).await
    }

    /// Children of `container_id` with the paging counters
    pub async fn browse_page(
        &self,
        container_id: &str,
        starting_index: u32,
        requested_count: u32,
    ) -> Result<BrowseResponse> {
        let request = BrowseRequest::children(container_id).with_range(starting_index, requested_count);
        self.execute_browse(&request).await
    }

    /// Items under `container_id` whose title, album or artist contains `term`
    pub async fn search(
        &self,
        container_id: &str,
        starting_index: u32,
        requested_count: u32,
        term: &str,
    ) -> Result<Vec<CatalogItem>> {
        Ok(self
            .search_page(container_id, starting_index, requested_count, term)
            .await?
            .items)
    }

    /// [`ContentDirectoryClient::search`] with the paging counters
    pub async fn search_page(
        &self,
        container_id: &str,
        starting_index: u32,
        requested_count: u32,
        term: &str,
    ) -> Result<SearchResponse> {
        let request = SearchRequest::new(container_id, term).with_range(starting_index, requested_count);
        self.execute_search(&request).await
    }

    /// Metadata of one object, or `None` when the server returns nothing
    pub async fn get_metadata(&self, object_id: &str) -> Result<Option<CatalogItem>> {
        let page = self.execute_browse(&BrowseRequest::metadata(object_id)).await?;
        Ok(page.items.into_iter().next())
    }

    /// Comma-separated search properties, or `None` if the server supports none
    pub async fn get_search_capabilities(&self) -> Result<Option<String>> {
        let response = self
            .soap
            .call(&self.control_url, CONTENT_DIRECTORY_SERVICE, "GetSearchCapabilities", "")
            .await?;
        Ok(child_text(&response, "SearchCaps"))
    }

    /// Send a prepared `Browse` request
    pub async fn execute_browse(&self, request: &BrowseRequest) -> Result<BrowseResponse> {
        debug!(object_id = %request.object_id, flag = request.flag.as_str(), "Browse");
        let response = self
            .soap
            .call(&self.control_url, CONTENT_DIRECTORY_SERVICE, "Browse", &request.to_payload())
            .await?;
        BrowseResponse::from_element(&response)
    }

    /// Send a prepared `Search` request
    pub async fn execute_search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        debug!(container_id = %request.container_id, criteria = %request.criteria, "Search");
        let response = self
            .soap
            .call(&self.control_url, CONTENT_DIRECTORY_SERVICE, "Search", &request.to_payload())
            .await?;
        SearchResponse::from_element(&response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dlna_discovery::Service;

    fn device(services: Vec<Service>) -> Device {
        Device {
            id: "uuid:nas::urn:schemas-upnp-org:device:MediaServer:1".to_string(),
            location: "http://192.168.1.20:8200/rootDesc.xml".to_string(),
            name: "NAS".to_string(),
            device_type: "urn:schemas-upnp-org:device:MediaServer:1".to_string(),
            manufacturer: None,
            model_name: None,
            udn: None,
            services,
            remote_address: None,
        }
    }

    #[test]
    fn test_for_device_resolves_control_url() {
        let http = Arc::new(dlna_transport::testing::MockHttpClient::new());
        let client = ContentDirectoryClient::for_device(
            &device(vec![Service {
                service_type: CONTENT_DIRECTORY_SERVICE.to_string(),
                control_url: "/ctl/ContentDir".to_string(),
                event_sub_url: None,
                scpd_url: None,
            }]),
            http,
        )
        .unwrap();
        assert_eq!(client.control_url(), "http://192.168.1.20:8200/ctl/ContentDir");
    }

    #[test]
    fn test_for_device_without_service() {
        let http = Arc::new(dlna_transport::testing::MockHttpClient::new());
        let error = ContentDirectoryClient::for_device(&device(Vec::new()), http).unwrap_err();
        assert!(matches!(error, ContentDirectoryError::MissingService(_)));
    }
}
