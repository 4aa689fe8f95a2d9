//! Discovery through browsing, with SSDP and HTTP replaced by in-memory doubles

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use dlna_sdk::dlna_discovery::testing::{search_response, MockDiscoveryAdapter};
use dlna_sdk::dlna_discovery::DiscoveryConfig;
use dlna_sdk::dlna_transport::testing::MockHttpClient;
use dlna_sdk::dlna_transport::Method;
use dlna_sdk::{ItemKind, MediaService, SdkConfig, SdkError};

const ROOT_DESC: &str = include_str!("fixtures/minidlna_root.xml");
const BROWSE_ROOT: &str = include_str!("fixtures/browse_root.xml");

const LOCATION: &str = "http://192.168.1.20:8200/rootDesc.xml";
const CONTROL_URL: &str = "http://192.168.1.20:8200/ctl/ContentDir";
const USN: &str =
    "uuid:4d696e69-444c-164e-9d41-b827eb0d1a5f::urn:schemas-upnp-org:device:MediaServer:1";

fn media_service() -> (MediaService, Arc<MockHttpClient>) {
    let remote: SocketAddr = "192.168.1.20:1900".parse().unwrap();
    let adapter = Arc::new(MockDiscoveryAdapter::new());
    adapter.reply_on_search(search_response(USN, LOCATION, remote));

    let http = Arc::new(MockHttpClient::new());
    http.route(Method::Get, LOCATION, 200, ROOT_DESC);
    http.route(Method::Post, CONTROL_URL, 200, BROWSE_ROOT);

    let config = SdkConfig::default().with_discovery(
        DiscoveryConfig::default().with_search_timeout(Duration::from_millis(200)),
    );
    let service = MediaService::new(adapter, http.clone(), config).unwrap();
    (service, http)
}

#[tokio::test]
async fn test_search_then_browse_photo_resource() {
    let (service, http) = media_service();

    let devices = service.search().await.unwrap();
    assert_eq!(devices.len(), 1);
    let device = &devices[0];
    assert_eq!(device.id, USN);
    assert!(!service.registry().is_started().await);

    let directory = service.content_directory(device).unwrap();
    assert_eq!(directory.control_url(), CONTROL_URL);

    let items = directory.browse_root().await.unwrap();
    let photo = items
        .iter()
        .find(|item| item.class.as_deref() == Some("object.item.imageItem.photo"))
        .expect("root listing contains a photo");

    assert_eq!(photo.kind, ItemKind::Item);
    assert!(photo.url().is_some_and(|url| !url.is_empty()));
    assert_eq!(photo.url(), Some("http://192.168.1.20:8200/MediaItems/42.jpg"));
    assert_eq!(http.count(Method::Post, CONTROL_URL), 1);
}

#[tokio::test]
async fn test_lookup_by_discovery_key() {
    let (service, _http) = media_service();
    service.search().await.unwrap();

    let device = service.device(USN).await.unwrap();
    assert_eq!(device.location, LOCATION);

    let directory = service.content_directory_for(USN).await.unwrap();
    assert!(!directory.browse_root().await.unwrap().is_empty());

    assert!(matches!(
        service.device("uuid:unknown").await,
        Err(SdkError::DeviceNotFound(_))
    ));
}

#[tokio::test]
async fn test_search_can_be_repeated() {
    let (service, http) = media_service();

    assert_eq!(service.search().await.unwrap().len(), 1);
    assert_eq!(service.search().await.unwrap().len(), 1);

    // Known devices are not fetched again
    assert_eq!(http.count(Method::Get, LOCATION), 1);
}
