//! Device inventory keyed by USN with first-writer-wins resolution
//!
//! The registry owns the discovery lifecycle. A listener task drains the
//! adapter's event channel, filters each message, claims its key under a
//! write lock and spawns the description fetch, so replies for different
//! devices only interleave at the fetch await.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use dlna_transport::{HttpClient, HttpRequest};
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::config::DiscoveryConfig;
use crate::device::{is_media_server, Device, DeviceDescription};
use crate::error::{DiscoveryError, Result};
use crate::ssdp::{DiscoveryAdapter, SsdpEvent};

/// Resolution state of one discovery key
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceEntry {
    /// Description fetch in flight
    Unresolved,
    /// Description fetched and validated
    Resolved(Device),
    /// Description fetch or parse failed at `at`
    Failed { error: String, at: SystemTime },
}

impl DeviceEntry {
    pub fn device(&self) -> Option<&Device> {
        match self {
            DeviceEntry::Resolved(device) => Some(device),
            _ => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, DeviceEntry::Resolved(_))
    }
}

#[derive(Debug, Default)]
struct RegistryState {
    entries: HashMap<String, DeviceEntry>,
    /// Keys in order of first discovery
    order: Vec<String>,
}

/// A key claimed for resolution by one reception
#[derive(Debug)]
struct Claim {
    key: String,
    location: String,
    remote: SocketAddr,
}

struct Shared {
    http: Arc<dyn HttpClient>,
    config: DiscoveryConfig,
    state: RwLock<RegistryState>,
}

impl Shared {
    /// Filter an event and claim its key, or return `None` if it is not ours to resolve
    async fn claim(&self, event: &SsdpEvent) -> Option<Claim> {
        match event {
            SsdpEvent::Response { status_code, .. } if *status_code != 200 => {
                trace!(status_code, remote = %event.remote(), "Ignoring non-200 SSDP response");
                return None;
            }
            SsdpEvent::Notify { headers, .. } if headers.nts() == Some("ssdp:byebye") => {
                debug!(usn = ?headers.usn(), "Ignoring ssdp:byebye notification");
                return None;
            }
            _ => {}
        }

        let headers = event.headers();
        let (location, usn) = match (headers.location(), headers.usn()) {
            (Some(location), Some(usn)) => (location, usn),
            _ => {
                trace!(remote = %event.remote(), "SSDP message without LOCATION or USN");
                return None;
            }
        };

        if !is_media_server(usn) {
            trace!(usn, "Not a media server");
            return None;
        }

        // Cheap read-side check before taking the write lock
        {
            let state = self.state.read().await;
            if let Some(entry) = state.entries.get(usn) {
                if !self.may_retry(entry) {
                    return None;
                }
            }
        }

        let mut state = self.state.write().await;

        // Double-check in case another reception claimed it between locks
        if let Some(entry) = state.entries.get(usn) {
            if !self.may_retry(entry) {
                return None;
            }
        }

        if !state.entries.contains_key(usn) {
            state.order.push(usn.to_string());
        }
        state.entries.insert(usn.to_string(), DeviceEntry::Unresolved);

        debug!(usn, location, "Claimed media server for resolution");
        Some(Claim {
            key: usn.to_string(),
            location: location.to_string(),
            remote: event.remote(),
        })
    }

    fn may_retry(&self, entry: &DeviceEntry) -> bool {
        match (entry, self.config.failure_retry_after) {
            (DeviceEntry::Failed { at, .. }, Some(retry_after)) => at
                .elapsed()
                .map(|elapsed| elapsed >= retry_after)
                .unwrap_or(false),
            _ => false,
        }
    }

    /// Fetch and parse the description for a claimed key, then record the outcome
    async fn resolve(&self, claim: Claim) {
        let entry = match self.fetch_device(&claim).await {
            Ok(device) => {
                info!(usn = %claim.key, name = %device.name, "Media server resolved");
                DeviceEntry::Resolved(device)
            }
            Err(e) => {
                warn!(usn = %claim.key, location = %claim.location, error = %e, "Device description failed");
                DeviceEntry::Failed {
                    error: e.to_string(),
                    at: SystemTime::now(),
                }
            }
        };

        self.state.write().await.entries.insert(claim.key, entry);
    }

    async fn fetch_device(&self, claim: &Claim) -> Result<Device> {
        let request = HttpRequest::get(&claim.location);
        let response = tokio::time::timeout(self.config.description_timeout, self.http.execute(request))
            .await
            .map_err(|_| {
                DiscoveryError::Network(format!(
                    "Timed out fetching {} after {:?}",
                    claim.location, self.config.description_timeout
                ))
            })??
            .error_for_status(&claim.location)?;

        let xml = response.text()?;
        DeviceDescription::from_xml(&xml)?.into_device(&claim.key, &claim.location, Some(claim.remote))
    }
}

/// Inventory of media servers found through a [`DiscoveryAdapter`]
pub struct DeviceRegistry {
    adapter: Arc<dyn DiscoveryAdapter>,
    shared: Arc<Shared>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl DeviceRegistry {
    /// Create a registry; nothing is sent until [`DeviceRegistry::start`]
    pub fn new(
        adapter: Arc<dyn DiscoveryAdapter>,
        http: Arc<dyn HttpClient>,
        config: DiscoveryConfig,
    ) -> Self {
        Self {
            adapter,
            shared: Arc::new(Shared {
                http,
                config,
                state: RwLock::new(RegistryState::default()),
            }),
            listener: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.shared.config
    }

    /// Begin listening for discovery replies. A no-op while already started.
    pub async fn start(&self) -> Result<()> {
        let mut listener = self.listener.lock().await;
        if listener.is_some() {
            trace!("Registry already started");
            return Ok(());
        }

        let (tx, mut rx) = mpsc::unbounded_channel();
        self.adapter.start(tx).await?;

        let shared = self.shared.clone();
        *listener = Some(tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if let Some(claim) = shared.claim(&event).await {
                    let shared = shared.clone();
                    tokio::spawn(async move { shared.resolve(claim).await });
                }
            }
            debug!("Discovery event channel closed");
        }));

        info!("Device registry started");
        Ok(())
    }

    /// Stop listening. A no-op while stopped.
    ///
    /// Description fetches already in flight still complete and update the registry.
    pub async fn stop(&self) -> Result<()> {
        let mut listener = self.listener.lock().await;
        let Some(task) = listener.take() else {
            return Ok(());
        };

        task.abort();
        self.adapter.stop().await?;
        info!("Device registry stopped");
        Ok(())
    }

    pub async fn is_started(&self) -> bool {
        self.listener.lock().await.is_some()
    }

    /// Send a discovery query and return the devices resolved once `timeout` elapses.
    ///
    /// `None` uses the configured search target. The registry is stopped
    /// before returning; late resolutions still land in the registry but are
    /// not part of the returned snapshot.
    pub async fn search(&self, search_target: Option<&str>, timeout: Duration) -> Result<Vec<Device>> {
        if !self.is_started().await {
            return Err(DiscoveryError::NotStarted);
        }

        let target = search_target.unwrap_or(&self.shared.config.search_target);
        info!(target, ?timeout, "Searching for media servers");
        self.adapter.search(target).await?;

        tokio::time::sleep(timeout).await;

        let devices = self.devices().await;
        self.stop().await?;

        debug!(found = devices.len(), "Search finished");
        Ok(devices)
    }

    /// [`DeviceRegistry::search`] with the configured target and timeout
    pub async fn search_default(&self) -> Result<Vec<Device>> {
        self.search(None, self.shared.config.search_timeout).await
    }

    /// Process one discovery event to completion, awaiting the description fetch
    pub async fn handle_event(&self, event: SsdpEvent) {
        if let Some(claim) = self.shared.claim(&event).await {
            self.shared.resolve(claim).await;
        }
    }

    /// Resolved devices in order of first discovery
    pub async fn devices(&self) -> Vec<Device> {
        let state = self.shared.state.read().await;
        state
            .order
            .iter()
            .filter_map(|key| state.entries.get(key).and_then(DeviceEntry::device))
            .cloned()
            .collect()
    }

    /// Resolved device for a discovery key
    pub async fn device(&self, key: &str) -> Option<Device> {
        self.shared
            .state
            .read()
            .await
            .entries
            .get(key)
            .and_then(DeviceEntry::device)
            .cloned()
    }

    /// Resolution state of a discovery key
    pub async fn entry(&self, key: &str) -> Option<DeviceEntry> {
        self.shared.state.read().await.entries.get(key).cloned()
    }

    /// Number of resolved devices
    pub async fn len(&self) -> usize {
        self.shared
            .state
            .read()
            .await
            .entries
            .values()
            .filter(|entry| entry.is_resolved())
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Forget every key, including failure markers
    pub async fn clear(&self) {
        let mut state = self.shared.state.write().await;
        state.entries.clear();
        state.order.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ssdp::SsdpHeaders;
    use crate::testing::MockDiscoveryAdapter;
    use dlna_transport::testing::MockHttpClient;
    use dlna_transport::Method;

    const LOCATION: &str = "http://192.168.1.20:8200/rootDesc.xml";
    const USN: &str = "uuid:nas::urn:schemas-upnp-org:device:MediaServer:1";
    const DESCRIPTION: &str = r#"<root><device>
        <deviceType>urn:schemas-upnp-org:device:MediaServer:1</deviceType>
        <friendlyName>NAS</friendlyName>
    </device></root>"#;

    fn response(usn: &str, status_code: u16) -> SsdpEvent {
        SsdpEvent::Response {
            headers: SsdpHeaders::from_pairs([("LOCATION", LOCATION), ("USN", usn)]),
            status_code,
            remote: "192.168.1.20:1900".parse().unwrap(),
        }
    }

    fn registry(http: Arc<MockHttpClient>, config: DiscoveryConfig) -> DeviceRegistry {
        DeviceRegistry::new(Arc::new(MockDiscoveryAdapter::new()), http, config)
    }

    #[tokio::test]
    async fn test_non_200_response_is_ignored() {
        let http = Arc::new(MockHttpClient::new());
        http.route(Method::Get, LOCATION, 200, DESCRIPTION);
        let registry = registry(http.clone(), DiscoveryConfig::default());

        registry.handle_event(response(USN, 500)).await;
        assert!(registry.entry(USN).await.is_none());
        assert!(http.requests().is_empty());
    }

    #[tokio::test]
    async fn test_byebye_is_ignored() {
        let http = Arc::new(MockHttpClient::new());
        let registry = registry(http.clone(), DiscoveryConfig::default());

        let byebye = SsdpEvent::Notify {
            headers: SsdpHeaders::from_pairs([("LOCATION", LOCATION), ("USN", USN), ("NTS", "ssdp:byebye")]),
            remote: "192.168.1.20:1900".parse().unwrap(),
        };
        registry.handle_event(byebye).await;
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_alive_notification_is_resolved() {
        let http = Arc::new(MockHttpClient::new());
        http.route(Method::Get, LOCATION, 200, DESCRIPTION);
        let registry = registry(http, DiscoveryConfig::default());

        let alive = SsdpEvent::Notify {
            headers: SsdpHeaders::from_pairs([("LOCATION", LOCATION), ("USN", USN), ("NTS", "ssdp:alive")]),
            remote: "192.168.1.20:1900".parse().unwrap(),
        };
        registry.handle_event(alive).await;
        assert_eq!(registry.device(USN).await.map(|d| d.name), Some("NAS".to_string()));
    }

    #[tokio::test]
    async fn test_failed_entry_retried_after_policy_elapses() {
        let http = Arc::new(MockHttpClient::new());
        http.fail(Method::Get, LOCATION, "connection refused");
        let registry = registry(
            http.clone(),
            DiscoveryConfig::default().with_failure_retry_after(Duration::ZERO),
        );

        registry.handle_event(response(USN, 200)).await;
        assert!(matches!(registry.entry(USN).await, Some(DeviceEntry::Failed { .. })));

        http.route(Method::Get, LOCATION, 200, DESCRIPTION);
        registry.handle_event(response(USN, 200)).await;
        assert!(matches!(registry.entry(USN).await, Some(DeviceEntry::Resolved(_))));
        assert_eq!(http.count(Method::Get, LOCATION), 2);

        // Retrying must not duplicate the key in discovery order
        assert_eq!(registry.devices().await.len(), 1);
    }

    #[tokio::test]
    async fn test_clear_forgets_failures() {
        let http = Arc::new(MockHttpClient::new());
        let registry = registry(http.clone(), DiscoveryConfig::default());

        // Unknown route answers 404
        registry.handle_event(response(USN, 200)).await;
        match registry.entry(USN).await {
            Some(DeviceEntry::Failed { error, .. }) => assert!(error.contains("404")),
            other => panic!("Expected a failure marker, got {:?}", other),
        }

        registry.clear().await;
        assert!(registry.entry(USN).await.is_none());
    }

    #[tokio::test]
    async fn test_missing_device_type_marks_failure() {
        let http = Arc::new(MockHttpClient::new());
        http.route(Method::Get, LOCATION, 200, "<root><device><friendlyName>x</friendlyName></device></root>");
        let registry = registry(http, DiscoveryConfig::default());

        registry.handle_event(response(USN, 200)).await;
        assert!(matches!(registry.entry(USN).await, Some(DeviceEntry::Failed { .. })));
        assert!(registry.devices().await.is_empty());
    }
}
