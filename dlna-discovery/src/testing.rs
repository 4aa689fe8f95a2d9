//! In-memory [`DiscoveryAdapter`] for tests

use std::net::SocketAddr;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::{DiscoveryError, Result};
use crate::ssdp::{DiscoveryAdapter, SsdpEvent, SsdpHeaders};

/// Build a `200 OK` search response for `usn` at `location`
pub fn search_response(usn: &str, location: &str, remote: SocketAddr) -> SsdpEvent {
    SsdpEvent::Response {
        headers: SsdpHeaders::from_pairs([("LOCATION", location), ("USN", usn), ("ST", "ssdp:all")]),
        status_code: 200,
        remote,
    }
}

#[derive(Default)]
struct AdapterState {
    sender: Option<mpsc::UnboundedSender<SsdpEvent>>,
    starts: usize,
    stops: usize,
    searches: Vec<String>,
    replies: Vec<SsdpEvent>,
}

/// Discovery adapter that replays scripted replies instead of using the network
///
/// Replies registered with [`MockDiscoveryAdapter::reply_on_search`] are
/// delivered every time a search is sent; [`MockDiscoveryAdapter::emit`]
/// pushes one event immediately.
#[derive(Default)]
pub struct MockDiscoveryAdapter {
    state: Mutex<AdapterState>,
}

impl MockDiscoveryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `event` in response to every search
    pub fn reply_on_search(&self, event: SsdpEvent) -> &Self {
        if let Ok(mut state) = self.state.lock() {
            state.replies.push(event);
        }
        self
    }

    /// Deliver `event` now; returns false if the adapter is not started
    pub fn emit(&self, event: SsdpEvent) -> bool {
        self.state
            .lock()
            .ok()
            .and_then(|state| state.sender.as_ref().map(|sender| sender.send(event).is_ok()))
            .unwrap_or(false)
    }

    /// Number of times the adapter actually started listening
    pub fn start_count(&self) -> usize {
        self.state.lock().map(|state| state.starts).unwrap_or(0)
    }

    /// Number of times the adapter actually stopped listening
    pub fn stop_count(&self) -> usize {
        self.state.lock().map(|state| state.stops).unwrap_or(0)
    }

    /// Search targets sent so far
    pub fn searches(&self) -> Vec<String> {
        self.state
            .lock()
            .map(|state| state.searches.clone())
            .unwrap_or_default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, AdapterState>> {
        self.state
            .lock()
            .map_err(|_| DiscoveryError::Network("mock adapter poisoned".to_string()))
    }
}

#[async_trait]
impl DiscoveryAdapter for MockDiscoveryAdapter {
    async fn start(&self, events: mpsc::UnboundedSender<SsdpEvent>) -> Result<()> {
        let mut state = self.lock()?;
        if state.sender.is_none() {
            state.sender = Some(events);
            state.starts += 1;
        }
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        let mut state = self.lock()?;
        if state.sender.take().is_some() {
            state.stops += 1;
        }
        Ok(())
    }

    async fn search(&self, target: &str) -> Result<()> {
        let mut state = self.lock()?;
        let sender = state.sender.clone().ok_or(DiscoveryError::NotStarted)?;
        state.searches.push(target.to_string());
        for reply in &state.replies {
            let _ = sender.send(reply.clone());
        }
        Ok(())
    }
}
