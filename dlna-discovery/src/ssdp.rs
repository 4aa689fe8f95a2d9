//! SSDP (Simple Service Discovery Protocol) messages and the UDP discovery adapter
//!
//! The registry never touches a socket itself. It consumes [`SsdpEvent`]s
//! from whatever [`DiscoveryAdapter`] it was built with; [`SsdpClient`] is the
//! default one, sending M-SEARCH queries over a tokio UDP socket and listening
//! for `NOTIFY` announcements on the multicast group.

use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::error::{DiscoveryError, Result};

/// SSDP multicast group and port
pub const SSDP_MULTICAST_ADDR: &str = "239.255.255.250:1900";

const SSDP_MULTICAST_IP: Ipv4Addr = Ipv4Addr::new(239, 255, 255, 250);
const SSDP_PORT: u16 = 1900;

/// Header block of an SSDP message; lookups ignore case
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SsdpHeaders {
    values: HashMap<String, String>,
}

impl SsdpHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a header block from name/value pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut headers = Self::new();
        for (name, value) in pairs {
            headers.insert(name.as_ref(), value);
        }
        headers
    }

    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.values.insert(name.trim().to_ascii_uppercase(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .get(&name.to_ascii_uppercase())
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    pub fn location(&self) -> Option<&str> {
        self.get("LOCATION")
    }

    pub fn usn(&self) -> Option<&str> {
        self.get("USN")
    }

    pub fn st(&self) -> Option<&str> {
        self.get("ST")
    }

    pub fn nt(&self) -> Option<&str> {
        self.get("NT")
    }

    pub fn nts(&self) -> Option<&str> {
        self.get("NTS")
    }

    pub fn server(&self) -> Option<&str> {
        self.get("SERVER")
    }
}

/// A message delivered by a [`DiscoveryAdapter`]
#[derive(Debug, Clone, PartialEq)]
pub enum SsdpEvent {
    /// Unicast reply to an M-SEARCH query
    Response {
        headers: SsdpHeaders,
        status_code: u16,
        remote: SocketAddr,
    },
    /// Multicast `NOTIFY` announcement (`ssdp:alive` or `ssdp:byebye`)
    Notify {
        headers: SsdpHeaders,
        remote: SocketAddr,
    },
}

impl SsdpEvent {
    pub fn headers(&self) -> &SsdpHeaders {
        match self {
            SsdpEvent::Response { headers, .. } | SsdpEvent::Notify { headers, .. } => headers,
        }
    }

    pub fn remote(&self) -> SocketAddr {
        match self {
            SsdpEvent::Response { remote, .. } | SsdpEvent::Notify { remote, .. } => *remote,
        }
    }
}

/// Parse a raw SSDP datagram
///
/// Returns `None` for anything that is neither a response nor a `NOTIFY`,
/// which includes our own M-SEARCH echoed back by multicast loopback.
pub fn parse_ssdp_message(text: &str, remote: SocketAddr) -> Option<SsdpEvent> {
    let mut lines = text.lines();
    let start_line = lines.next()?.trim();

    let mut headers = SsdpHeaders::new();
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name, value.trim());
        }
    }

    if start_line.starts_with("HTTP/") {
        let status_code = start_line.split_whitespace().nth(1)?.parse().ok()?;
        Some(SsdpEvent::Response {
            headers,
            status_code,
            remote,
        })
    } else if start_line
        .get(..6)
        .is_some_and(|method| method.eq_ignore_ascii_case("NOTIFY"))
    {
        Some(SsdpEvent::Notify { headers, remote })
    } else {
        None
    }
}

/// Source of discovery messages consumed by the registry
#[async_trait]
pub trait DiscoveryAdapter: Send + Sync {
    /// Begin delivering messages on `events`. Calling again while started is a no-op.
    async fn start(&self, events: mpsc::UnboundedSender<SsdpEvent>) -> Result<()>;

    /// Stop delivering messages. Calling while stopped is a no-op.
    async fn stop(&self) -> Result<()>;

    /// Send a discovery query for `target`
    async fn search(&self, target: &str) -> Result<()>;
}

struct Listening {
    socket: Arc<UdpSocket>,
    task: JoinHandle<()>,
    /// Receive loop of the multicast socket; `None` when port 1900 was unavailable
    notify_task: Option<JoinHandle<()>>,
}

/// [`DiscoveryAdapter`] sending M-SEARCH queries over UDP
///
/// Search responses arrive on an ephemeral socket. `NOTIFY` announcements are
/// received on a second socket bound to port 1900 and joined to the SSDP
/// multicast group; if that port is taken by another process only search
/// responses are delivered.
pub struct SsdpClient {
    mx: u8,
    listening: Mutex<Option<Listening>>,
}

impl SsdpClient {
    /// Create a client requesting `mx` seconds of maximum response delay
    pub fn new(mx: u8) -> Self {
        Self {
            mx,
            listening: Mutex::new(None),
        }
    }

    fn m_search(&self, target: &str) -> String {
        format!(
            "M-SEARCH * HTTP/1.1\r\n\
             HOST: {}\r\n\
             MAN: \"ssdp:discover\"\r\n\
             MX: {}\r\n\
             ST: {}\r\n\
             USER-AGENT: dlna-sdk/{} UPnP/1.0\r\n\
             \r\n",
            SSDP_MULTICAST_ADDR,
            self.mx,
            target,
            env!("CARGO_PKG_VERSION")
        )
    }
}

impl Default for SsdpClient {
    fn default() -> Self {
        Self::new(2)
    }
}

/// Bind `addr` and join the SSDP multicast group on it
///
/// A failed join is logged; the socket still receives unicast datagrams.
async fn bind_notify_socket(addr: SocketAddr) -> std::io::Result<UdpSocket> {
    let socket = UdpSocket::bind(addr).await?;
    if let Err(e) = socket.join_multicast_v4(SSDP_MULTICAST_IP, Ipv4Addr::UNSPECIFIED) {
        warn!(error = %e, "Failed to join SSDP multicast group, NOTIFY messages will be missed");
    }
    Ok(socket)
}

async fn receive_loop(socket: Arc<UdpSocket>, events: mpsc::UnboundedSender<SsdpEvent>) {
    let mut buffer = [0u8; 2048];
    loop {
        match socket.recv_from(&mut buffer).await {
            Ok((size, remote)) => {
                let text = String::from_utf8_lossy(&buffer[..size]);
                match parse_ssdp_message(&text, remote) {
                    Some(event) => {
                        if events.send(event).is_err() {
                            debug!("SSDP event receiver dropped, ending receive loop");
                            break;
                        }
                    }
                    None => trace!(%remote, "Ignoring unrecognised SSDP datagram"),
                }
            }
            Err(e) => {
                warn!(error = %e, "SSDP socket receive failed");
                break;
            }
        }
    }
}

#[async_trait]
impl DiscoveryAdapter for SsdpClient {
    async fn start(&self, events: mpsc::UnboundedSender<SsdpEvent>) -> Result<()> {
        let mut listening = self.listening.lock().await;
        if listening.is_some() {
            return Ok(());
        }

        let socket = UdpSocket::bind("0.0.0.0:0")
            .await
            .map_err(|e| DiscoveryError::Network(format!("Failed to bind UDP socket: {}", e)))?;
        socket
            .set_multicast_loop_v4(true)
            .map_err(|e| DiscoveryError::Network(format!("Failed to set multicast loop: {}", e)))?;

        let notify_addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, SSDP_PORT));
        let notify_task = match bind_notify_socket(notify_addr).await {
            Ok(notify) => Some(tokio::spawn(receive_loop(Arc::new(notify), events.clone()))),
            Err(e) => {
                warn!(error = %e, "SSDP port unavailable, only search responses will be received");
                None
            }
        };

        let socket = Arc::new(socket);
        let task = tokio::spawn(receive_loop(socket.clone(), events));

        debug!(local = ?socket.local_addr().ok(), notify = notify_task.is_some(), "SSDP client listening");
        *listening = Some(Listening {
            socket,
            task,
            notify_task,
        });
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        if let Some(listening) = self.listening.lock().await.take() {
            listening.task.abort();
            if let Some(notify_task) = listening.notify_task {
                notify_task.abort();
            }
            debug!("SSDP client stopped");
        }
        Ok(())
    }

    async fn search(&self, target: &str) -> Result<()> {
        let listening = self.listening.lock().await;
        let listening = listening.as_ref().ok_or(DiscoveryError::NotStarted)?;

        let request = self.m_search(target);
        listening
            .socket
            .send_to(request.as_bytes(), SSDP_MULTICAST_ADDR)
            .await
            .map_err(|e| DiscoveryError::Network(format!("Failed to send M-SEARCH: {}", e)))?;

        debug!(target, mx = self.mx, "M-SEARCH sent");
        Ok(())
    }
}
