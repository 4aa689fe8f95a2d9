//! Device description parsing and the resolved [`Device`] record.
//!
//! A description document is fetched from the `LOCATION` of a discovery reply
//! and deserialized with `quick-xml` into [`DeviceDescription`], which is
//! validated at that boundary before becoming a [`Device`].

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};
use tracing::warn;
use url::Url;

use crate::error::{DiscoveryError, Result};

/// UPnP device description root element.
#[derive(Debug, Deserialize)]
pub struct Root {
    pub device: DeviceDescription,
}

/// Device description document as served by the device.
///
/// Every field is optional here so that a document missing `deviceType` is
/// reported by [`DeviceDescription::validate`] rather than as a parse error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDescription {
    #[serde(default)]
    pub device_type: Option<String>,
    #[serde(default)]
    pub friendly_name: Option<String>,
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(default)]
    pub model_name: Option<String>,
    #[serde(default)]
    pub model_number: Option<String>,
    #[serde(default, rename = "UDN")]
    pub udn: Option<String>,
    #[serde(default)]
    pub service_list: Option<ServiceList>,
}

/// `<serviceList>` wrapper
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceList {
    #[serde(default, rename = "service")]
    pub services: Vec<ServiceDescription>,
}

/// One `<service>` entry of a description document
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceDescription {
    #[serde(rename = "serviceType")]
    pub service_type: String,
    #[serde(rename = "controlURL")]
    pub control_url: String,
    #[serde(default, rename = "eventSubURL")]
    pub event_sub_url: Option<String>,
    #[serde(default, rename = "SCPDURL")]
    pub scpd_url: Option<String>,
}

impl DeviceDescription {
    /// Parse a device description from XML.
    ///
    /// # Errors
    ///
    /// Returns `DiscoveryError::Parse` if the XML is malformed.
    pub fn from_xml(xml: &str) -> Result<Self> {
        let root: Root = quick_xml::de::from_str(xml)
            .map_err(|e| DiscoveryError::Parse(format!("Failed to parse device XML: {}", e)))?;

        Ok(root.device)
    }

    /// Check the fields a [`Device`] cannot do without
    pub fn validate(&self) -> Result<()> {
        match self.device_type.as_deref().map(str::trim) {
            Some(device_type) if !device_type.is_empty() => Ok(()),
            _ => Err(DiscoveryError::Protocol(
                "Device description is missing deviceType".to_string(),
            )),
        }
    }

    /// Validate and convert into a [`Device`] keyed by `usn`.
    pub fn into_device(
        self,
        usn: &str,
        location: &str,
        remote_address: Option<SocketAddr>,
    ) -> Result<Device> {
        self.validate()?;

        let name = non_empty(self.friendly_name.as_deref())
            .or_else(|| non_empty(self.model_name.as_deref()))
            .unwrap_or(usn)
            .to_string();

        let services = self
            .service_list
            .map(|list| {
                list.services
                    .into_iter()
                    .map(|service| Service {
                        service_type: service.service_type.trim().to_string(),
                        control_url: service.control_url.trim().to_string(),
                        event_sub_url: service.event_sub_url,
                        scpd_url: service.scpd_url,
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(Device {
            id: usn.to_string(),
            location: location.to_string(),
            name,
            device_type: self.device_type.unwrap_or_default().trim().to_string(),
            manufacturer: self.manufacturer,
            model_name: self.model_name,
            udn: self.udn,
            services,
            remote_address,
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// A service advertised by a device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    /// Service URN, e.g. `urn:schemas-upnp-org:service:ContentDirectory:1`
    pub service_type: String,
    /// Control URL as advertised, usually relative to the description
    pub control_url: String,
    pub event_sub_url: Option<String>,
    pub scpd_url: Option<String>,
}

/// A resolved media server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    /// Unique service name from discovery; the registry key
    pub id: String,
    /// URL of the description document
    pub location: String,
    /// Friendly name, falling back to the model name
    pub name: String,
    pub device_type: String,
    pub manufacturer: Option<String>,
    pub model_name: Option<String>,
    pub udn: Option<String>,
    pub services: Vec<Service>,
    /// Address the discovery reply came from
    pub remote_address: Option<SocketAddr>,
}

impl Device {
    /// Serialize this device to a JSON snapshot
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| DiscoveryError::Parse(format!("Failed to serialize device: {}", e)))
    }

    /// Rehydrate from a snapshot produced by [`Device::to_json`].
    ///
    /// The snapshot must describe the same device (same `id`).
    pub fn update_from_json(&mut self, json: &str) -> Result<()> {
        let snapshot: Device = serde_json::from_str(json)
            .map_err(|e| DiscoveryError::Parse(format!("Invalid device snapshot: {}", e)))?;

        if snapshot.id != self.id {
            return Err(DiscoveryError::Protocol(format!(
                "Snapshot for {} cannot update {}",
                snapshot.id, self.id
            )));
        }

        *self = snapshot;
        Ok(())
    }

    /// First advertised ContentDirectory service (versions 0 to 4)
    pub fn content_directory_service(&self) -> Option<&Service> {
        self.services
            .iter()
            .find(|service| is_content_directory(&service.service_type))
    }

    /// Absolute ContentDirectory control URL, resolved against `location`
    pub fn content_directory_control_url(&self) -> Option<String> {
        let service = self.content_directory_service()?;

        let base = match Url::parse(&self.location) {
            Ok(base) => base,
            Err(e) => {
                warn!(device = %self.id, location = %self.location, error = %e, "Invalid device location");
                return None;
            }
        };

        match base.join(&service.control_url) {
            Ok(url) => Some(url.to_string()),
            Err(e) => {
                warn!(device = %self.id, control_url = %service.control_url, error = %e, "Invalid control URL");
                None
            }
        }
    }
}

/// `ContentDirectory:<0-4>` at the end of a service type
pub fn is_content_directory(service_type: &str) -> bool {
    has_versioned_suffix(service_type, "ContentDirectory:", '0'..='4')
}

/// `MediaServer:<0-5>` at the end of a USN
pub fn is_media_server(usn: &str) -> bool {
    has_versioned_suffix(usn, "MediaServer:", '0'..='5')
}

fn has_versioned_suffix(value: &str, name: &str, versions: std::ops::RangeInclusive<char>) -> bool {
    let mut chars = value.chars();
    match chars.next_back() {
        Some(version) if versions.contains(&version) => chars.as_str().ends_with(name),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const MINIDLNA: &str = r#"<?xml version="1.0"?>
<root xmlns="urn:schemas-upnp-org:device-1-0">
  <specVersion><major>1</major><minor>0</minor></specVersion>
  <device>
    <deviceType>urn:schemas-upnp-org:device:MediaServer:1</deviceType>
    <friendlyName>nas: minidlna</friendlyName>
    <manufacturer>Justin Maggard</manufacturer>
    <modelName>Windows Media Connect compatible (MiniDLNA)</modelName>
    <modelNumber>1.3.0</modelNumber>
    <UDN>uuid:4d696e69-444c-164e-9d41-b827eb0d1a5f</UDN>
    <serviceList>
      <service>
        <serviceType>urn:schemas-upnp-org:service:ContentDirectory:1</serviceType>
        <serviceId>urn:upnp-org:serviceId:ContentDirectory</serviceId>
        <controlURL>/ctl/ContentDir</controlURL>
        <eventSubURL>/evt/ContentDir</eventSubURL>
        <SCPDURL>/ContentDir.xml</SCPDURL>
      </service>
      <service>
        <serviceType>urn:schemas-upnp-org:service:ConnectionManager:1</serviceType>
        <serviceId>urn:upnp-org:serviceId:ConnectionManager</serviceId>
        <controlURL>/ctl/ConnectionMgr</controlURL>
        <eventSubURL>/evt/ConnectionMgr</eventSubURL>
        <SCPDURL>/ConnectionMgr.xml</SCPDURL>
      </service>
    </serviceList>
  </device>
</root>"#;

    const USN: &str = "uuid:4d696e69-444c-164e-9d41-b827eb0d1a5f::urn:schemas-upnp-org:device:MediaServer:1";
    const LOCATION: &str = "http://192.168.1.20:8200/rootDesc.xml";

    fn minidlna_device() -> Device {
        DeviceDescription::from_xml(MINIDLNA)
            .unwrap()
            .into_device(USN, LOCATION, Some("192.168.1.20:1900".parse().unwrap()))
            .unwrap()
    }

    #[test]
    fn test_device_from_xml() {
        let description = DeviceDescription::from_xml(MINIDLNA).unwrap();
        assert_eq!(
            description.device_type.as_deref(),
            Some("urn:schemas-upnp-org:device:MediaServer:1")
        );
        assert_eq!(description.friendly_name.as_deref(), Some("nas: minidlna"));
        assert_eq!(description.udn.as_deref(), Some("uuid:4d696e69-444c-164e-9d41-b827eb0d1a5f"));
        assert_eq!(description.service_list.unwrap().services.len(), 2);
    }

    #[test]
    fn test_into_device() {
        let device = minidlna_device();
        assert_eq!(device.id, USN);
        assert_eq!(device.location, LOCATION);
        assert_eq!(device.name, "nas: minidlna");
        assert_eq!(device.services.len(), 2);
        assert_eq!(device.services[0].control_url, "/ctl/ContentDir");
        assert_eq!(device.services[1].scpd_url.as_deref(), Some("/ConnectionMgr.xml"));
    }

    #[test]
    fn test_name_falls_back_to_model_name() {
        let xml = r#"<root><device>
            <deviceType>urn:schemas-upnp-org:device:MediaServer:1</deviceType>
            <modelName>Serviio</modelName>
        </device></root>"#;
        let device = DeviceDescription::from_xml(xml)
            .unwrap()
            .into_device("uuid:x::urn:schemas-upnp-org:device:MediaServer:1", LOCATION, None)
            .unwrap();
        assert_eq!(device.name, "Serviio");
        assert!(device.services.is_empty());
        assert!(device.content_directory_control_url().is_none());
    }

    #[test]
    fn test_missing_device_type_is_protocol_error() {
        let xml = r#"<root><device><friendlyName>Broken</friendlyName></device></root>"#;
        let description = DeviceDescription::from_xml(xml).unwrap();
        assert!(matches!(description.validate(), Err(DiscoveryError::Protocol(_))));
        assert!(description.into_device(USN, LOCATION, None).is_err());
    }

    #[test]
    fn test_malformed_xml_is_parse_error() {
        assert!(matches!(
            DeviceDescription::from_xml("<root><device>"),
            Err(DiscoveryError::Parse(_))
        ));
    }

    #[test]
    fn test_content_directory_control_url() {
        let device = minidlna_device();
        assert_eq!(
            device.content_directory_control_url().as_deref(),
            Some("http://192.168.1.20:8200/ctl/ContentDir")
        );
    }

    #[test]
    fn test_relative_control_url_without_leading_slash() {
        let mut device = minidlna_device();
        device.location = "http://10.0.0.5:9000/dev/desc.xml".to_string();
        device.services[0].control_url = "cds/control".to_string();
        assert_eq!(
            device.content_directory_control_url().as_deref(),
            Some("http://10.0.0.5:9000/dev/cds/control")
        );
    }

    #[rstest]
    #[case("urn:schemas-upnp-org:service:ContentDirectory:1", true)]
    #[case("urn:schemas-upnp-org:service:ContentDirectory:4", true)]
    #[case("urn:schemas-upnp-org:service:ContentDirectory:5", false)]
    #[case("urn:schemas-upnp-org:service:ConnectionManager:1", false)]
    #[case("ContentDirectory:", false)]
    fn test_is_content_directory(#[case] service_type: &str, #[case] expected: bool) {
        assert_eq!(is_content_directory(service_type), expected);
    }

    #[rstest]
    #[case("uuid:a::urn:schemas-upnp-org:device:MediaServer:1", true)]
    #[case("uuid:a::urn:schemas-upnp-org:device:MediaServer:5", true)]
    #[case("uuid:a::urn:schemas-upnp-org:device:MediaServer:6", false)]
    #[case("uuid:a::urn:schemas-upnp-org:device:MediaRenderer:1", false)]
    #[case("uuid:a::upnp:rootdevice", false)]
    #[case("", false)]
    fn test_is_media_server(#[case] usn: &str, #[case] expected: bool) {
        assert_eq!(is_media_server(usn), expected);
    }

    #[test]
    fn test_json_snapshot_rehydration() {
        let original = minidlna_device();
        let json = original.to_json().unwrap();

        let mut stale = original.clone();
        stale.name = "stale".to_string();
        stale.services.clear();
        stale.update_from_json(&json).unwrap();
        assert_eq!(stale, original);

        let mut other = original.clone();
        other.id = "uuid:other".to_string();
        assert!(matches!(other.update_from_json(&json), Err(DiscoveryError::Protocol(_))));
        assert!(matches!(stale.update_from_json("{"), Err(DiscoveryError::Parse(_))));
    }
}
