//! DIDL-Lite normalization
//!
//! A `Result` payload is parsed into an element tree, containers and items are
//! gathered (containers first), duplicates by class and title are dropped and
//! every survivor is flattened into a [`CatalogItem`].

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::trace;
use xmltree::{Element, XMLNode};

use crate::error::{ContentDirectoryError, Result};

/// Whether a catalog entry can be browsed into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ItemKind {
    Container,
    Item,
}

/// One `res` node of a DIDL-Lite object
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    /// Text content of the `res` node
    pub url: String,
    pub size: Option<u64>,
    pub protocol_info: Option<String>,
    pub duration: Option<String>,
    pub bitrate: Option<String>,
    pub resolution: Option<String>,
    /// Every other attribute of the node
    pub attributes: BTreeMap<String, String>,
}

impl Resource {
    /// MIME type from the third field of `protocolInfo`
    pub fn mime_type(&self) -> Option<&str> {
        self.protocol_info
            .as_deref()?
            .split(':')
            .nth(2)
            .filter(|mime| !mime.is_empty() && *mime != "*")
    }
}

/// A normalized DIDL-Lite container or item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    pub id: String,
    pub parent_id: Option<String>,
    /// `upnp:class`, e.g. `object.item.imageItem.photo`
    pub class: Option<String>,
    /// `dc:title`
    pub title: Option<String>,
    pub restricted: bool,
    pub searchable: Option<bool>,
    pub child_count: Option<u32>,
    pub storage_used: Option<i64>,
    pub resources: Vec<Resource>,
    pub kind: ItemKind,
    /// Remaining fields by local name (`artist`, `album`, `albumArtURI`, ...)
    pub properties: BTreeMap<String, String>,
}

impl CatalogItem {
    pub fn is_container(&self) -> bool {
        self.kind == ItemKind::Container
    }

    /// Value of a flattened property, by local name
    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }

    /// URL of the first resource, if any
    pub fn url(&self) -> Option<&str> {
        self.resources
            .first()
            .map(|resource| resource.url.as_str())
            .filter(|url| !url.is_empty())
    }
}

/// Parse a DIDL-Lite document into deduplicated catalog items
///
/// An empty or whitespace-only document yields no items.
pub fn parse_didl(xml: &str) -> Result<Vec<CatalogItem>> {
    if xml.trim().is_empty() {
        return Ok(Vec::new());
    }

    let root = Element::parse(xml.as_bytes())
        .map_err(|e| ContentDirectoryError::Protocol(format!("Malformed DIDL-Lite: {}", e)))?;

    let containers = root.children.iter().filter_map(|node| element_named(node, "container"));
    let items = root.children.iter().filter_map(|node| element_named(node, "item"));

    let mut seen = HashSet::new();
    let mut normalized = Vec::new();

    for (element, kind) in containers
        .map(|e| (e, ItemKind::Container))
        .chain(items.map(|e| (e, ItemKind::Item)))
    {
        let item = normalize(element, kind);
        if seen.insert((item.class.clone(), item.title.clone())) {
            normalized.push(item);
        } else {
            trace!(id = %item.id, title = ?item.title, "Dropping duplicate DIDL-Lite entry");
        }
    }

    Ok(normalized)
}

fn element_named<'a>(node: &'a XMLNode, name: &str) -> Option<&'a Element> {
    node.as_element().filter(|element| element.name == name)
}

fn local_name(name: &str) -> &str {
    name.rsplit(':').next().unwrap_or(name)
}

fn text_of(element: &Element) -> Option<String> {
    element
        .get_text()
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim() {
        "1" | "true" | "TRUE" | "True" => Some(true),
        "0" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

fn normalize(element: &Element, kind: ItemKind) -> CatalogItem {
    let mut item = CatalogItem {
        id: String::new(),
        parent_id: None,
        class: None,
        title: None,
        restricted: false,
        searchable: None,
        child_count: None,
        storage_used: None,
        resources: Vec::new(),
        kind,
        properties: BTreeMap::new(),
    };

    for (name, value) in &element.attributes {
        match local_name(name) {
            "id" => item.id = value.clone(),
            "parentID" => item.parent_id = Some(value.clone()),
            "restricted" => item.restricted = parse_flag(value).unwrap_or(false),
            "searchable" => item.searchable = parse_flag(value),
            "childCount" => item.child_count = value.trim().parse().ok(),
            other => {
                item.properties.insert(other.to_string(), value.clone());
            }
        }
    }

    for child in element.children.iter().filter_map(XMLNode::as_element) {
        match child.name.as_str() {
            "res" => item.resources.push(resource(child)),
            "title" if item.title.is_none() => item.title = text_of(child),
            "class" if item.class.is_none() => item.class = text_of(child),
            "storageUsed" => item.storage_used = text_of(child).and_then(|t| t.parse().ok()),
            name => {
                // Mixed text and attributes collapse to the text; repeats keep the first value
                if let Some(text) = text_of(child) {
                    item.properties.entry(name.to_string()).or_insert(text);
                }
            }
        }
    }

    item
}

fn resource(element: &Element) -> Resource {
    let mut resource = Resource {
        url: text_of(element).unwrap_or_default(),
        ..Default::default()
    };

    for (name, value) in &element.attributes {
        match local_name(name) {
            "size" => resource.size = value.trim().parse().ok(),
            "protocolInfo" => resource.protocol_info = Some(value.clone()),
            "duration" => resource.duration = Some(value.clone()),
            "bitrate" => resource.bitrate = Some(value.clone()),
            "resolution" => resource.resolution = Some(value.clone()),
            other => {
                resource.attributes.insert(other.to_string(), value.clone());
            }
        }
    }

    resource
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIDL_HEADER: &str = r#"<DIDL-Lite xmlns="urn:schemas-upnp-org:metadata-1-0/DIDL-Lite/" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:upnp="urn:schemas-upnp-org:metadata-1-0/upnp/" xmlns:dlna="urn:schemas-dlna-org:metadata-1-0/">"#;

    fn didl(body: &str) -> String {
        format!("{}{}</DIDL-Lite>", DIDL_HEADER, body)
    }

    #[test]
    fn test_containers_before_items_and_dedup() {
        let xml = didl(
            r#"<item id="i1" parentID="0" restricted="1"><dc:title>Song</dc:title><upnp:class>object.item.audioItem.musicTrack</upnp:class></item>
            <container id="c1" parentID="0" restricted="1"><dc:title>Music</dc:title><upnp:class>object.container.storageFolder</upnp:class></container>
            <container id="c2" parentID="0" restricted="1"><dc:title>Music</dc:title><upnp:class>object.container.storageFolder</upnp:class></container>"#,
        );

        let items = parse_didl(&xml).unwrap();
        let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "i1"]);
        assert!(items[0].is_container());
        assert_eq!(items[1].kind, ItemKind::Item);
    }

    #[test]
    fn test_same_title_different_class_is_kept() {
        let xml = didl(
            r#"<container id="a"><dc:title>Jazz</dc:title><upnp:class>object.container.genre.musicGenre</upnp:class></container>
            <container id="b"><dc:title>Jazz</dc:title><upnp:class>object.container.storageFolder</upnp:class></container>"#,
        );
        assert_eq!(parse_didl(&xml).unwrap().len(), 2);
    }

    #[test]
    fn test_attribute_flattening() {
        let xml = didl(
            r#"<container id="64" parentID="0" restricted="1" searchable="1" childCount="12"><dc:title>Browse Folders</dc:title><upnp:class>object.container.storageFolder</upnp:class><upnp:storageUsed>-1</upnp:storageUsed></container>"#,
        );
        let item = &parse_didl(&xml).unwrap()[0];
        assert_eq!(item.id, "64");
        assert_eq!(item.parent_id.as_deref(), Some("0"));
        assert!(item.restricted);
        assert_eq!(item.searchable, Some(true));
        assert_eq!(item.child_count, Some(12));
        assert_eq!(item.storage_used, Some(-1));
        assert_eq!(item.title.as_deref(), Some("Browse Folders"));
        assert_eq!(item.class.as_deref(), Some("object.container.storageFolder"));
    }

    #[test]
    fn test_res_text_promoted_to_url() {
        let xml = didl(
            r#"<item id="64$0$1" parentID="64$0" restricted="1"><dc:title>Beach</dc:title><upnp:class>object.item.imageItem.photo</upnp:class>
            <res size="204800" resolution="1920x1080" protocolInfo="http-get:*:image/jpeg:DLNA.ORG_PN=JPEG_LRG" dlna:ifoFileURI="x">http://192.168.1.20:8200/MediaItems/31.jpg</res>
            <res protocolInfo="http-get:*:image/jpeg:DLNA.ORG_PN=JPEG_TN">http://192.168.1.20:8200/Thumbnails/31.jpg</res></item>"#,
        );
        let item = &parse_didl(&xml).unwrap()[0];
        assert_eq!(item.resources.len(), 2);

        let full = &item.resources[0];
        assert_eq!(full.url, "http://192.168.1.20:8200/MediaItems/31.jpg");
        assert_eq!(full.size, Some(204800));
        assert_eq!(full.resolution.as_deref(), Some("1920x1080"));
        assert_eq!(full.mime_type(), Some("image/jpeg"));
        assert_eq!(full.attributes.get("ifoFileURI").map(String::as_str), Some("x"));

        assert_eq!(item.url(), Some("http://192.168.1.20:8200/MediaItems/31.jpg"));
    }

    #[test]
    fn test_mixed_field_collapses_to_text() {
        let xml = didl(
            r#"<item id="1"><dc:title>Track</dc:title><upnp:class>object.item.audioItem.musicTrack</upnp:class>
            <upnp:albumArtURI dlna:profileID="JPEG_TN">http://192.168.1.20:8200/AlbumArt/7.jpg</upnp:albumArtURI>
            <upnp:artist>First</upnp:artist><upnp:artist>Second</upnp:artist><dc:date>2004-01-01</dc:date></item>"#,
        );
        let item = &parse_didl(&xml).unwrap()[0];
        assert_eq!(item.property("albumArtURI"), Some("http://192.168.1.20:8200/AlbumArt/7.jpg"));
        assert_eq!(item.property("artist"), Some("First"));
        assert_eq!(item.property("date"), Some("2004-01-01"));
        assert!(!item.restricted);
        assert!(item.resources.is_empty());
        assert!(item.url().is_none());
    }

    #[test]
    fn test_empty_and_malformed_documents() {
        assert!(parse_didl("").unwrap().is_empty());
        assert!(parse_didl(&didl("")).unwrap().is_empty());
        assert!(matches!(
            parse_didl("<DIDL-Lite><item>"),
            Err(ContentDirectoryError::Protocol(_))
        ));
    }

    #[test]
    fn test_serializes_camel_case() {
        let xml = didl(r#"<item id="1" parentID="0"><dc:title>T</dc:title></item>"#);
        let item = &parse_didl(&xml).unwrap()[0];
        let json = serde_json::to_value(item).unwrap();
        assert_eq!(json["parentId"], "0");
        assert_eq!(json["kind"], "item");
    }
}
