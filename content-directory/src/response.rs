//! Typed action responses

use dlna_transport::{child_ignore_case, child_text, Element};

use crate::didl::{parse_didl, CatalogItem};
use crate::error::{ContentDirectoryError, Result};

/// One page of a `Browse` result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowseResponse {
    pub items: Vec<CatalogItem>,
    /// `NumberReturned` as reported by the server
    pub number_returned: u32,
    /// `TotalMatches` as reported by the server
    pub total_matches: u32,
    pub update_id: Option<u32>,
}

/// `Search` responses carry the same fields as `Browse`
pub type SearchResponse = BrowseResponse;

impl BrowseResponse {
    /// Build from a `<BrowseResponse>` or `<SearchResponse>` element
    pub fn from_element(response: &Element) -> Result<Self> {
        let result = child_ignore_case(response, "Result").ok_or_else(|| {
            ContentDirectoryError::Protocol(format!("{} has no Result element", response.name))
        })?;

        let didl = result.get_text().unwrap_or_default();
        let items = parse_didl(&didl)?;

        let count = |name: &str| child_text(response, name).and_then(|text| text.parse::<u32>().ok());
        let returned = items.len() as u32;

        Ok(Self {
            number_returned: count("NumberReturned").unwrap_or(returned),
            total_matches: count("TotalMatches").unwrap_or(returned),
            update_id: count("UpdateID"),
            items,
        })
    }

    /// True when the server reports more matches past this page
    pub fn has_more(&self, starting_index: u32) -> bool {
        starting_index.saturating_add(self.number_returned) < self.total_matches
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(xml: &str) -> Element {
        Element::parse(xml.as_bytes()).unwrap()
    }

    #[test]
    fn test_from_element_with_counts() {
        let response = element(
            r#"<u:BrowseResponse xmlns:u="urn:schemas-upnp-org:service:ContentDirectory:1">
            <Result>&lt;DIDL-Lite xmlns="urn:schemas-upnp-org:metadata-1-0/DIDL-Lite/" xmlns:dc="http://purl.org/dc/elements/1.1/"&gt;&lt;container id="1"&gt;&lt;dc:title&gt;Music&lt;/dc:title&gt;&lt;/container&gt;&lt;/DIDL-Lite&gt;</Result>
            <NumberReturned>1</NumberReturned><TotalMatches>3</TotalMatches><UpdateID>17</UpdateID>
            </u:BrowseResponse>"#,
        );

        let page = BrowseResponse::from_element(&response).unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].title.as_deref(), Some("Music"));
        assert_eq!(page.number_returned, 1);
        assert_eq!(page.total_matches, 3);
        assert_eq!(page.update_id, Some(17));
        assert!(page.has_more(0));
        assert!(!page.has_more(2));
    }

    #[test]
    fn test_missing_result_is_protocol_error() {
        let response = element("<BrowseResponse><NumberReturned>0</NumberReturned></BrowseResponse>");
        assert!(matches!(
            BrowseResponse::from_element(&response),
            Err(ContentDirectoryError::Protocol(_))
        ));
    }

    #[test]
    fn test_empty_result_is_empty_page() {
        let response = element("<SearchResponse><Result></Result></SearchResponse>");
        let page = BrowseResponse::from_element(&response).unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total_matches, 0);
        assert!(page.update_id.is_none());
    }
}
