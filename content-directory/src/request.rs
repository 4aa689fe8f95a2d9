//! Action payloads for the ContentDirectory service

use std::fmt::Write;

use quick_xml::escape::escape;

/// `BrowseFlag` argument of the `Browse` action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowseFlag {
    DirectChildren,
    Metadata,
}

impl BrowseFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            BrowseFlag::DirectChildren => "BrowseDirectChildren",
            BrowseFlag::Metadata => "BrowseMetadata",
        }
    }
}

/// Arguments of a `Browse` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowseRequest {
    pub object_id: String,
    pub flag: BrowseFlag,
    pub filter: String,
    /// 0 starts at the first child
    pub starting_index: u32,
    /// 0 lets the server pick its page size
    pub requested_count: u32,
    pub sort_criteria: String,
}

impl BrowseRequest {
    /// List the direct children of `container_id`
    pub fn children(container_id: impl Into<String>) -> Self {
        Self {
            object_id: container_id.into(),
            flag: BrowseFlag::DirectChildren,
            filter: "*".to_string(),
            starting_index: 0,
            requested_count: 0,
            sort_criteria: String::new(),
        }
    }

    /// Describe `object_id` itself
    pub fn metadata(object_id: impl Into<String>) -> Self {
        Self {
            flag: BrowseFlag::Metadata,
            ..Self::children(object_id)
        }
    }

    pub fn with_range(mut self, starting_index: u32, requested_count: u32) -> Self {
        self.starting_index = starting_index;
        self.requested_count = requested_count;
        self
    }

    pub fn to_payload(&self) -> String {
        let mut payload = String::new();
        push_arg(&mut payload, "ObjectID", &self.object_id);
        push_arg(&mut payload, "BrowseFlag", self.flag.as_str());
        push_arg(&mut payload, "Filter", &self.filter);
        push_arg(&mut payload, "StartingIndex", &self.starting_index.to_string());
        push_arg(&mut payload, "RequestedCount", &self.requested_count.to_string());
        push_arg(&mut payload, "SortCriteria", &self.sort_criteria);
        payload
    }
}

/// Arguments of a `Search` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub container_id: String,
    pub criteria: String,
    pub filter: String,
    pub starting_index: u32,
    pub requested_count: u32,
    pub sort_criteria: String,
}

impl SearchRequest {
    /// Free-text search for `term` under `container_id`
    pub fn new(container_id: impl Into<String>, term: &str) -> Self {
        Self::with_criteria(container_id, search_criteria(term))
    }

    /// Search with a raw UPnP criteria expression
    pub fn with_criteria(container_id: impl Into<String>, criteria: impl Into<String>) -> Self {
        Self {
            container_id: container_id.into(),
            criteria: criteria.into(),
            filter: "*".to_string(),
            starting_index: 0,
            requested_count: 0,
            sort_criteria: String::new(),
        }
    }

    pub fn with_range(mut self, starting_index: u32, requested_count: u32) -> Self {
        self.starting_index = starting_index;
        self.requested_count = requested_count;
        self
    }

    pub fn to_payload(&self) -> String {
        let mut payload = String::new();
        push_arg(&mut payload, "ContainerID", &self.container_id);
        push_arg(&mut payload, "SearchCriteria", &self.criteria);
        push_arg(&mut payload, "Filter", &self.filter);
        push_arg(&mut payload, "StartingIndex", &self.starting_index.to_string());
        push_arg(&mut payload, "RequestedCount", &self.requested_count.to_string());
        push_arg(&mut payload, "SortCriteria", &self.sort_criteria);
        payload
    }
}

/// Title, album or artist containing `term`
///
/// Backslashes and double quotes are escaped as UPnP string literals require.
pub fn search_criteria(term: &str) -> String {
    let literal = term.replace('\\', "\\\\").replace('"', "\\\"");
    format!(
        "dc:title contains \"{0}\" or upnp:album contains \"{0}\" or upnp:artist contains \"{0}\"",
        literal
    )
}

fn push_arg(payload: &mut String, name: &str, value: &str) {
    // Writing into a String cannot fail
    let _ = write!(payload, "<{0}>{1}</{0}>", name, escape(value));
}
