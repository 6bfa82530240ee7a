//! Response types for the Grokipedia API
//!
//! Field names follow the API's camelCase JSON. Every field defaults when
//! absent so that partial responses still decode.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Response from `/api/full-text-search`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
    pub total_count: u64,
    pub facets: Vec<serde_json::Value>,
    pub search_time_ms: f64,
    pub detected_language: String,
}

/// A single search hit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchResult {
    pub title: String,
    pub slug: String,
    pub snippet: String,
    pub relevance_score: f64,
    pub view_count: u64,
}

/// Response from `/api/page`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageResponse {
    pub page: PageData,
    pub found: bool,
}

/// Page content and metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageData {
    pub title: String,
    pub slug: String,
    pub content: String,
    pub description: String,
    pub citations: Vec<Citation>,
    pub images: Vec<Image>,
    pub metadata: PageMetadata,
    pub stats: PageStats,
    pub linked_pages: LinkedPages,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Citation {
    pub id: String,
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Image {
    pub caption: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageMetadata {
    pub categories: Vec<String>,
    pub last_modified: i64,
    pub version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageStats {
    pub total_views: u64,
    pub quality_score: f64,
}

/// Slugs of pages linked from a page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LinkedPages {
    pub indexed_slugs: Vec<String>,
    pub unindexed_slugs: Vec<String>,
}

/// Response from `/api/typeahead`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypeaheadResponse {
    pub suggestions: Vec<String>,
}

/// Response from `/api/constants`; the shape is open-ended
pub type ConstantsResponse = BTreeMap<String, serde_json::Value>;

/// Response from `/api/list-edit-requests` and `/api/list-edit-requests-by-slug`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditsResponse {
    pub edit_requests: Vec<EditRequest>,
    pub total_count: u64,
    pub has_more: bool,
    pub total_count_unfiltered: u64,
}

/// A single edit request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditRequest {
    pub id: String,
    pub slug: String,
    /// Wire form, e.g. `EDIT_REQUEST_STATUS_PENDING`
    pub status: String,
    /// Seconds since epoch
    pub timestamp: i64,
    pub editor: String,
}

impl EditRequest {
    /// Status without the `EDIT_REQUEST_STATUS_` prefix
    pub fn short_status(&self) -> &str {
        self.status
            .strip_prefix(EDIT_STATUS_PREFIX)
            .unwrap_or(&self.status)
    }
}

/// Prefix the API puts on edit request statuses
pub const EDIT_STATUS_PREFIX: &str = "EDIT_REQUEST_STATUS_";
