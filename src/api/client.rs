//! Grokipedia API endpoints
//!
//! Each remote operation is described by an [`ApiCall`]: the path, the query
//! sent on the wire, and the parameter bag its cache key is derived from.

use std::time::Duration;

use serde::de::DeserializeOwned;

use super::error::ApiError;
use super::executor::{RequestDescriptor, RequestExecutor};
use super::models::EDIT_STATUS_PREFIX;
use crate::cache::{canonicalize, Params};

pub const SEARCH_PATH: &str = "/api/full-text-search";
pub const PAGE_PATH: &str = "/api/page";
pub const TYPEAHEAD_PATH: &str = "/api/typeahead";
pub const CONSTANTS_PATH: &str = "/api/constants";
pub const EDITS_PATH: &str = "/api/list-edit-requests";
pub const EDITS_BY_SLUG_PATH: &str = "/api/list-edit-requests-by-slug";

/// One remote operation with its arguments
#[derive(Debug, Clone, PartialEq)]
pub struct ApiCall {
    pub path: &'static str,
    pub query: Vec<(String, String)>,
    pub cache_params: Params,
    /// Human-readable subject used in not-found messages
    pub resource: String,
}

impl ApiCall {
    pub fn search(query: &str, limit: u32, offset: u32) -> Self {
        Self {
            path: SEARCH_PATH,
            query: vec![
                ("q".into(), query.into()),
                ("limit".into(), limit.to_string()),
                ("offset".into(), offset.to_string()),
            ],
            cache_params: Params::new()
                .with("q", query)
                .with("limit", limit)
                .with("offset", offset),
            resource: format!("search results for '{}'", query),
        }
    }

    pub fn page(slug: &str, include_content: bool, validate_links: bool) -> Self {
        Self {
            path: PAGE_PATH,
            query: vec![
                ("slug".into(), slug.into()),
                ("includeContent".into(), include_content.to_string()),
                ("validateLinks".into(), validate_links.to_string()),
            ],
            cache_params: Params::new()
                .with("slug", slug)
                .with("includeContent", include_content)
                .with("validateLinks", validate_links),
            resource: format!("page '{}'", slug),
        }
    }

    pub fn typeahead(query: &str, limit: u32) -> Self {
        Self {
            path: TYPEAHEAD_PATH,
            query: vec![
                ("q".into(), query.into()),
                ("limit".into(), limit.to_string()),
            ],
            cache_params: Params::new().with("q", query).with("limit", limit),
            resource: format!("suggestions for '{}'", query),
        }
    }

    pub fn constants() -> Self {
        Self {
            path: CONSTANTS_PATH,
            query: Vec::new(),
            cache_params: Params::new(),
            resource: "constants".into(),
        }
    }

    /// Lists edit requests; statuses are short names such as `pending`
    pub fn edits(
        limit: u32,
        statuses: &[String],
        exclude_users: &[String],
        include_counts: bool,
    ) -> Self {
        let mut query = vec![
            ("limit".into(), limit.to_string()),
            ("includeCounts".into(), include_counts.to_string()),
        ];
        for status in statuses {
            query.push((
                "status[]".into(),
                format!("{}{}", EDIT_STATUS_PREFIX, status.to_uppercase()),
            ));
        }
        for user in exclude_users {
            query.push(("excludeUserId[]".into(), user.clone()));
        }

        let mut cache_params = Params::new()
            .with("limit", limit)
            .with("includeCounts", include_counts);
        if !statuses.is_empty() {
            cache_params.insert("status", statuses.join(","));
        }
        if !exclude_users.is_empty() {
            cache_params.insert("excludeUsers", exclude_users.join(","));
        }

        Self {
            path: EDITS_PATH,
            query,
            cache_params,
            resource: "edit requests".into(),
        }
    }

    pub fn edits_by_slug(slug: &str, limit: u32, offset: u32) -> Self {
        Self {
            path: EDITS_BY_SLUG_PATH,
            query: vec![
                ("slug".into(), slug.into()),
                ("limit".into(), limit.to_string()),
                ("offset".into(), offset.to_string()),
            ],
            cache_params: Params::new()
                .with("slug", slug)
                .with("limit", limit)
                .with("offset", offset),
            resource: format!("edit requests for '{}'", slug),
        }
    }

    pub fn cache_key(&self) -> String {
        canonicalize(self.path, &self.cache_params)
    }

    pub fn descriptor(&self, timeout: Duration) -> RequestDescriptor {
        RequestDescriptor::get(self.path, timeout).with_query(self.query.clone())
    }
}

/// Client for the Grokipedia API
#[derive(Debug, Clone)]
pub struct ApiClient {
    executor: RequestExecutor,
    timeout: Duration,
}

impl ApiClient {
    pub fn new(executor: RequestExecutor, timeout: Duration) -> Self {
        Self { executor, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs `call` and returns the raw body
    pub async fn fetch_raw(&self, call: &ApiCall) -> Result<Vec<u8>, ApiError> {
        self.executor
            .execute(&call.descriptor(self.timeout))
            .await
            .map_err(|err| match err {
                ApiError::NotFound { .. } => ApiError::not_found(&call.resource),
                other => other,
            })
    }

    /// Runs `call` and decodes the body
    pub async fn fetch<T: DeserializeOwned>(&self, call: &ApiCall) -> Result<T, ApiError> {
        let body = self.fetch_raw(call).await?;
        decode(call, &body)
    }
}

/// Decodes a response body, classifying failures as parse errors
pub fn decode<T: DeserializeOwned>(call: &ApiCall, body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::parse(call.path, e))
}
