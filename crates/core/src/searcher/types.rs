//! Types for the release search system.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Query parameters for a release search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Free-text search query.
    pub query: String,
    /// Optional: limit to specific indexers (by name).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexers: Option<Vec<String>>,
    /// Maximum results to return after aggregation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            indexers: None,
            limit: None,
        }
    }

    /// Key identifying equivalent queries.
    pub fn cache_key(&self) -> String {
        let mut key = self
            .query
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        if let Some(indexers) = &self.indexers {
            let mut names = indexers.clone();
            names.sort();
            key.push('|');
            key.push_str(&names.join(","));
        }
        key
    }
}

/// A normalized release returned by one indexer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub size_bytes: u64,
    pub seeders: u32,
    pub leechers: u32,
    pub freeleech: bool,
    /// Lowercase indexer flags (e.g. "freeleech", "internal").
    #[serde(default)]
    pub flags: Vec<String>,
    /// Magnet link, or the .torrent URL when no magnet is available.
    pub download_link: String,
    /// Info hash (lowercase hex) if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info_hash: Option<String>,
    /// Name of the indexer that returned this result.
    pub indexer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_date: Option<DateTime<Utc>>,
    /// Details page on the indexer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info_url: Option<String>,
}

impl SearchResult {
    pub fn is_magnet(&self) -> bool {
        self.download_link.starts_with("magnet:")
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.iter().any(|f| f.eq_ignore_ascii_case(flag))
    }
}

/// Aggregated search results with metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchOutcome {
    /// The search query that was executed.
    pub query: SearchQuery,
    /// Results from every indexer that answered.
    pub results: Vec<SearchResult>,
    /// How long the search took in milliseconds.
    pub duration_ms: u64,
    /// Any indexers that failed (name -> error message).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub indexer_errors: HashMap<String, String>,
    /// Whether these results came from the search cache.
    #[serde(default)]
    pub from_cache: bool,
}

impl SearchOutcome {
    pub fn empty(query: SearchQuery) -> Self {
        Self {
            query,
            results: Vec::new(),
            duration_ms: 0,
            indexer_errors: HashMap::new(),
            from_cache: false,
        }
    }
}

/// Errors from a single indexer call. Never returned from [`Searcher::search`];
/// they are recorded in [`SearchOutcome::indexer_errors`].
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Search backend connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Search backend API error: {0}")]
    Upstream(String),

    #[error("Indexer misconfigured: {0}")]
    Misconfigured(String),

    #[error("Request timeout")]
    Timeout,
}

/// Trait for release search backends.
#[async_trait]
pub trait Searcher: Send + Sync {
    /// Provider name for logging.
    fn name(&self) -> &str;

    /// Search all enabled indexers.
    ///
    /// Failing indexers are logged and listed in `indexer_errors`; the
    /// results of the others are still returned.
    async fn search(&self, query: &SearchQuery) -> SearchOutcome;
}
