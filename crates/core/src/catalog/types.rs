//! Types for book metadata lookups.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Audible marketplaces known to the metadata APIs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum AudibleRegion {
    #[default]
    Us,
    Ca,
    Uk,
    Au,
    Fr,
    De,
    Jp,
    It,
    In,
    Es,
    Br,
}

impl AudibleRegion {
    pub const ALL: [AudibleRegion; 11] = [
        AudibleRegion::Us,
        AudibleRegion::Ca,
        AudibleRegion::Uk,
        AudibleRegion::Au,
        AudibleRegion::Fr,
        AudibleRegion::De,
        AudibleRegion::Jp,
        AudibleRegion::It,
        AudibleRegion::In,
        AudibleRegion::Es,
        AudibleRegion::Br,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AudibleRegion::Us => "us",
            AudibleRegion::Ca => "ca",
            AudibleRegion::Uk => "uk",
            AudibleRegion::Au => "au",
            AudibleRegion::Fr => "fr",
            AudibleRegion::De => "de",
            AudibleRegion::Jp => "jp",
            AudibleRegion::It => "it",
            AudibleRegion::In => "in",
            AudibleRegion::Es => "es",
            AudibleRegion::Br => "br",
        }
    }

    /// Parse a region code. Unknown codes fall back to [`AudibleRegion::Us`].
    pub fn parse(code: &str) -> Self {
        let code = code.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == code)
            .unwrap_or_default()
    }
}

impl From<String> for AudibleRegion {
    fn from(code: String) -> Self {
        Self::parse(&code)
    }
}

impl fmt::Display for AudibleRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata of a requested audiobook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub asin: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub narrators: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    /// Release date as given by the source (ISO 8601).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
}

impl Book {
    /// Free-text query used to search indexers: title followed by the first author.
    pub fn search_query(&self) -> String {
        match self.authors.first() {
            Some(author) => format!("{} {}", self.title, author),
            None => self.title.clone(),
        }
    }
}

/// Errors from book metadata lookups.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Book not found: {0}")]
    NotFound(String),

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    ParseError(String),
}

/// Trait for book metadata sources.
#[async_trait]
pub trait BookCatalog: Send + Sync {
    /// Source name for logging.
    fn name(&self) -> &str;

    async fn get_book(&self, asin: &str, region: AudibleRegion) -> Result<Book, CatalogError>;
}
