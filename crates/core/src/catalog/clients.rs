//! Audimeta and Audnexus API clients.
//!
//! Both serve Audible metadata by ASIN with slightly different field names.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::metrics::CATALOG_LOOKUPS;

use super::{AudibleRegion, Book, BookCatalog, CatalogError};

const CLIENT_AGENT: &str = concat!("bookhound/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct Person {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AudimetaBook {
    asin: String,
    title: String,
    subtitle: Option<String>,
    #[serde(default)]
    authors: Vec<Person>,
    #[serde(default)]
    narrators: Vec<Person>,
    image_url: Option<String>,
    release_date: Option<String>,
    length_minutes: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AudnexusBook {
    asin: String,
    title: String,
    subtitle: Option<String>,
    #[serde(default)]
    authors: Vec<Person>,
    #[serde(default)]
    narrators: Vec<Person>,
    image: Option<String>,
    release_date: Option<String>,
    runtime_length_min: Option<u32>,
}

fn names(people: Vec<Person>) -> Vec<String> {
    people.into_iter().map(|p| p.name).collect()
}

fn build_client(timeout_secs: u32) -> Result<Client, CatalogError> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(timeout_secs as u64))
        .build()?)
}

async fn fetch<T: for<'de> Deserialize<'de>>(
    client: &Client,
    url: &str,
    asin: &str,
    region: AudibleRegion,
) -> Result<T, CatalogError> {
    let response = client
        .get(url)
        .query(&[("region", region.as_str())])
        .header("Client-Agent", CLIENT_AGENT)
        .send()
        .await?;

    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(CatalogError::NotFound(asin.to_string()));
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(CatalogError::ApiError {
            status: status.as_u16(),
            message: body.chars().take(200).collect(),
        });
    }

    response
        .json()
        .await
        .map_err(|e| CatalogError::ParseError(e.to_string()))
}

/// Client for audimeta.de.
pub struct AudimetaClient {
    client: Client,
    base_url: String,
}

impl AudimetaClient {
    pub fn new(base_url: impl Into<String>, timeout_secs: u32) -> Result<Self, CatalogError> {
        Ok(Self {
            client: build_client(timeout_secs)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl BookCatalog for AudimetaClient {
    fn name(&self) -> &str {
        "audimeta"
    }

    async fn get_book(&self, asin: &str, region: AudibleRegion) -> Result<Book, CatalogError> {
        debug!(asin, %region, "Fetching book from Audimeta");
        let url = format!("{}/book/{}", self.base_url, urlencoding::encode(asin));
        let book: AudimetaBook = fetch(&self.client, &url, asin, region).await?;
        Ok(Book {
            asin: book.asin,
            title: book.title,
            subtitle: book.subtitle,
            authors: names(book.authors),
            narrators: names(book.narrators),
            runtime_minutes: book.length_minutes.filter(|m| *m > 0),
            cover_image: book.image_url,
            release_date: book.release_date,
        })
    }
}

/// Client for api.audnex.us.
pub struct AudnexusClient {
    client: Client,
    base_url: String,
}

impl AudnexusClient {
    pub fn new(base_url: impl Into<String>, timeout_secs: u32) -> Result<Self, CatalogError> {
        Ok(Self {
            client: build_client(timeout_secs)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl BookCatalog for AudnexusClient {
    fn name(&self) -> &str {
        "audnexus"
    }

    async fn get_book(&self, asin: &str, region: AudibleRegion) -> Result<Book, CatalogError> {
        debug!(asin, %region, "Fetching book from Audnexus");
        let url = format!("{}/books/{}", self.base_url, urlencoding::encode(asin));
        let book: AudnexusBook = fetch(&self.client, &url, asin, region).await?;
        Ok(Book {
            asin: book.asin,
            title: book.title,
            subtitle: book.subtitle,
            authors: names(book.authors),
            narrators: names(book.narrators),
            runtime_minutes: book.runtime_length_min.filter(|m| *m > 0),
            cover_image: book.image,
            release_date: book.release_date,
        })
    }
}

/// Asks each source in turn and returns the first book found.
pub struct FallbackCatalog {
    sources: Vec<Arc<dyn BookCatalog>>,
}

impl FallbackCatalog {
    pub fn new(sources: Vec<Arc<dyn BookCatalog>>) -> Self {
        Self { sources }
    }
}

#[async_trait]
impl BookCatalog for FallbackCatalog {
    fn name(&self) -> &str {
        "fallback"
    }

    async fn get_book(&self, asin: &str, region: AudibleRegion) -> Result<Book, CatalogError> {
        let mut last_error = None;
        for source in &self.sources {
            match source.get_book(asin, region).await {
                Ok(book) => {
                    CATALOG_LOOKUPS
                        .with_label_values(&[source.name(), "found"])
                        .inc();
                    return Ok(book);
                }
                Err(e) => {
                    let result = if matches!(e, CatalogError::NotFound(_)) {
                        "not_found"
                    } else {
                        warn!(source = source.name(), asin, error = %e, "Book lookup failed");
                        "error"
                    };
                    CATALOG_LOOKUPS
                        .with_label_values(&[source.name(), result])
                        .inc();
                    last_error = Some(e);
                }
            }
        }

        warn!(asin, %region, "Book not found in any catalog");
        Err(last_error.unwrap_or_else(|| CatalogError::NotFound(asin.to_string())))
    }
}
