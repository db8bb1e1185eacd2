//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the external service traits
//! (search, download client, book catalog), allowing the request pipeline and
//! the API to be exercised without Prowlarr, qBittorrent or a metadata service.
//!
//! # Example
//!
//! ```rust,ignore
//! use bookhound_core::testing::{fixtures, MockDownloadClient, MockSearcher};
//!
//! let searcher = MockSearcher::new();
//! let download_client = MockDownloadClient::new();
//!
//! searcher.set_results(vec![fixtures::search_result("Dune", 40)]).await;
//!
//! // Use in AppState...
//! ```

mod mock_book_catalog;
mod mock_download_client;
mod mock_searcher;

pub use mock_book_catalog::MockBookCatalog;
pub use mock_download_client::MockDownloadClient;
pub use mock_searcher::{MockSearcher, RecordedSearch};

/// Test fixtures and helper functions.
pub mod fixtures {
    use chrono::Utc;
    use sha2::{Digest, Sha256};

    use crate::catalog::Book;
    use crate::download::DownloadReceipt;
    use crate::ranking::{RankedResult, ScoreBreakdown};
    use crate::searcher::SearchResult;

    /// Stable 40-character hex info hash derived from `seed`.
    pub fn info_hash(seed: &str) -> String {
        format!("{:x}", Sha256::digest(seed.as_bytes()))[..40].to_string()
    }

    /// Create a test search result with a magnet link and reasonable defaults.
    pub fn search_result(title: &str, seeders: u32) -> SearchResult {
        let hash = info_hash(title);
        SearchResult {
            title: title.to_string(),
            size_bytes: 300 * 1024 * 1024, // 300 MB
            seeders,
            leechers: 2,
            freeleech: false,
            flags: Vec::new(),
            download_link: format!(
                "magnet:?xt=urn:btih:{}&dn={}",
                hash,
                urlencoding::encode(title)
            ),
            info_hash: Some(hash),
            indexer: "mock-indexer".to_string(),
            publish_date: None,
            info_url: None,
        }
    }

    /// Create a ranked result whose whole score sits in the title component.
    pub fn ranked_result(title: &str, seeders: u32, score: f64) -> RankedResult {
        RankedResult {
            result: search_result(title, seeders),
            score,
            breakdown: ScoreBreakdown {
                title: score,
                ..Default::default()
            },
        }
    }

    pub fn receipt() -> DownloadReceipt {
        DownloadReceipt {
            client: "mock".to_string(),
            info_hash: Some(info_hash("receipt")),
            link: format!("magnet:?xt=urn:btih:{}", info_hash("receipt")),
            dispatched_at: Utc::now(),
        }
    }

    /// Create a test book with a single author.
    pub fn book(title: &str, author: &str) -> Book {
        Book {
            asin: format!("B0{:08}", title.len() * 7919 % 100_000_000),
            title: title.to_string(),
            subtitle: None,
            authors: vec![author.to_string()],
            narrators: vec!["Ray Porter".to_string()],
            runtime_minutes: Some(600),
            cover_image: None,
            release_date: Some("2021-05-04".to_string()),
        }
    }
}
