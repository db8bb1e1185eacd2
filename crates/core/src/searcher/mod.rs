//! Release search across the configured indexers.
//!
//! This module provides a `Searcher` trait and a Prowlarr backend that fans a
//! query out to every enabled indexer and normalizes what comes back.

mod cache;
mod normalize;
mod prowlarr;
mod types;

pub use cache::SearchCache;
pub use prowlarr::ProwlarrSearcher;
pub use types::*;
