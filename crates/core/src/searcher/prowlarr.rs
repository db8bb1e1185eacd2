//! Prowlarr search backend implementation.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::ProwlarrConfig;
use crate::indexer::{IndexerConfig, IndexerRegistry};
use crate::metrics::{INDEXER_FAILURES, SEARCHES_TOTAL, SEARCH_DURATION};

use super::cache::SearchCache;
use super::normalize::{normalize_release, passes_indexer_filters};
use super::{SearchError, SearchOutcome, SearchQuery, SearchResult, Searcher};

/// Searches every enabled indexer through one Prowlarr instance.
pub struct ProwlarrSearcher {
    client: Client,
    config: ProwlarrConfig,
    registry: Arc<IndexerRegistry>,
    cache: SearchCache,
}

impl ProwlarrSearcher {
    pub fn new(config: ProwlarrConfig, registry: Arc<IndexerRegistry>) -> Result<Self, SearchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .map_err(|e| SearchError::Misconfigured(format!("failed to build HTTP client: {}", e)))?;

        let cache = SearchCache::new(Duration::from_secs(config.cache_ttl_secs));

        Ok(Self {
            client,
            config,
            registry,
            cache,
        })
    }

    fn build_search_url(&self, query: &SearchQuery, indexer_id: i64, category: i64) -> String {
        format!(
            "{}/api/v1/search?query={}&type=search&indexerIds={}&categories={}&limit={}",
            self.config.url.trim_end_matches('/'),
            urlencoding::encode(&query.query),
            indexer_id,
            category,
            self.config.limit
        )
    }

    /// Search a single indexer.
    async fn search_indexer(
        &self,
        query: &SearchQuery,
        indexer: &IndexerConfig,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let indexer_id = indexer.prowlarr_id().ok_or_else(|| {
            SearchError::Misconfigured(format!("{} has no prowlarr_indexer_id", indexer.name()))
        })?;

        let url = self.build_search_url(query, indexer_id, indexer.category());
        debug!(indexer = indexer.name(), indexer_id, "Searching Prowlarr");

        let response = self
            .client
            .get(&url)
            .header("X-Api-Key", &self.config.api_key)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SearchError::Timeout
                } else if e.is_connect() {
                    SearchError::ConnectionFailed(e.to_string())
                } else {
                    SearchError::Upstream(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::Upstream(format!(
                "HTTP {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        let releases: Vec<Value> = response
            .json()
            .await
            .map_err(|e| SearchError::Upstream(format!("Failed to parse response: {}", e)))?;

        let total = releases.len();
        let results: Vec<SearchResult> = releases
            .into_iter()
            .filter_map(|raw| normalize_release(raw, indexer))
            .filter(|result| passes_indexer_filters(result, indexer))
            .collect();

        debug!(
            indexer = indexer.name(),
            received = total,
            kept = results.len(),
            "Prowlarr search complete"
        );

        Ok(results)
    }
}

#[async_trait]
impl Searcher for ProwlarrSearcher {
    fn name(&self) -> &str {
        "prowlarr"
    }

    async fn search(&self, query: &SearchQuery) -> SearchOutcome {
        let start = Instant::now();
        let generation = self.registry.generation();

        if let Some(mut cached) = self.cache.get(query, generation).await {
            debug!(query = %query.query, "Search served from cache");
            SEARCHES_TOTAL.with_label_values(&["cache"]).inc();
            cached.from_cache = true;
            return apply_limit(cached, query);
        }

        let indexers: Vec<IndexerConfig> = self
            .registry
            .enabled_indexers()
            .await
            .into_iter()
            .filter(|i| match &query.indexers {
                Some(requested) => requested.iter().any(|name| name == i.name()),
                None => true,
            })
            .collect();

        if indexers.is_empty() {
            warn!(query = %query.query, "No enabled indexers to search");
            return SearchOutcome::empty(query.clone());
        }

        debug!(
            indexers = ?indexers.iter().map(|i| i.name()).collect::<Vec<_>>(),
            query = %query.query,
            "Starting parallel search"
        );

        let search_futures: Vec<_> = indexers
            .iter()
            .map(|indexer| async move {
                let result = self.search_indexer(query, indexer).await;
                (indexer.name(), result)
            })
            .collect();

        let responses = futures::future::join_all(search_futures).await;

        let mut results: Vec<SearchResult> = Vec::new();
        let mut indexer_errors: HashMap<String, String> = HashMap::new();

        for (indexer, result) in responses {
            match result {
                Ok(mut found) => results.append(&mut found),
                Err(e) => {
                    warn!(indexer = %indexer, error = %e, "Indexer search failed");
                    INDEXER_FAILURES.with_label_values(&[indexer]).inc();
                    indexer_errors.insert(indexer.to_string(), e.to_string());
                }
            }
        }

        let duration = start.elapsed();
        SEARCH_DURATION
            .with_label_values(&[])
            .observe(duration.as_secs_f64());
        SEARCHES_TOTAL.with_label_values(&["network"]).inc();

        info!(
            query = %query.query,
            results = results.len(),
            failed_indexers = indexer_errors.len(),
            duration_ms = duration.as_millis() as u64,
            "Search complete"
        );

        let outcome = SearchOutcome {
            query: query.clone(),
            results,
            duration_ms: duration.as_millis() as u64,
            indexer_errors,
            from_cache: false,
        };
        // The full outcome is cached so a later query with a different
        // limit (or none) is served every result.
        self.cache.put(query, generation, &outcome).await;
        apply_limit(outcome, query)
    }
}

/// Keep the `limit` results with the most seeders.
fn apply_limit(mut outcome: SearchOutcome, query: &SearchQuery) -> SearchOutcome {
    if let Some(limit) = query.limit {
        outcome.results.sort_by(|a, b| b.seeders.cmp(&a.seeders));
        outcome.results.truncate(limit as usize);
    }
    outcome.query = query.clone();
    outcome
}
