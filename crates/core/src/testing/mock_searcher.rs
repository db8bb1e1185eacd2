//! Mock searcher for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

use crate::searcher::{SearchOutcome, SearchQuery, SearchResult, Searcher};

/// A recorded search for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedSearch {
    /// The query that was searched.
    pub query: SearchQuery,
    /// When the search was made.
    pub timestamp: Instant,
}

/// A query handler that produces results dynamically based on the query.
type QueryHandler = Box<dyn Fn(&str) -> Vec<SearchResult> + Send + Sync>;

/// Mock implementation of the Searcher trait.
///
/// Every search returns the configured results, whatever the query, plus any
/// simulated indexer errors.
///
/// # Example
///
/// ```rust,ignore
/// use bookhound_core::testing::{MockSearcher, fixtures};
///
/// let searcher = MockSearcher::new();
/// searcher.set_results(vec![fixtures::search_result("Dune", 40)]).await;
///
/// let outcome = searcher.search(&SearchQuery::new("dune")).await;
/// assert_eq!(outcome.results.len(), 1);
/// assert_eq!(searcher.search_count().await, 1);
/// ```
pub struct MockSearcher {
    results: Arc<RwLock<Vec<SearchResult>>>,
    searches: Arc<RwLock<Vec<RecordedSearch>>>,
    indexer_errors: Arc<RwLock<HashMap<String, String>>>,
    query_handler: Arc<RwLock<Option<QueryHandler>>>,
}

impl std::fmt::Debug for MockSearcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSearcher")
            .field("results", &"<results>")
            .field("searches", &"<searches>")
            .field("indexer_errors", &"<indexer_errors>")
            .field("query_handler", &"<handler>")
            .finish()
    }
}

impl Default for MockSearcher {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSearcher {
    pub fn new() -> Self {
        Self {
            results: Arc::new(RwLock::new(Vec::new())),
            searches: Arc::new(RwLock::new(Vec::new())),
            indexer_errors: Arc::new(RwLock::new(HashMap::new())),
            query_handler: Arc::new(RwLock::new(None)),
        }
    }

    /// Set the results to return for subsequent searches.
    pub async fn set_results(&self, results: Vec<SearchResult>) {
        *self.results.write().await = results;
    }

    /// Get recorded search queries.
    pub async fn recorded_searches(&self) -> Vec<RecordedSearch> {
        self.searches.read().await.clone()
    }

    /// Get the number of searches performed.
    pub async fn search_count(&self) -> usize {
        self.searches.read().await.len()
    }

    /// Add a simulated indexer error.
    pub async fn add_indexer_error(&self, indexer: &str, error: &str) {
        self.indexer_errors
            .write()
            .await
            .insert(indexer.to_string(), error.to_string());
    }

    /// Produce results from the query string instead of the fixed list.
    pub async fn set_query_handler<F>(&self, handler: F)
    where
        F: Fn(&str) -> Vec<SearchResult> + Send + Sync + 'static,
    {
        *self.query_handler.write().await = Some(Box::new(handler));
    }
}

#[async_trait]
impl Searcher for MockSearcher {
    fn name(&self) -> &str {
        "mock"
    }

    async fn search(&self, query: &SearchQuery) -> SearchOutcome {
        self.searches.write().await.push(RecordedSearch {
            query: query.clone(),
            timestamp: Instant::now(),
        });

        let results = match &*self.query_handler.read().await {
            Some(handler) => handler(&query.query),
            None => self.results.read().await.clone(),
        };
        let results = match query.limit {
            Some(limit) => results.into_iter().take(limit as usize).collect(),
            None => results,
        };

        SearchOutcome {
            query: query.clone(),
            results,
            duration_ms: 5,
            indexer_errors: self.indexer_errors.read().await.clone(),
            from_cache: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    #[tokio::test]
    async fn test_returns_configured_results_and_records() {
        let searcher = MockSearcher::new();
        searcher
            .set_results(vec![
                fixtures::search_result("Dune", 10),
                fixtures::search_result("Dune Messiah", 5),
            ])
            .await;
        searcher.add_indexer_error("mam", "timeout").await;

        let outcome = searcher.search(&SearchQuery::new("dune")).await;
        assert_eq!(outcome.results.len(), 2);
        assert_eq!(outcome.indexer_errors.get("mam").map(String::as_str), Some("timeout"));

        let searches = searcher.recorded_searches().await;
        assert_eq!(searches.len(), 1);
        assert_eq!(searches[0].query.query, "dune");
    }

    #[tokio::test]
    async fn test_query_handler() {
        let searcher = MockSearcher::new();
        searcher
            .set_query_handler(|query| {
                if query.contains("Hail Mary") {
                    vec![fixtures::search_result(query, 20)]
                } else {
                    vec![]
                }
            })
            .await;

        let hit = searcher.search(&SearchQuery::new("Project Hail Mary")).await;
        assert_eq!(hit.results.len(), 1);
        let miss = searcher.search(&SearchQuery::new("Dune")).await;
        assert!(miss.results.is_empty());
        assert_eq!(searcher.search_count().await, 2);
    }
}
