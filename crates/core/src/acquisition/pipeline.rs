//! Drives a book request from search to download.

use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::download::Dispatcher;
use crate::indexer::IndexerRegistry;
use crate::metrics::{ACQUISITION_DURATION, AUTO_DOWNLOAD_DECISIONS};
use crate::ranking::{rank, RankContext, RankedResult};
use crate::request::{BookRequest, RequestError, RequestFilter, RequestStatus, RequestStore};
use crate::searcher::{SearchQuery, Searcher};

use super::{ApprovalReason, AutoDownloadSelector, DownloadSettingsManager, Selection};

#[derive(Debug, Error)]
pub enum AcquisitionError {
    #[error(transparent)]
    Request(#[from] RequestError),

    #[error("Candidate {index} does not exist ({available} available)")]
    InvalidCandidate { index: usize, available: usize },
}

/// Runs requests through search, ranking, selection and dispatch.
///
/// Every step is persisted as a status transition, so a request that fails
/// half way is left in a state an admin can act on.
pub struct AcquisitionPipeline {
    requests: Arc<dyn RequestStore>,
    searcher: Arc<dyn Searcher>,
    registry: Arc<IndexerRegistry>,
    dispatcher: Option<Arc<Dispatcher>>,
    settings: Arc<DownloadSettingsManager>,
}

impl AcquisitionPipeline {
    pub fn new(
        requests: Arc<dyn RequestStore>,
        searcher: Arc<dyn Searcher>,
        registry: Arc<IndexerRegistry>,
        dispatcher: Option<Arc<Dispatcher>>,
        settings: Arc<DownloadSettingsManager>,
    ) -> Self {
        Self {
            requests,
            searcher,
            registry,
            dispatcher,
            settings,
        }
    }

    fn load(&self, id: &str) -> Result<BookRequest, AcquisitionError> {
        self.requests
            .get(id)?
            .ok_or_else(|| AcquisitionError::Request(RequestError::NotFound(id.to_string())))
    }

    /// Search, rank and select for a `Pending` request.
    pub async fn process(&self, id: &str) -> Result<BookRequest, AcquisitionError> {
        let start = Instant::now();
        let request = self.load(id)?;
        if request.status != RequestStatus::Pending {
            return Err(RequestError::InvalidTransition {
                id: id.to_string(),
                from: request.status.state_type().to_string(),
                to: "selecting".to_string(),
            }
            .into());
        }

        let settings = self.settings.current().await;
        let query = SearchQuery::new(request.book.search_query());
        info!(request_id = %id, query = %query.query, "Searching for requested book");

        let outcome = self.searcher.search(&query).await;
        if !outcome.indexer_errors.is_empty() {
            warn!(
                request_id = %id,
                failed_indexers = outcome.indexer_errors.len(),
                "Some indexers failed during search"
            );
        }

        let context = RankContext {
            title: request.book.title.clone(),
            authors: request.book.authors.clone(),
            runtime_minutes: request.book.runtime_minutes,
            indexer_priorities: self.registry.priorities().await,
        };
        let ranked = rank(outcome.results, &settings.ranking, &context);
        debug!(request_id = %id, candidates = ranked.len(), "Ranked search results");

        let candidates: Vec<RankedResult> = ranked
            .iter()
            .take(settings.auto_download.max_candidates)
            .cloned()
            .collect();

        let selector = AutoDownloadSelector::new(settings.auto_download);
        let updated = match selector.evaluate(request.trust, &ranked) {
            Selection::Auto(top) => {
                AUTO_DOWNLOAD_DECISIONS.with_label_values(&["auto"]).inc();
                info!(
                    request_id = %id,
                    title = %top.result.title,
                    score = top.score,
                    "Auto-downloading top result"
                );
                self.requests.update_status(
                    id,
                    RequestStatus::Selecting {
                        candidate: top.clone(),
                        automatic: true,
                    },
                )?;
                self.dispatch(id, top, candidates).await?
            }
            Selection::Manual(reason) => {
                AUTO_DOWNLOAD_DECISIONS
                    .with_label_values(&[reason.kind()])
                    .inc();
                info!(request_id = %id, reason = %reason, "Request needs manual approval");
                self.requests.update_status(
                    id,
                    RequestStatus::AwaitingManualApproval { reason, candidates },
                )?
            }
        };

        ACQUISITION_DURATION
            .with_label_values(&[updated.status.state_type()])
            .observe(start.elapsed().as_secs_f64());
        Ok(updated)
    }

    /// Dispatch candidate `index` of a request awaiting approval.
    pub async fn approve(&self, id: &str, index: usize) -> Result<BookRequest, AcquisitionError> {
        let request = self.load(id)?;
        let candidates = request.status.candidates().to_vec();
        let Some(candidate) = candidates.get(index).cloned() else {
            if !matches!(request.status, RequestStatus::AwaitingManualApproval { .. }) {
                return Err(RequestError::InvalidTransition {
                    id: id.to_string(),
                    from: request.status.state_type().to_string(),
                    to: "selecting".to_string(),
                }
                .into());
            }
            return Err(AcquisitionError::InvalidCandidate {
                index,
                available: candidates.len(),
            });
        };

        self.requests.update_status(
            id,
            RequestStatus::Selecting {
                candidate: candidate.clone(),
                automatic: false,
            },
        )?;
        info!(request_id = %id, title = %candidate.result.title, "Candidate approved");

        self.dispatch(id, candidate, candidates).await
    }

    /// Put a request awaiting approval back to `Pending` and run it again.
    pub async fn retry(&self, id: &str) -> Result<BookRequest, AcquisitionError> {
        self.requests.update_status(id, RequestStatus::Pending)?;
        info!(request_id = %id, "Retrying request");
        self.process(id).await
    }

    /// Hand requests left in `Selecting` by a previous run to an admin.
    ///
    /// Whether the download client received the candidate is unknown, so it
    /// is kept as the only candidate instead of being sent again.
    pub fn recover_interrupted(&self) -> Result<usize, AcquisitionError> {
        let stuck = self.requests.list(&RequestFilter {
            state: Some("selecting".to_string()),
            limit: 1000,
            ..Default::default()
        })?;

        let mut recovered = 0;
        for request in stuck {
            let RequestStatus::Selecting { candidate, .. } = request.status else {
                continue;
            };
            warn!(
                request_id = %request.id,
                title = %candidate.result.title,
                "Request was interrupted during dispatch, waiting for an admin"
            );
            AUTO_DOWNLOAD_DECISIONS
                .with_label_values(&[ApprovalReason::Interrupted.kind()])
                .inc();
            self.requests.update_status(
                &request.id,
                RequestStatus::AwaitingManualApproval {
                    reason: ApprovalReason::Interrupted,
                    candidates: vec![candidate],
                },
            )?;
            recovered += 1;
        }
        Ok(recovered)
    }

    /// Run [`process`](Self::process) on its own task.
    pub fn spawn(self: &Arc<Self>, id: String) -> JoinHandle<()> {
        let pipeline = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = pipeline.process(&id).await {
                error!(request_id = %id, error = %e, "Acquisition failed");
            }
        })
    }

    /// Send a selected candidate to the download client.
    ///
    /// A failure moves the request to manual approval with the error; the
    /// next candidate is never tried automatically.
    async fn dispatch(
        &self,
        id: &str,
        candidate: RankedResult,
        candidates: Vec<RankedResult>,
    ) -> Result<BookRequest, AcquisitionError> {
        let outcome = match &self.dispatcher {
            Some(dispatcher) => dispatcher
                .dispatch(&candidate.result)
                .await
                .map_err(|e| e.to_string()),
            None => Err("no download client configured".to_string()),
        };

        let status = match outcome {
            Ok(receipt) => RequestStatus::Dispatched { candidate, receipt },
            Err(error) => {
                AUTO_DOWNLOAD_DECISIONS
                    .with_label_values(&["dispatch_failed"])
                    .inc();
                warn!(request_id = %id, error = %error, "Dispatch failed, waiting for an admin");
                RequestStatus::AwaitingManualApproval {
                    reason: ApprovalReason::DispatchFailed { error },
                    candidates,
                }
            }
        };

        Ok(self.requests.update_status(id, status)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TrustLevel;
    use crate::download::{DownloadClient, DownloadClientError};
    use crate::request::{NewRequest, SqliteRequestStore};
    use crate::settings::SqliteSettingsStore;
    use crate::testing::{fixtures, MockDownloadClient, MockSearcher};
    use crate::acquisition::DownloadSettings;

    struct Harness {
        pipeline: Arc<AcquisitionPipeline>,
        requests: Arc<SqliteRequestStore>,
        searcher: Arc<MockSearcher>,
        client: Arc<MockDownloadClient>,
    }

    fn harness(auto_download: bool, with_client: bool) -> Harness {
        let settings_store = Arc::new(SqliteSettingsStore::in_memory().unwrap());
        let registry = Arc::new(IndexerRegistry::new(settings_store.clone()).unwrap());
        let mut defaults = DownloadSettings::default();
        defaults.auto_download.enabled = auto_download;
        defaults.auto_download.max_candidates = 2;
        let settings = Arc::new(DownloadSettingsManager::new(settings_store, defaults).unwrap());

        let requests = Arc::new(SqliteRequestStore::in_memory().unwrap());
        let searcher = Arc::new(MockSearcher::new());
        let client = Arc::new(MockDownloadClient::new());
        let dispatcher = with_client.then(|| {
            Arc::new(Dispatcher::new(Arc::clone(&client) as Arc<dyn DownloadClient>))
        });

        let pipeline = Arc::new(AcquisitionPipeline::new(
            requests.clone(),
            searcher.clone(),
            registry,
            dispatcher,
            settings,
        ));
        Harness {
            pipeline,
            requests,
            searcher,
            client,
        }
    }

    fn create(h: &Harness, trust: TrustLevel) -> String {
        h.requests
            .create(NewRequest {
                book: fixtures::book("Project Hail Mary", "Andy Weir"),
                requester: "alice".to_string(),
                trust,
            })
            .unwrap()
            .id
    }

    fn releases() -> Vec<crate::searcher::SearchResult> {
        vec![
            fixtures::search_result("Something Else Entirely", 80),
            fixtures::search_result("Andy Weir - Project Hail Mary", 50),
            fixtures::search_result("Project Hail Mary (Andy Weir) MP3", 5),
        ]
    }

    #[tokio::test]
    async fn test_trusted_request_is_dispatched() {
        let h = harness(true, true);
        h.searcher.set_results(releases()).await;
        let id = create(&h, TrustLevel::Trusted);

        let updated = h.pipeline.process(&id).await.unwrap();
        match &updated.status {
            RequestStatus::Dispatched { candidate, receipt } => {
                assert_eq!(candidate.result.title, "Andy Weir - Project Hail Mary");
                assert_eq!(receipt.client, "mock");
            }
            other => panic!("expected dispatched, got {:?}", other),
        }
        assert_eq!(h.client.recorded_adds().await.len(), 1);
        assert_eq!(
            h.searcher.recorded_searches().await[0].query.query,
            "Project Hail Mary Andy Weir"
        );
    }

    #[tokio::test]
    async fn test_untrusted_request_waits_with_capped_candidates() {
        let h = harness(true, true);
        h.searcher.set_results(releases()).await;
        let id = create(&h, TrustLevel::Untrusted);

        let updated = h.pipeline.process(&id).await.unwrap();
        match &updated.status {
            RequestStatus::AwaitingManualApproval { reason, candidates } => {
                assert_eq!(*reason, ApprovalReason::InsufficientTrust);
                assert_eq!(candidates.len(), 2);
                assert_eq!(candidates[0].result.title, "Andy Weir - Project Hail Mary");
            }
            other => panic!("expected manual approval, got {:?}", other),
        }
        assert!(h.client.recorded_adds().await.is_empty());
    }

    #[tokio::test]
    async fn test_no_results() {
        let h = harness(true, true);
        let id = create(&h, TrustLevel::Admin);

        let updated = h.pipeline.process(&id).await.unwrap();
        assert_eq!(
            updated.status,
            RequestStatus::AwaitingManualApproval {
                reason: ApprovalReason::NoResults,
                candidates: vec![],
            }
        );
    }

    #[tokio::test]
    async fn test_dispatch_failure_then_manual_approval() {
        let h = harness(true, true);
        h.searcher.set_results(releases()).await;
        h.client
            .set_next_error(DownloadClientError::ConnectionFailed("refused".to_string()))
            .await;
        let id = create(&h, TrustLevel::Trusted);

        let updated = h.pipeline.process(&id).await.unwrap();
        match &updated.status {
            RequestStatus::AwaitingManualApproval { reason, candidates } => {
                assert_eq!(reason.kind(), "dispatch_failed");
                assert_eq!(candidates.len(), 2);
            }
            other => panic!("expected manual approval, got {:?}", other),
        }
        // Only the top result was tried
        assert_eq!(h.client.recorded_adds().await.len(), 1);

        let approved = h.pipeline.approve(&id, 1).await.unwrap();
        match &approved.status {
            RequestStatus::Dispatched { candidate, .. } => {
                assert_eq!(candidate.result.title, "Project Hail Mary (Andy Weir) MP3");
            }
            other => panic!("expected dispatched, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_approve_rejects_unknown_candidate() {
        let h = harness(false, true);
        h.searcher.set_results(releases()).await;
        let id = create(&h, TrustLevel::Trusted);
        h.pipeline.process(&id).await.unwrap();

        let result = h.pipeline.approve(&id, 5).await;
        assert!(matches!(
            result,
            Err(AcquisitionError::InvalidCandidate {
                index: 5,
                available: 2
            })
        ));
    }

    #[tokio::test]
    async fn test_approve_requires_awaiting_state() {
        let h = harness(true, true);
        let id = create(&h, TrustLevel::Trusted);

        let result = h.pipeline.approve(&id, 0).await;
        assert!(matches!(
            result,
            Err(AcquisitionError::Request(RequestError::InvalidTransition { .. }))
        ));
    }

    #[tokio::test]
    async fn test_process_requires_pending() {
        let h = harness(true, true);
        h.searcher.set_results(releases()).await;
        let id = create(&h, TrustLevel::Trusted);
        h.pipeline.process(&id).await.unwrap();

        let again = h.pipeline.process(&id).await;
        assert!(matches!(
            again,
            Err(AcquisitionError::Request(RequestError::InvalidTransition { .. }))
        ));
        assert_eq!(h.searcher.search_count().await, 1);
    }

    #[tokio::test]
    async fn test_retry_searches_again() {
        let h = harness(true, true);
        let id = create(&h, TrustLevel::Trusted);
        h.pipeline.process(&id).await.unwrap();

        h.searcher.set_results(releases()).await;
        let updated = h.pipeline.retry(&id).await.unwrap();
        assert!(matches!(updated.status, RequestStatus::Dispatched { .. }));
        assert_eq!(h.searcher.search_count().await, 2);
    }

    #[tokio::test]
    async fn test_missing_download_client() {
        let h = harness(true, false);
        h.searcher.set_results(releases()).await;
        let id = create(&h, TrustLevel::Trusted);

        let updated = h.pipeline.process(&id).await.unwrap();
        match updated.status {
            RequestStatus::AwaitingManualApproval {
                reason: ApprovalReason::DispatchFailed { error },
                ..
            } => assert_eq!(error, "no download client configured"),
            other => panic!("expected dispatch failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_spawn_runs_in_background() {
        let h = harness(true, true);
        h.searcher.set_results(releases()).await;
        let id = create(&h, TrustLevel::Admin);

        h.pipeline.spawn(id.clone()).await.unwrap();
        let stored = h.requests.get(&id).unwrap().unwrap();
        assert!(stored.status.is_terminal());
    }

    #[tokio::test]
    async fn test_interrupted_dispatch_is_handed_to_admin() {
        let h = harness(true, true);
        let stuck = create(&h, TrustLevel::Trusted);
        let pending = create(&h, TrustLevel::Trusted);
        let candidate = fixtures::ranked_result("Andy Weir - Project Hail Mary", 50, 2.0);
        h.requests
            .update_status(
                &stuck,
                RequestStatus::Selecting {
                    candidate: candidate.clone(),
                    automatic: true,
                },
            )
            .unwrap();

        assert_eq!(h.pipeline.recover_interrupted().unwrap(), 1);

        let recovered = h.requests.get(&stuck).unwrap().unwrap();
        assert_eq!(
            recovered.status,
            RequestStatus::AwaitingManualApproval {
                reason: ApprovalReason::Interrupted,
                candidates: vec![candidate],
            }
        );
        assert_eq!(
            h.requests.get(&pending).unwrap().unwrap().status,
            RequestStatus::Pending
        );
        assert!(h.client.recorded_adds().await.is_empty());

        // The admin can now send it again or search from scratch
        let approved = h.pipeline.approve(&stuck, 0).await.unwrap();
        assert!(matches!(approved.status, RequestStatus::Dispatched { .. }));
        assert_eq!(h.pipeline.recover_interrupted().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unknown_request() {
        let h = harness(true, true);
        let result = h.pipeline.process("missing").await;
        assert!(matches!(
            result,
            Err(AcquisitionError::Request(RequestError::NotFound(_)))
        ));
    }
}
