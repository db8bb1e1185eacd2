//! Polling watcher for the indexer settings file.
//!
//! The file is a JSON object keyed by indexer name:
//!
//! ```json
//! { "MyAnonamouse": { "enabled": true, "prowlarr_indexer_id": 12 } }
//! ```
//!
//! Each block goes through [`IndexerRegistry::patch`], so the file obeys the
//! same validation as the API. Whichever writer applies last wins.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use super::IndexerRegistry;

/// Outcome of applying one version of the file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplyReport {
    /// File generation that was applied.
    pub generation: u64,
    /// Indexers whose block was applied.
    pub applied: Vec<String>,
    /// Indexers whose block was rejected, with the reason.
    pub failed: BTreeMap<String, String>,
}

#[derive(Debug, Default)]
struct WatchState {
    fingerprint: Option<String>,
    /// Bumped whenever the file content changes.
    observed_generation: u64,
    /// Last generation pushed into the registry.
    applied_generation: u64,
}

pub struct IndexerFileWatcher {
    path: PathBuf,
    poll_interval: Duration,
    registry: Arc<IndexerRegistry>,
    state: Mutex<WatchState>,
    running: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
}

impl IndexerFileWatcher {
    pub fn new(path: PathBuf, poll_interval: Duration, registry: Arc<IndexerRegistry>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            path,
            poll_interval,
            registry,
            state: Mutex::new(WatchState::default()),
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
        }
    }

    /// Check the file once and apply it if it changed since the last apply.
    ///
    /// Returns `None` when there was nothing new to apply.
    pub async fn poll_once(&self) -> Option<ApplyReport> {
        let contents = match tokio::fs::read(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "Indexer settings file not present");
                return None;
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read indexer settings file");
                return None;
            }
        };

        let fingerprint = format!("{:x}", Sha256::digest(&contents));

        let mut state = self.state.lock().await;
        if state.fingerprint.as_deref() != Some(fingerprint.as_str()) {
            state.fingerprint = Some(fingerprint);
            state.observed_generation += 1;
        }
        if state.observed_generation <= state.applied_generation {
            return None;
        }

        let generation = state.observed_generation;
        // Mark applied up front: a malformed file is not retried until it changes
        state.applied_generation = generation;
        drop(state);

        let blocks: Map<String, Value> = match serde_json::from_slice(&contents) {
            Ok(blocks) => blocks,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Indexer settings file is not a JSON object");
                return Some(ApplyReport {
                    generation,
                    applied: Vec::new(),
                    failed: BTreeMap::from([("*".to_string(), e.to_string())]),
                });
            }
        };

        let mut report = ApplyReport {
            generation,
            ..Default::default()
        };

        for (name, block) in blocks {
            let Value::Object(values) = block else {
                warn!(indexer = %name, "Indexer block must be a JSON object");
                report
                    .failed
                    .insert(name, "expected a JSON object".to_string());
                continue;
            };

            match self.registry.patch(&name, &values).await {
                Ok(_) => report.applied.push(name),
                Err(e) => {
                    warn!(indexer = %name, error = %e, "Rejected indexer block from settings file");
                    report.failed.insert(name, e.to_string());
                }
            }
        }

        info!(
            generation,
            applied = report.applied.len(),
            failed = report.failed.len(),
            "Applied indexer settings file"
        );

        Some(report)
    }

    /// Start polling in the background.
    pub async fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Indexer file watcher already running");
            return;
        }

        let watcher = Arc::clone(self);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            info!(path = %watcher.path.display(), "Indexer file watcher started");
            // Apply the file as it is at startup
            watcher.poll_once().await;
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Indexer file watcher received shutdown signal");
                        break;
                    }
                    _ = tokio::time::sleep(watcher.poll_interval) => {
                        if !watcher.running.load(Ordering::Relaxed) {
                            break;
                        }
                        watcher.poll_once().await;
                    }
                }
            }
            info!("Indexer file watcher stopped");
        });
    }

    /// Stop polling.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("Indexer file watcher not running");
            return;
        }
        let _ = self.shutdown_tx.send(());
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }
}
