//! Validates release links and hands them to the download client.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::metrics::DISPATCHES;
use crate::searcher::SearchResult;

use super::magnet::{magnet_info_hash, normalize_info_hash};
use super::{DispatchError, DownloadClient, DownloadReceipt};

pub struct Dispatcher {
    client: Arc<dyn DownloadClient>,
}

impl Dispatcher {
    pub fn new(client: Arc<dyn DownloadClient>) -> Self {
        Self { client }
    }

    /// Check the link without touching the network and return its info hash.
    pub fn check_link(&self, result: &SearchResult) -> Result<Option<String>, DispatchError> {
        let link = result.download_link.trim();

        if link.starts_with("magnet:") {
            return magnet_info_hash(link)
                .map(Some)
                .map_err(|e| DispatchError::MalformedLink(e.to_string()));
        }

        let lower = link.to_ascii_lowercase();
        if !(lower.starts_with("http://") || lower.starts_with("https://")) {
            return Err(DispatchError::MalformedLink(format!(
                "unsupported link scheme: {}",
                link.chars().take(40).collect::<String>()
            )));
        }

        let info_hash = result.info_hash.as_deref().and_then(normalize_info_hash);
        if info_hash.is_none() && self.client.requires_info_hash() {
            return Err(DispatchError::MalformedLink(format!(
                "{} requires an info hash and none is known for this link",
                self.client.name()
            )));
        }
        Ok(info_hash)
    }

    /// Send one release to the download client. Failures are not retried.
    pub async fn dispatch(&self, result: &SearchResult) -> Result<DownloadReceipt, DispatchError> {
        let client = self.client.name().to_string();

        let info_hash = match self.check_link(result) {
            Ok(hash) => hash,
            Err(e) => {
                warn!(title = %result.title, error = %e, "Refusing to dispatch release");
                DISPATCHES.with_label_values(&[&client, "malformed"]).inc();
                return Err(e);
            }
        };

        if let Err(e) = self.client.add(result.download_link.trim()).await {
            warn!(title = %result.title, client = %client, error = %e, "Download client rejected release");
            DISPATCHES.with_label_values(&[&client, "client_error"]).inc();
            return Err(e.into());
        }

        DISPATCHES.with_label_values(&[&client, "ok"]).inc();
        info!(
            title = %result.title,
            indexer = %result.indexer,
            info_hash = ?info_hash,
            client = %client,
            "Release dispatched"
        );

        Ok(DownloadReceipt {
            client,
            info_hash,
            link: result.download_link.trim().to_string(),
            dispatched_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::DownloadClientError;
    use crate::testing::{fixtures, MockDownloadClient};

    const HEX: &str = "c12fe1c06bba254a9dc9f519b335aa7c1367a88a";

    fn dispatcher(client: &Arc<MockDownloadClient>) -> Dispatcher {
        Dispatcher::new(Arc::clone(client) as Arc<dyn DownloadClient>)
    }

    #[tokio::test]
    async fn test_magnet_without_hash_fails_before_network() {
        let client = Arc::new(MockDownloadClient::new());
        let mut result = fixtures::search_result("Dune", 10);
        result.download_link = "magnet:?dn=Dune".to_string();

        let outcome = dispatcher(&client).dispatch(&result).await;
        assert!(matches!(outcome, Err(DispatchError::MalformedLink(_))));
        assert!(client.recorded_adds().await.is_empty());
    }

    #[tokio::test]
    async fn test_magnet_dispatch_returns_receipt() {
        let client = Arc::new(MockDownloadClient::new());
        let mut result = fixtures::search_result("Dune", 10);
        result.download_link = format!("magnet:?xt=urn:btih:{}", HEX.to_uppercase());

        let receipt = dispatcher(&client).dispatch(&result).await.unwrap();
        assert_eq!(receipt.client, "mock");
        assert_eq!(receipt.info_hash.as_deref(), Some(HEX));
        assert_eq!(client.recorded_adds().await, vec![result.download_link.clone()]);
    }

    #[tokio::test]
    async fn test_torrent_url_uses_result_hash() {
        let client = Arc::new(MockDownloadClient::new());
        let mut result = fixtures::search_result("Dune", 10);
        result.download_link = "https://prowlarr/download/1".to_string();
        result.info_hash = Some(HEX.to_string());

        let receipt = dispatcher(&client).dispatch(&result).await.unwrap();
        assert_eq!(receipt.info_hash.as_deref(), Some(HEX));
    }

    #[tokio::test]
    async fn test_torrent_url_without_hash() {
        let mut result = fixtures::search_result("Dune", 10);
        result.download_link = "https://prowlarr/download/1".to_string();
        result.info_hash = None;

        let lenient = Arc::new(MockDownloadClient::new());
        let receipt = dispatcher(&lenient).dispatch(&result).await.unwrap();
        assert_eq!(receipt.info_hash, None);

        let strict = Arc::new(MockDownloadClient::new());
        strict.set_requires_info_hash(true).await;
        let outcome = dispatcher(&strict).dispatch(&result).await;
        assert!(matches!(outcome, Err(DispatchError::MalformedLink(_))));
        assert!(strict.recorded_adds().await.is_empty());
    }

    #[tokio::test]
    async fn test_unsupported_scheme() {
        let client = Arc::new(MockDownloadClient::new());
        let mut result = fixtures::search_result("Dune", 10);
        result.download_link = "ftp://somewhere/dune.torrent".to_string();

        let outcome = dispatcher(&client).dispatch(&result).await;
        assert!(matches!(outcome, Err(DispatchError::MalformedLink(_))));
    }

    #[tokio::test]
    async fn test_client_failure_is_not_retried() {
        let client = Arc::new(MockDownloadClient::new());
        client
            .set_next_error(DownloadClientError::ConnectionFailed("refused".to_string()))
            .await;
        let result = fixtures::search_result("Dune", 10);

        let outcome = dispatcher(&client).dispatch(&result).await;
        assert!(matches!(outcome, Err(DispatchError::Client(_))));
        assert_eq!(client.recorded_adds().await.len(), 1);
    }
}
