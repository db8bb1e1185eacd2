use std::sync::Arc;

use bookhound_core::{
    AcquisitionPipeline, AudibleRegion, Authenticator, BookCatalog, Config,
    DownloadSettingsManager, IndexerRegistry, RequestStore, SanitizedConfig, Searcher,
};

/// Shared application state
pub struct AppState {
    config: Config,
    authenticator: Arc<dyn Authenticator>,
    registry: Arc<IndexerRegistry>,
    requests: Arc<dyn RequestStore>,
    download_settings: Arc<DownloadSettingsManager>,
    /// Search backend (None if Prowlarr is not configured)
    searcher: Option<Arc<dyn Searcher>>,
    /// Book metadata lookup
    catalog: Option<Arc<dyn BookCatalog>>,
    /// Acquisition pipeline (None without a searcher)
    pipeline: Option<Arc<AcquisitionPipeline>>,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Config,
        authenticator: Arc<dyn Authenticator>,
        registry: Arc<IndexerRegistry>,
        requests: Arc<dyn RequestStore>,
        download_settings: Arc<DownloadSettingsManager>,
        searcher: Option<Arc<dyn Searcher>>,
        catalog: Option<Arc<dyn BookCatalog>>,
        pipeline: Option<Arc<AcquisitionPipeline>>,
    ) -> Self {
        Self {
            config,
            authenticator,
            registry,
            requests,
            download_settings,
            searcher,
            catalog,
            pipeline,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    /// Region used for catalog lookups that do not name one.
    pub fn default_region(&self) -> AudibleRegion {
        self.config.catalog.region
    }

    pub fn authenticator(&self) -> &dyn Authenticator {
        self.authenticator.as_ref()
    }

    pub fn registry(&self) -> &Arc<IndexerRegistry> {
        &self.registry
    }

    pub fn requests(&self) -> &Arc<dyn RequestStore> {
        &self.requests
    }

    pub fn download_settings(&self) -> &Arc<DownloadSettingsManager> {
        &self.download_settings
    }

    pub fn searcher(&self) -> Option<&Arc<dyn Searcher>> {
        self.searcher.as_ref()
    }

    pub fn catalog(&self) -> Option<&Arc<dyn BookCatalog>> {
        self.catalog.as_ref()
    }

    pub fn pipeline(&self) -> Option<&Arc<AcquisitionPipeline>> {
        self.pipeline.as_ref()
    }
}
