pub mod acquisition;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod download;
pub mod indexer;
pub mod metrics;
pub mod ranking;
pub mod request;
pub mod searcher;
pub mod settings;
pub mod testing;

pub use acquisition::{
    AcquisitionError, AcquisitionPipeline, ApprovalReason, AutoDownloadConfig,
    AutoDownloadSelector, DownloadSettings, DownloadSettingsError, DownloadSettingsManager,
    Selection,
};
pub use auth::{
    create_authenticator, AuthError, AuthRequest, Authenticator, Identity, NoneAuthenticator,
    TrustLevel,
};
pub use catalog::{create_book_catalog, AudibleRegion, Book, BookCatalog, CatalogError};
pub use config::{
    load_config, load_config_from_str, validate_config, AuthMethod, Config, ConfigError,
    SanitizedConfig,
};
pub use download::{
    create_download_client, DispatchError, Dispatcher, DownloadClient, DownloadClientError,
    DownloadReceipt,
};
pub use indexer::{ApplyReport, IndexerConfig, IndexerFileWatcher, IndexerRegistry, RegistryError};
pub use ranking::{rank, RankContext, RankedResult, RankingConfig, ScoreBreakdown};
pub use request::{
    BookRequest, NewRequest, RequestError, RequestFilter, RequestStatus, RequestStore,
    SqliteRequestStore,
};
pub use searcher::{
    ProwlarrSearcher, SearchError, SearchOutcome, SearchQuery, SearchResult, Searcher,
};
pub use settings::{SettingsError, SettingsStore, SqliteSettingsStore};
