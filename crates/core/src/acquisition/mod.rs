//! Acquisition: choosing a release for a request and dispatching it.

mod pipeline;
mod selector;
mod settings;

pub use pipeline::{AcquisitionError, AcquisitionPipeline};
pub use selector::{ApprovalReason, AutoDownloadSelector, Selection};
pub use settings::{
    AutoDownloadConfig, DownloadSettings, DownloadSettingsError, DownloadSettingsManager,
    DOWNLOAD_SETTINGS_KEY,
};
