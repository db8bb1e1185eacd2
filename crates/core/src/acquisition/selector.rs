//! Decides whether the best ranked result is downloaded without an admin.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::auth::TrustLevel;
use crate::ranking::RankedResult;

use super::AutoDownloadConfig;

/// Why a request waits for an admin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ApprovalReason {
    AutoDownloadDisabled,
    InsufficientTrust,
    NoResults,
    BelowThreshold { top_score: f64, threshold: f64 },
    DispatchFailed { error: String },
    /// The service stopped while the candidate was being dispatched.
    Interrupted,
}

impl ApprovalReason {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ApprovalReason::AutoDownloadDisabled => "auto_download_disabled",
            ApprovalReason::InsufficientTrust => "insufficient_trust",
            ApprovalReason::NoResults => "no_results",
            ApprovalReason::BelowThreshold { .. } => "below_threshold",
            ApprovalReason::DispatchFailed { .. } => "dispatch_failed",
            ApprovalReason::Interrupted => "interrupted",
        }
    }
}

impl fmt::Display for ApprovalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApprovalReason::AutoDownloadDisabled => write!(f, "automatic downloads are disabled"),
            ApprovalReason::InsufficientTrust => {
                write!(f, "requester is not trusted to download automatically")
            }
            ApprovalReason::NoResults => write!(f, "no results found"),
            ApprovalReason::BelowThreshold {
                top_score,
                threshold,
            } => write!(f, "best score {:.2} is below {:.2}", top_score, threshold),
            ApprovalReason::DispatchFailed { error } => write!(f, "dispatch failed: {}", error),
            ApprovalReason::Interrupted => write!(
                f,
                "interrupted during dispatch, the download client may already have the release"
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// Download this result now.
    Auto(RankedResult),
    /// Leave the choice to an admin.
    Manual(ApprovalReason),
}

pub struct AutoDownloadSelector {
    config: AutoDownloadConfig,
}

impl AutoDownloadSelector {
    pub fn new(config: AutoDownloadConfig) -> Self {
        Self { config }
    }

    /// Pick the top result if it may be downloaded automatically.
    ///
    /// `ranked` must be sorted best first. Only rank 0 is ever considered.
    pub fn evaluate(&self, trust: TrustLevel, ranked: &[RankedResult]) -> Selection {
        let Some(top) = ranked.first() else {
            return Selection::Manual(ApprovalReason::NoResults);
        };
        if !self.config.enabled {
            return Selection::Manual(ApprovalReason::AutoDownloadDisabled);
        }
        if !trust.is_at_least(TrustLevel::Trusted) {
            return Selection::Manual(ApprovalReason::InsufficientTrust);
        }
        if top.score < self.config.min_score {
            return Selection::Manual(ApprovalReason::BelowThreshold {
                top_score: top.score,
                threshold: self.config.min_score,
            });
        }
        Selection::Auto(top.clone())
    }
}
