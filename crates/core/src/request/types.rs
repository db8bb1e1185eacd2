//! Book request types and the request state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::acquisition::ApprovalReason;
use crate::auth::TrustLevel;
use crate::catalog::Book;
use crate::download::DownloadReceipt;
use crate::ranking::RankedResult;

/// A user's request for one audiobook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookRequest {
    /// Unique identifier (UUID).
    pub id: String,
    pub book: Book,
    /// User who asked for the book.
    pub requester: String,
    /// Trust level of the requester when the request was made.
    pub trust: TrustLevel,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Where a request is in its lifecycle.
///
/// ```text
/// Pending ──► Selecting ──► Dispatched
///    │  ▲          │
///    ▼  │          ▼
/// AwaitingManualApproval ──► Selecting
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RequestStatus {
    /// Waiting for the pipeline to search.
    Pending,

    /// A candidate was chosen and is being sent to the download client.
    Selecting {
        candidate: RankedResult,
        /// False when an admin picked the candidate.
        automatic: bool,
    },

    /// The download client accepted the candidate.
    Dispatched {
        candidate: RankedResult,
        receipt: DownloadReceipt,
    },

    /// An admin has to pick a candidate or retry.
    AwaitingManualApproval {
        reason: ApprovalReason,
        /// Best ranked candidates, best first.
        #[serde(default)]
        candidates: Vec<RankedResult>,
    },
}

impl RequestStatus {
    pub fn state_type(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Selecting { .. } => "selecting",
            RequestStatus::Dispatched { .. } => "dispatched",
            RequestStatus::AwaitingManualApproval { .. } => "awaiting_manual_approval",
        }
    }

    /// Whether the state machine allows moving to `next`.
    pub fn can_transition_to(&self, next: &RequestStatus) -> bool {
        use RequestStatus::*;
        matches!(
            (self, next),
            (Pending, Selecting { .. })
                | (Pending, AwaitingManualApproval { .. })
                | (Selecting { .. }, Dispatched { .. })
                | (Selecting { .. }, AwaitingManualApproval { .. })
                | (AwaitingManualApproval { .. }, Selecting { .. })
                | (AwaitingManualApproval { .. }, Pending)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Dispatched { .. })
    }

    /// Candidates kept for manual review, if any.
    pub fn candidates(&self) -> &[RankedResult] {
        match self {
            RequestStatus::AwaitingManualApproval { candidates, .. } => candidates,
            _ => &[],
        }
    }
}

/// Data needed to create a request.
#[derive(Debug, Clone)]
pub struct NewRequest {
    pub book: Book,
    pub requester: String,
    pub trust: TrustLevel,
}

/// Filter for listing requests.
#[derive(Debug, Clone)]
pub struct RequestFilter {
    pub requester: Option<String>,
    /// Filter by [`RequestStatus::state_type`].
    pub state: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for RequestFilter {
    fn default() -> Self {
        Self {
            requester: None,
            state: None,
            limit: 100,
            offset: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    fn awaiting() -> RequestStatus {
        RequestStatus::AwaitingManualApproval {
            reason: ApprovalReason::NoResults,
            candidates: vec![],
        }
    }

    fn selecting() -> RequestStatus {
        RequestStatus::Selecting {
            candidate: fixtures::ranked_result("Dune", 10, 1.0),
            automatic: true,
        }
    }

    fn dispatched() -> RequestStatus {
        RequestStatus::Dispatched {
            candidate: fixtures::ranked_result("Dune", 10, 1.0),
            receipt: fixtures::receipt(),
        }
    }

    #[test]
    fn test_allowed_transitions() {
        assert!(RequestStatus::Pending.can_transition_to(&selecting()));
        assert!(RequestStatus::Pending.can_transition_to(&awaiting()));
        assert!(selecting().can_transition_to(&dispatched()));
        assert!(selecting().can_transition_to(&awaiting()));
        assert!(awaiting().can_transition_to(&selecting()));
        assert!(awaiting().can_transition_to(&RequestStatus::Pending));
    }

    #[test]
    fn test_rejected_transitions() {
        assert!(!RequestStatus::Pending.can_transition_to(&dispatched()));
        assert!(!RequestStatus::Pending.can_transition_to(&RequestStatus::Pending));
        assert!(!selecting().can_transition_to(&RequestStatus::Pending));
        assert!(!awaiting().can_transition_to(&dispatched()));
        assert!(!dispatched().can_transition_to(&RequestStatus::Pending));
        assert!(!dispatched().can_transition_to(&awaiting()));
        assert!(dispatched().is_terminal());
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_value(awaiting()).unwrap();
        assert_eq!(json["state"], "awaiting_manual_approval");
        assert_eq!(json["reason"]["kind"], "no_results");

        let parsed: RequestStatus = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, awaiting());
        assert_eq!(
            serde_json::to_value(RequestStatus::Pending).unwrap(),
            serde_json::json!({"state": "pending"})
        );
    }
}
