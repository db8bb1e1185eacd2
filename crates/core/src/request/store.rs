//! Request storage trait and errors.

use thiserror::Error;

use super::{BookRequest, NewRequest, RequestFilter, RequestStatus};

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("Request not found: {0}")]
    NotFound(String),

    #[error("Cannot move request {id} from {from} to {to}")]
    InvalidTransition {
        id: String,
        from: String,
        to: String,
    },

    #[error("Database error: {0}")]
    Database(String),
}

/// Trait for request persistence.
pub trait RequestStore: Send + Sync {
    fn create(&self, request: NewRequest) -> Result<BookRequest, RequestError>;

    fn get(&self, id: &str) -> Result<Option<BookRequest>, RequestError>;

    /// Newest first.
    fn list(&self, filter: &RequestFilter) -> Result<Vec<BookRequest>, RequestError>;

    /// Move a request to `status`.
    ///
    /// The current status is read and replaced atomically. A transition the
    /// state machine does not allow fails with `InvalidTransition`.
    fn update_status(&self, id: &str, status: RequestStatus) -> Result<BookRequest, RequestError>;
}
