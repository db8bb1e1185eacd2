//! Book requests and their lifecycle.

mod sqlite;
mod store;
mod types;

pub use sqlite::SqliteRequestStore;
pub use store::{RequestError, RequestStore};
pub use types::{BookRequest, NewRequest, RequestFilter, RequestStatus};
