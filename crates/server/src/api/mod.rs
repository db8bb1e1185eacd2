pub mod error;
pub mod handlers;
pub mod indexers;
pub mod middleware;
pub mod requests;
pub mod routes;
pub mod search;
pub mod settings;

pub use error::{ApiError, ErrorResponse};
pub use routes::create_router;
