//! Audiobook metadata lookup by ASIN.

mod clients;
mod types;

pub use clients::{AudimetaClient, AudnexusClient, FallbackCatalog};
pub use types::{AudibleRegion, Book, BookCatalog, CatalogError};

use std::sync::Arc;

use crate::config::CatalogConfig;

/// Audimeta first, then Audnexus.
pub fn create_book_catalog(config: &CatalogConfig) -> Result<Arc<dyn BookCatalog>, CatalogError> {
    let audimeta = AudimetaClient::new(config.audimeta_url.clone(), config.timeout_secs)?;
    let audnexus = AudnexusClient::new(config.audnexus_url.clone(), config.timeout_secs)?;
    Ok(Arc::new(FallbackCatalog::new(vec![
        Arc::new(audimeta),
        Arc::new(audnexus),
    ])))
}
