//! Mock book catalog for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::catalog::{AudibleRegion, Book, BookCatalog, CatalogError};

/// Mock implementation of the BookCatalog trait, keyed by ASIN.
pub struct MockBookCatalog {
    books: Arc<RwLock<HashMap<String, Book>>>,
    lookups: Arc<RwLock<Vec<(String, AudibleRegion)>>>,
}

impl Default for MockBookCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBookCatalog {
    pub fn new() -> Self {
        Self {
            books: Arc::new(RwLock::new(HashMap::new())),
            lookups: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn add_book(&self, book: Book) {
        self.books.write().await.insert(book.asin.clone(), book);
    }

    /// ASIN and region of every lookup, in order.
    pub async fn recorded_lookups(&self) -> Vec<(String, AudibleRegion)> {
        self.lookups.read().await.clone()
    }
}

#[async_trait]
impl BookCatalog for MockBookCatalog {
    fn name(&self) -> &str {
        "mock"
    }

    async fn get_book(&self, asin: &str, region: AudibleRegion) -> Result<Book, CatalogError> {
        self.lookups.write().await.push((asin.to_string(), region));
        self.books
            .read()
            .await
            .get(asin)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(asin.to_string()))
    }
}
