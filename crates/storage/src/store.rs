//! The key-addressed book store behind the RPC surface.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;

use observer_core::{Book, BookDraft};

use crate::config::StoreConfig;

/// Errors from a [`BookStore`] backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Could not reach the backend.
    #[error("connection error: {0}")]
    Connection(String),

    /// The backend rejected or failed the operation.
    #[error("backend error: {0}")]
    Backend(String),

    /// Unusable store configuration.
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Trait for persisting books.
///
/// Implementations must be `Send + Sync` and safe for concurrent access.
/// Calls run under the ambient execution context of the request; backends
/// may use it for correlation but are not required to propagate it further.
#[async_trait]
pub trait BookStore: Send + Sync {
    /// Fetch a book by id. Returns `None` if no such book is stored.
    async fn get(&self, id: i64) -> Result<Option<Book>, StoreError>;

    /// Insert a new book and return its generated id.
    async fn insert(&self, draft: BookDraft) -> Result<i64, StoreError>;
}

/// In-memory [`BookStore`] backed by a [`DashMap`]. The default backend.
#[derive(Debug, Default)]
pub struct MemoryBookStore {
    books: DashMap<i64, Book>,
    next_id: AtomicI64,
}

impl MemoryBookStore {
    /// Create a new, empty in-memory store.
    pub fn new() -> Self {
        Self {
            books: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }

    /// Create a store pre-loaded with a small fixture shelf, matching the
    /// seed data the service historically started with.
    pub fn seeded() -> Self {
        let store = Self::new();
        for (title, author) in [
            ("ONE", "First Author"),
            ("TWO", "Second Author"),
            ("THREE", "Third Author"),
        ] {
            let id = store.next_id.fetch_add(1, Ordering::Relaxed);
            store.books.insert(
                id,
                Book::from_draft(
                    id,
                    BookDraft {
                        title: title.to_owned(),
                        author: author.to_owned(),
                        price: 0.0,
                        description: String::new(),
                        author_bio: String::new(),
                    },
                ),
            );
        }
        store
    }

    /// Number of books currently stored.
    pub fn len(&self) -> usize {
        self.books.len()
    }

    /// Whether the store holds no books.
    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }
}

#[async_trait]
impl BookStore for MemoryBookStore {
    async fn get(&self, id: i64) -> Result<Option<Book>, StoreError> {
        Ok(self.books.get(&id).map(|entry| entry.clone()))
    }

    async fn insert(&self, draft: BookDraft) -> Result<i64, StoreError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.books.insert(id, Book::from_draft(id, draft));
        Ok(id)
    }
}

/// Construct a [`BookStore`] from configuration.
pub async fn create_store(config: &StoreConfig) -> Result<Arc<dyn BookStore>, StoreError> {
    match config.backend.as_str() {
        "memory" => Ok(Arc::new(MemoryBookStore::seeded())),
        #[cfg(feature = "postgres")]
        "postgres" => {
            let url = config.url.as_deref().ok_or_else(|| {
                StoreError::Configuration("postgres backend requires store.url".to_owned())
            })?;
            let store = crate::postgres::PostgresBookStore::new(url, config.pool_size).await?;
            Ok(Arc::new(store))
        }
        other => Err(StoreError::Configuration(format!(
            "unsupported store backend: {other} (is the feature enabled?)"
        ))),
    }
}
