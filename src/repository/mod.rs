//! Repository layer: durable book storage keyed by ISBN

pub mod books;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{error::AppResult, models::BookEntity};

pub use books::PgBookStore;
pub use memory::InMemoryBookStore;

/// Durable store of book rows, keyed by ISBN
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookStore: Send + Sync {
    /// Get a book row by ISBN
    async fn find_by_isbn(&self, isbn: &str) -> AppResult<Option<BookEntity>>;

    /// Get every row whose author equals `author`.
    ///
    /// `None` leaves the author unconstrained and returns all rows.
    async fn find_all_by_author(&self, author: Option<String>) -> AppResult<Vec<BookEntity>>;

    /// Insert or overwrite the row for `entity.isbn`, returning what was stored
    async fn save(&self, entity: BookEntity) -> AppResult<BookEntity>;

    async fn delete(&self, entity: &BookEntity) -> AppResult<()>;

    /// Check the store is reachable
    async fn ping(&self) -> AppResult<()>;
}

/// Main repository struct holding the configured store
#[derive(Clone)]
pub struct Repository {
    pub books: Arc<dyn BookStore>,
}

impl Repository {
    /// Create a repository backed by PostgreSQL
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            books: Arc::new(PgBookStore::new(pool)),
        }
    }

    /// Create a repository backed by a process-local store
    pub fn in_memory() -> Self {
        Self {
            books: Arc::new(InMemoryBookStore::new()),
        }
    }

    pub fn with_store(books: Arc<dyn BookStore>) -> Self {
        Self { books }
    }
}
