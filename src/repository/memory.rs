//! Process-local book store, used by the `memory` backend and in tests

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{error::AppResult, models::BookEntity};

use super::BookStore;

/// Rows are kept ordered by ISBN so author queries come back in the same
/// order as from PostgreSQL.
#[derive(Default)]
pub struct InMemoryBookStore {
    rows: RwLock<BTreeMap<String, BookEntity>>,
}

impl InMemoryBookStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `rows`
    pub fn with_rows(rows: impl IntoIterator<Item = BookEntity>) -> Self {
        let rows = rows
            .into_iter()
            .map(|row| (row.isbn.clone(), row))
            .collect();
        Self {
            rows: RwLock::new(rows),
        }
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }
}

#[async_trait]
impl BookStore for InMemoryBookStore {
    async fn find_by_isbn(&self, isbn: &str) -> AppResult<Option<BookEntity>> {
        Ok(self.rows.read().await.get(isbn).cloned())
    }

    async fn find_all_by_author(&self, author: Option<String>) -> AppResult<Vec<BookEntity>> {
        let rows = self.rows.read().await;
        Ok(rows
            .values()
            .filter(|row| author.as_deref().map_or(true, |a| row.author == a))
            .cloned()
            .collect())
    }

    async fn save(&self, entity: BookEntity) -> AppResult<BookEntity> {
        self.rows
            .write()
            .await
            .insert(entity.isbn.clone(), entity.clone());
        Ok(entity)
    }

    async fn delete(&self, entity: &BookEntity) -> AppResult<()> {
        self.rows.write().await.remove(&entity.isbn);
        Ok(())
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}
