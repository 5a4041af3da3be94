//! In-memory book cache keyed by ISBN
//!
//! Entries never expire and the map has no capacity bound: a book stays
//! cached until it is removed explicitly or the cache is cleared.

use dashmap::DashMap;

use crate::{
    error::{AppError, AppResult},
    models::Book,
};

#[derive(Default)]
pub struct BookCache {
    entries: DashMap<String, Book>,
}

impl BookCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `book` under `isbn`, returning the value it replaced
    pub fn put(&self, isbn: &str, book: Book) -> AppResult<Option<Book>> {
        if isbn.is_empty() {
            return Err(AppError::Validation("Cache key (ISBN) must not be empty".to_string()));
        }
        Ok(self.entries.insert(isbn.to_string(), book))
    }

    pub fn get(&self, isbn: &str) -> Option<Book> {
        self.entries.get(isbn).map(|entry| entry.value().clone())
    }

    /// Snapshot of every cached book, in no particular order
    pub fn get_all(&self) -> Vec<Book> {
        self.entries.iter().map(|entry| entry.value().clone()).collect()
    }

    pub fn remove(&self, isbn: &str) -> Option<Book> {
        self.entries.remove(isbn).map(|(_, book)| book)
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
