//! Business logic services

pub mod cache;
pub mod library;
pub mod locks;

use std::sync::Arc;

use crate::{config::LockingConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub library: library::LibraryService,
}

impl Services {
    /// Create all services with the given repository.
    ///
    /// The cache and lock registries live as long as the returned container.
    pub fn new(repository: Repository, locking: &LockingConfig) -> Self {
        let cache = Arc::new(cache::BookCache::new());
        let locks = Arc::new(locks::BorrowReturnCoordinator::new(locking.mode));

        tracing::debug!("Borrow/return locking mode: {:?}", locks.mode());

        Self {
            library: library::LibraryService::new(repository, cache, locks),
        }
    }
}
