//! Per-ISBN mutual exclusion for borrow and return
//!
//! Each operation kind has its own registry mapping an ISBN to an async mutex.
//! Entries are created on first use and dropped again once the last holder or
//! waiter for that ISBN is gone, so the registries only ever hold books that
//! are being worked on right now.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::config::LockMode;

type Registry = Arc<DashMap<String, Arc<Mutex<()>>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockKind {
    Borrow,
    Return,
}

pub struct BorrowReturnCoordinator {
    mode: LockMode,
    borrow_locks: Registry,
    return_locks: Registry,
}

impl BorrowReturnCoordinator {
    pub fn new(mode: LockMode) -> Self {
        Self {
            mode,
            borrow_locks: Arc::new(DashMap::new()),
            return_locks: Arc::new(DashMap::new()),
        }
    }

    pub fn mode(&self) -> LockMode {
        self.mode
    }

    fn registry(&self, kind: LockKind) -> &Registry {
        match (self.mode, kind) {
            (LockMode::Unified, _) | (LockMode::Split, LockKind::Borrow) => &self.borrow_locks,
            (LockMode::Split, LockKind::Return) => &self.return_locks,
        }
    }

    /// Wait for exclusive hold of `isbn` for the given operation kind.
    ///
    /// The hold lasts until the returned guard is dropped.
    pub async fn acquire(&self, kind: LockKind, isbn: &str) -> IsbnLockGuard {
        let mut held = IsbnLockGuard {
            registry: Arc::clone(self.registry(kind)),
            isbn: isbn.to_string(),
            guard: None,
        };

        // The shard lock is held while cloning, which keeps this atomic with
        // the strong-count check made on release.
        let lock = Arc::clone(
            &*held
                .registry
                .entry(held.isbn.clone())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        );

        tracing::trace!(isbn, ?kind, "Waiting for book lock");
        held.guard = Some(lock.lock_owned().await);
        held
    }

    /// Number of ISBNs currently held or awaited for `kind`
    pub fn pending(&self, kind: LockKind) -> usize {
        self.registry(kind).len()
    }
}

/// Exclusive hold on one ISBN. Releases the lock on drop and removes the
/// registry entry unless another caller is still holding or waiting on it.
pub struct IsbnLockGuard {
    registry: Registry,
    isbn: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl IsbnLockGuard {
    pub fn isbn(&self) -> &str {
        &self.isbn
    }
}

impl Drop for IsbnLockGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.registry
            .remove_if(&self.isbn, |_, lock| Arc::strong_count(lock) == 1);
    }
}
