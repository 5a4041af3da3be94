//! Library Server
//!
//! A REST JSON API over a book catalog: add, remove and look up books by
//! ISBN or author, and borrow or return copies. Reads go through an
//! in-memory cache; borrows and returns are serialized per ISBN.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}

impl AppState {
    pub fn new(config: AppConfig, repository: repository::Repository) -> Self {
        let services = services::Services::new(repository, &config.locking);
        Self {
            config: Arc::new(config),
            services: Arc::new(services),
        }
    }
}
