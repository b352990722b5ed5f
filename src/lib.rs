//! Libris library server
//!
//! Catalog, membership and circulation management for a small library,
//! exposed as a REST JSON API with a server-sent change feed.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

use repository::CatalogStore;
use services::{changes::ChangeFeed, Services};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<Services>,
}

impl AppState {
    /// Wire services over `store` with a fresh change feed
    pub fn new(config: AppConfig, store: Arc<dyn CatalogStore>) -> Self {
        let changes = Arc::new(ChangeFeed::default());
        let services = Services::new(store, changes, &config);
        Self {
            config: Arc::new(config),
            services: Arc::new(services),
        }
    }
}
