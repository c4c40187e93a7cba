//! Application state management
//!
//! This module provides the shared application state that is passed
//! to all request handlers via Axum's state extraction.
//!
//! Everything in here is built once during startup and is read-only while
//! requests are served.

use crate::config::AppConfig;
use crate::repositories::Store;
use crate::schema::Schema;
use std::sync::Arc;

/// Shared application state
///
/// All fields are `Arc`s, so cloning into each handler is O(1).
#[derive(Clone)]
pub struct AppState {
    /// Entity store the route groups read and write through
    pub store: Arc<dyn Store>,
    /// Schema handle produced by startup initialization
    pub schema: Arc<Schema>,
    /// Application configuration
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Create a new application state
    pub fn new(store: Arc<dyn Store>, schema: Arc<Schema>, config: AppConfig) -> Self {
        Self {
            store,
            schema,
            config: Arc::new(config),
        }
    }

    /// Get a reference to the store
    #[inline]
    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    /// Get a reference to the configuration
    #[inline]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    #[inline]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }
}
