//! Process lifecycle
//!
//! [`start`] builds the store, initializes the schema once, and assembles
//! the application state. [`App::run`] serves until the shutdown future
//! resolves, then releases the store whether serving ended cleanly or not.

use crate::config::{AppConfig, StoreBackend};
use crate::db;
use crate::repositories::{MemoryStore, PgStore, Store};
use crate::routes;
use crate::schema::Schema;
use crate::state::AppState;
use anyhow::{Context, Result};
use axum::Router;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

/// Lifecycle phase of the process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Starting,
    Running,
    Stopping,
}

/// A started application: schema ready, store open, routes registered
pub struct App {
    state: AppState,
    phase: Phase,
}

/// Build the process context and run one-time schema initialization.
pub async fn start(config: AppConfig) -> Result<App> {
    info!(
        project = %config.project.name,
        api_prefix = %config.project.api_prefix,
        phase = ?Phase::Starting,
        "Starting application"
    );

    let (store, schema): (Arc<dyn Store>, Arc<Schema>) = match config.database.backend {
        StoreBackend::Postgres => {
            info!("Connecting to database...");
            let pool = db::connect(&config.database).await?;

            info!("Initializing schema...");
            let schema = match Schema::initialize(&pool).await {
                Ok(schema) => schema,
                Err(e) => {
                    pool.close().await;
                    return Err(e.context("schema initialization failed"));
                }
            };

            (Arc::new(PgStore::new(pool)), schema)
        }
        StoreBackend::Memory => {
            warn!("Using the in-memory store; data is lost on exit");
            (Arc::new(MemoryStore::new()), Arc::new(Schema::declared()))
        }
    };

    info!(backend = store.backend_name(), "Store ready");

    Ok(App {
        state: AppState::new(store, schema, config),
        phase: Phase::Starting,
    })
}

impl App {
    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Router with every route group registered against this app's state
    pub fn router(&self) -> Router {
        routes::create_router(self.state.clone())
    }

    /// Serve on `listener` until `shutdown` resolves.
    ///
    /// The store is closed after the server stops on every path, including
    /// when serving fails.
    pub async fn run<F>(mut self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let router = self.router();
        self.enter(Phase::Running);

        if let Ok(addr) = listener.local_addr() {
            info!(address = %addr, "Server listening");
        }

        let served = axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await;

        if let Err(e) = &served {
            error!(error = %e, "Server stopped with an error");
        }

        self.shutdown().await;
        served.context("server error")
    }

    /// Release resources held by the store
    pub async fn shutdown(&mut self) {
        if self.phase == Phase::Stopping {
            return;
        }
        self.enter(Phase::Stopping);

        self.state.store().close().await;
        info!("Shutdown complete");
    }

    fn enter(&mut self, phase: Phase) {
        info!(from = ?self.phase, to = ?phase, "Lifecycle phase change");
        self.phase = phase;
    }
}
