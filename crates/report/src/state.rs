//! Application state shared across all handlers.

use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::PgPool;
use tracing::info;

use crate::config::Config;
use crate::db;
use crate::summary::{QueryExecutor, SummaryService};

/// Shared application state.
///
/// Wrapped in Arc internally so Clone is cheap.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// PostgreSQL connection pool.
    db: PgPool,

    /// Summary report service.
    summary: Arc<SummaryService>,
}

impl AppState {
    /// Connect to the database and build the services.
    pub async fn new(config: &Config) -> Result<Self> {
        let db = db::create_pool(config)
            .await
            .context("failed to create database pool")?;
        info!("Connected to PostgreSQL");

        Ok(Self::from_pool(db, config))
    }

    /// Build state around an existing pool.
    pub fn from_pool(db: PgPool, config: &Config) -> Self {
        let executor = QueryExecutor::new(db.clone(), config.report_statement_timeout);
        let summary = SummaryService::new(
            executor,
            config.report_default_per_page,
            config.report_max_per_page,
        );

        Self {
            inner: Arc::new(AppStateInner { db, summary }),
        }
    }

    /// Get the database pool.
    pub fn db(&self) -> &PgPool {
        &self.inner.db
    }

    /// Get the summary report service.
    pub fn summary(&self) -> &Arc<SummaryService> {
        &self.inner.summary
    }

    /// Check if PostgreSQL is reachable.
    pub async fn postgres_healthy(&self) -> bool {
        db::check_health(&self.inner.db).await
    }
}
