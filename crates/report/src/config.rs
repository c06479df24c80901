//! Configuration loaded from environment variables.

use std::env;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::summary::{DEFAULT_PAGE_SIZE, DEFAULT_STATEMENT_TIMEOUT, MAX_PAGE_SIZE};

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port (default: 3000).
    pub port: u16,

    /// PostgreSQL connection URL.
    pub database_url: String,

    /// Maximum database connections in pool (default: 10).
    pub database_max_connections: u32,

    /// Rows per report page when the request does not say (default: 25).
    pub report_default_per_page: u32,

    /// Largest page size a request may ask for (default: 500).
    pub report_max_per_page: u32,

    /// Per-statement timeout for report queries (default: 10s).
    pub report_statement_timeout: Duration,

    /// CORS allowed origins (comma-separated, default: "*").
    pub cors_allowed_origins: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .context("PORT must be a valid u16")?;

        let database_url =
            env::var("DATABASE_URL").context("DATABASE_URL environment variable is required")?;

        let database_max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .context("DATABASE_MAX_CONNECTIONS must be a valid u32")?;

        let report_default_per_page = env::var("REPORT_DEFAULT_PER_PAGE")
            .unwrap_or_else(|_| DEFAULT_PAGE_SIZE.to_string())
            .parse()
            .context("REPORT_DEFAULT_PER_PAGE must be a valid u32")?;

        let report_max_per_page = env::var("REPORT_MAX_PER_PAGE")
            .unwrap_or_else(|_| MAX_PAGE_SIZE.to_string())
            .parse()
            .context("REPORT_MAX_PER_PAGE must be a valid u32")?;

        let timeout_secs: u64 = env::var("REPORT_STATEMENT_TIMEOUT_SECS")
            .unwrap_or_else(|_| DEFAULT_STATEMENT_TIMEOUT.as_secs().to_string())
            .parse()
            .context("REPORT_STATEMENT_TIMEOUT_SECS must be a valid u64")?;

        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
            .unwrap_or_else(|_| vec!["*".to_string()]);

        Ok(Self {
            port,
            database_url,
            database_max_connections,
            report_default_per_page,
            report_max_per_page,
            report_statement_timeout: Duration::from_secs(timeout_secs),
            cors_allowed_origins,
        })
    }
}
