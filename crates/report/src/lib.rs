//! Forum summary report service library.
//!
//! Per-user post and reply counts for a course's forums, filtered by forum,
//! date range and group membership. The `forumreport` binary wraps this
//! library in an HTTP server and a command-line exporter.

pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod models;
pub mod routes;
pub mod state;
pub mod summary;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use state::AppState;
