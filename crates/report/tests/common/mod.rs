#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Common test utilities for integration tests.
//!
//! Database tests talk to a real PostgreSQL named by `DATABASE_URL` and are
//! marked `#[ignore = "requires DATABASE_URL"]`. Run them with:
//!
//! ```text
//! DATABASE_URL=postgres://localhost/forumreport_test cargo test -p forumreport -- --include-ignored
//! ```

#![allow(dead_code)]

use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use http_body_util::BodyExt;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;

use forumreport::summary::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, QueryExecutor, SummaryService};
use forumreport::{AppState, Config, db, routes};

/// Connect to the test database and apply migrations.
///
/// Panics when `DATABASE_URL` is unset.
pub async fn test_pool() -> PgPool {
    dotenvy::dotenv().ok();

    let url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set to run database tests");

    let pool = PgPoolOptions::new()
        .max_connections(4)
        .connect(&url)
        .await
        .expect("Failed to connect to test database");
    db::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    pool
}

/// A pool that never connects, for routes that do not touch the database.
pub fn lazy_pool() -> PgPool {
    PgPoolOptions::new()
        .connect_lazy("postgres://localhost/forumreport_test")
        .expect("Failed to build lazy pool")
}

/// Configuration matching the defaults, pointed at `pool`'s database.
pub fn test_config() -> Config {
    Config {
        port: 0,
        database_url: String::new(),
        database_max_connections: 4,
        report_default_per_page: DEFAULT_PAGE_SIZE,
        report_max_per_page: MAX_PAGE_SIZE,
        report_statement_timeout: Duration::from_secs(10),
        cors_allowed_origins: vec!["*".to_string()],
    }
}

/// Executor using the test pool.
pub fn executor(pool: &PgPool) -> QueryExecutor {
    QueryExecutor::new(pool.clone(), Duration::from_secs(10))
}

/// Summary service using the test pool.
pub fn service(pool: &PgPool) -> std::sync::Arc<SummaryService> {
    SummaryService::new(executor(pool), DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE)
}

/// Test application wrapper using the real routes and state.
pub struct TestApp {
    router: Router,
    pub db: PgPool,
}

impl TestApp {
    pub fn new(pool: PgPool) -> Self {
        let state = AppState::from_pool(pool.clone(), &test_config());
        let router = routes::router()
            .layer(tower_http::trace::TraceLayer::new_for_http())
            .with_state(state);

        Self { router, db: pool }
    }

    /// Send a request to the test application.
    pub async fn request(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request")
    }

    /// GET a path.
    pub async fn get(&self, uri: &str) -> Response {
        self.request(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }

    /// POST a JSON body.
    pub async fn post_json(&self, uri: &str, body: &serde_json::Value) -> Response {
        self.request(
            Request::post(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }
}

/// Collect a response body as a string.
pub async fn body_string(response: Response) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to read body")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("Body is not UTF-8")
}

/// Collect a response body as JSON.
pub async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_str(&body_string(response).await).expect("Body is not JSON")
}
