//! Forum summary report server and command-line tool.

use std::io::Write;
use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::http::{HeaderValue, Method};
use clap::{Parser, Subcommand};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use forumreport::export::{Dataset, ExportFormat};
use forumreport::summary::{SortColumn, SortDirection, SummaryRequest};
use forumreport::{AppState, Config, db, routes};

#[derive(Parser)]
#[command(name = "forumreport", about = "Forum summary report service", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default).
    Serve,

    /// Apply database migrations and exit.
    Migrate,

    /// Write the full summary report to stdout.
    Export {
        /// Course to report on.
        #[arg(long, default_value_t = 0)]
        course: i64,

        /// Narrow the report to one forum.
        #[arg(long, default_value_t = 0)]
        forum: i64,

        /// Only include members of these groups (repeatable).
        #[arg(long = "group")]
        groups: Vec<i64>,

        /// Count posts created at or after this Unix timestamp.
        #[arg(long)]
        from: Option<i64>,

        /// Count posts created at or before this Unix timestamp.
        #[arg(long)]
        to: Option<i64>,

        /// Sort column.
        #[arg(long, default_value = "fullname")]
        sort: String,

        /// Sort direction.
        #[arg(long, default_value = "asc")]
        dir: String,

        /// Output format: csv or json.
        #[arg(long, default_value = "csv")]
        format: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing();

    let cli = Cli::parse();

    // Load configuration from environment
    let config = Config::from_env().context("failed to load configuration")?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Migrate => migrate(config).await,
        Command::Export {
            course,
            forum,
            groups,
            from,
            to,
            sort,
            dir,
            format,
        } => {
            let request = SummaryRequest {
                course_id: course,
                forum_id: forum,
                groups,
                date_from: from,
                date_to: to,
                sort_column: sort.parse::<SortColumn>()?,
                sort_direction: dir.parse::<SortDirection>()?,
                ..Default::default()
            };
            export(config, request, format.parse::<ExportFormat>()?).await
        }
    }
}

async fn serve(config: Config) -> Result<()> {
    info!(port = config.port, "Starting forum summary report server");

    let state = AppState::new(&config)
        .await
        .context("failed to initialize application state")?;

    let cors = build_cors_layer(&config);

    let app = routes::router()
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("failed to bind to address")?;

    info!(%addr, "Server listening");

    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}

async fn migrate(config: Config) -> Result<()> {
    let pool = db::create_pool(&config).await?;
    db::run_migrations(&pool).await?;
    info!("Migrations applied");
    Ok(())
}

async fn export(config: Config, request: SummaryRequest, format: ExportFormat) -> Result<()> {
    let state = AppState::new(&config)
        .await
        .context("failed to initialize application state")?;

    let rows = state.summary().export_rows(&request).await?;
    let body = Dataset::from_report_rows(&rows).render(format)?;

    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(body.as_bytes())
        .context("failed to write report")?;
    stdout.flush().context("failed to flush report")?;

    Ok(())
}

fn build_cors_layer(config: &Config) -> CorsLayer {
    let methods = [Method::GET, Method::POST, Method::OPTIONS];

    if config.cors_allowed_origins.len() == 1 && config.cors_allowed_origins[0] == "*" {
        CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods(methods)
            .allow_headers(tower_http::cors::Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .cors_allowed_origins
            .iter()
            .filter_map(|o| match o.parse::<HeaderValue>() {
                Ok(v) => Some(v),
                Err(_) => {
                    warn!(origin = %o, "ignoring unparseable CORS origin");
                    None
                }
            })
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(tower_http::cors::Any)
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug,sqlx=warn"));

    // Logs go to stderr so exports written to stdout stay clean
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
