//! Booktable Server binary.

use booktable_server::config::Config;
use booktable_server::db;
use booktable_server::repository::{BookRepository, MemoryRepository, PgRepository};
use booktable_server::AppState;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "booktable_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing::info!("Starting Booktable Server on {}:{}", config.host, config.port);

    let repo: Arc<dyn BookRepository> = match &config.database_url {
        Some(url) => {
            let pool = db::create_pool(url).await?;

            tracing::info!("Running database migrations...");
            db::run_migrations(&pool).await?;

            Arc::new(PgRepository::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; records are kept in memory only");
            Arc::new(MemoryRepository::new())
        }
    };

    let addr = format!("{}:{}", config.host, config.port);
    let app = booktable_server::app(AppState::new(repo, config));

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
