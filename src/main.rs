use tracing_subscriber::EnvFilter;

use vetkb::api::{api_router, AppContext};
use vetkb::config::{self, Config};
use vetkb::db::Database;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("VetKB starting v{}", config::APP_VERSION);

    let config = Config::from_env();
    let db = Database::open(&config.db_path)?;
    let ctx = AppContext::from_config(db, &config)?;

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("listening on {}", config.bind_addr);
    axum::serve(listener, api_router(ctx)).await?;
    Ok(())
}
