use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use murmur::auth::{token, TokenConfig, TokenService};
use murmur::config::{Cli, Config};
use murmur::db;
use murmur::routes;
use murmur::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse CLI args and load config
    let cli = Cli::parse();
    let data_dir = Config::data_dir(&cli);
    std::fs::create_dir_all(&data_dir)?;
    tracing::info!("Data directory: {}", data_dir.display());

    let config = Config::load(&cli)?;

    // Ensure uploads directory exists
    std::fs::create_dir_all(config.uploads_path())?;

    // Initialize database
    let pool = db::create_pool(config.db_path())?;
    db::run_migrations(&pool)?;

    // Token signing secret: configured, or ephemeral for this process
    let secret = match config.auth.token_secret.clone() {
        Some(secret) => secret,
        None => {
            tracing::warn!(
                "No auth.token_secret configured; issued tokens will not survive a restart"
            );
            token::generate_secret()
        }
    };
    let tokens = TokenService::new(&TokenConfig {
        secret,
        ttl_minutes: config.auth.token_ttl_minutes,
    });

    // Build app state and router
    let state = AppState {
        db: pool,
        config: config.clone(),
        tokens: Arc::new(tokens),
    };
    let app = routes::app(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
