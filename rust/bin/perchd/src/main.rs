//! `perchd` — the Perch server binary.
//!
//! Usage:
//!   perchd -c <config-name-or-path> [--listen <addr>]
//!
//! The config name resolves to `/etc/perch/<name>.toml`.
//! If a path with `/` or `.` is given, it's used directly.

mod config;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use clap::Parser;
use tracing::info;

use perch_core::Module;

use config::ServerConfig;

/// Perch server.
#[derive(Parser, Debug)]
#[command(name = "perchd", about = "Perch social-network server")]
struct Cli {
    /// Config name or path to config file.
    #[arg(short = 'c', long = "config", required = true)]
    config: String,

    /// Listen address (overrides the config file).
    #[arg(long = "listen")]
    listen: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    // Load server configuration.
    let config_path = ServerConfig::resolve_path(&cli.config);
    info!("Loading configuration from {}", config_path.display());
    let server_config = ServerConfig::load(&config_path)?;
    let listen = cli.listen.unwrap_or_else(|| server_config.listen.clone());

    // Initialize storage.
    let data_dir = std::path::PathBuf::from(&server_config.storage.data_dir);
    std::fs::create_dir_all(&data_dir)?;

    let core_config = perch_core::ServiceConfig {
        data_dir: Some(data_dir.clone()),
        listen: listen.clone(),
        ..Default::default()
    };

    let sql: Arc<dyn perch_sql::SQLStore> = Arc::new(
        perch_sql::SqliteStore::open(&core_config.resolve_sqlite_path())
            .map_err(|e| anyhow::anyhow!("failed to open SQL store: {}", e))?,
    );
    let blob: Arc<dyn perch_blob::BlobStore> = Arc::new(
        perch_blob::FileStore::open(&core_config.resolve_blob_dir())
            .map_err(|e| anyhow::anyhow!("failed to open blob store: {}", e))?,
    );

    // Mount the social module.
    let social_config = social::service::SocialConfig {
        jwt_secret: server_config.jwt.secret.clone(),
        token_ttl: server_config.jwt.token_ttl_secs,
    };
    let social_module = social::SocialModule::new(sql, blob, social_config)?;
    info!("{} module initialized", social_module.name());

    let app = Router::new()
        .route("/health", get(health))
        .merge(social_module.routes());

    let listener = tokio::net::TcpListener::bind(&listen).await?;
    info!("perchd listening on {}", listen);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health() -> &'static str {
    "ok"
}
