use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use metrio_server::config::ServerConfig;
use metrio_server::persistence;
use metrio_server::router::router;
use metrio_server::state::AppState;
use metrio_storage::{FileStore, MemoryStore, MetricStore, SqliteStore};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let config = ServerConfig::load()?;

    // Backend precedence: database DSN, then file path, then memory.
    // Chosen once; static for the process lifetime.
    let store: Arc<dyn MetricStore> = if let Some(dsn) = &config.database_dsn {
        info!(dsn = %dsn, "using database backend");
        Arc::new(SqliteStore::open(dsn)?)
    } else if let Some(path) = &config.file_storage_path {
        info!(path = %path, "using file backend");
        Arc::new(FileStore::new(PathBuf::from(path)))
    } else {
        info!("using memory backend");
        Arc::new(MemoryStore::new())
    };

    if config.restore {
        if let Err(err) = store.restore().await {
            warn!(error = %err, "restore failed, starting empty");
        }
    }

    persistence::spawn_store_timer(Arc::clone(&store), config.store_interval);
    tokio::spawn(persistence::shutdown_flush(Arc::clone(&store)));

    let app = router(AppState {
        store,
        key: config.key.clone(),
    });

    let listener = tokio::net::TcpListener::bind(&config.address).await?;
    info!("metrio server listening on {}", config.address);
    axum::serve(listener, app).await?;

    Ok(())
}
