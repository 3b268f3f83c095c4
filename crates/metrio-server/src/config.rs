use anyhow::{Context, Result};
use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "metrio-server", about = "metrics collection server")]
pub struct ServerConfig {
    /// Address to listen on.
    #[arg(short = 'a', long, default_value = "localhost:8080")]
    pub address: String,

    /// Seconds between store flushes; zero or negative disables the timer.
    #[arg(short = 'i', long, default_value_t = 300)]
    pub store_interval: i64,

    /// Path of the persisted store image; selects the file backend.
    #[arg(short = 'f', long)]
    pub file_storage_path: Option<String>,

    /// Database DSN; selects the database backend and takes precedence
    /// over the file path.
    #[arg(short = 'd', long)]
    pub database_dsn: Option<String>,

    /// Restore the persisted image before accepting requests.
    #[arg(short = 'r', long, default_value_t = true, action = clap::ArgAction::Set)]
    pub restore: bool,

    /// Shared signing key; request signatures are verified when set.
    #[arg(short = 'k', long)]
    pub key: Option<String>,
}

impl ServerConfig {
    /// Parses command-line flags, then applies environment overrides.
    /// Environment variables take precedence over flags.
    pub fn load() -> Result<Self> {
        let mut config = Self::parse();
        if let Ok(value) = std::env::var("ADDRESS") {
            config.address = value;
        }
        if let Ok(value) = std::env::var("STORE_INTERVAL") {
            config.store_interval = value.parse().context("STORE_INTERVAL must be seconds")?;
        }
        if let Ok(value) = std::env::var("FILE_STORAGE_PATH") {
            config.file_storage_path = Some(value);
        }
        if let Ok(value) = std::env::var("DATABASE_DSN") {
            config.database_dsn = Some(value);
        }
        if let Ok(value) = std::env::var("RESTORE") {
            config.restore = value.parse().context("RESTORE must be true or false")?;
        }
        if let Ok(value) = std::env::var("KEY") {
            config.key = Some(value);
        }
        Ok(config)
    }
}
