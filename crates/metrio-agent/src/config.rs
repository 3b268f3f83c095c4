use anyhow::{Context, Result};
use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "metrio-agent", about = "system metrics collection agent")]
pub struct AgentConfig {
    /// Server address to report to.
    #[arg(short = 'a', long, default_value = "localhost:8080")]
    pub address: String,

    /// Seconds between snapshot reports.
    #[arg(short = 'r', long, default_value_t = 10)]
    pub report_interval: u64,

    /// Seconds between sample polls.
    #[arg(short = 'p', long, default_value_t = 2)]
    pub poll_interval: u64,

    /// Number of sender pool workers.
    #[arg(short = 'l', long, default_value_t = 3)]
    pub rate_limit: usize,

    /// Shared signing key; request bodies are signed when set.
    #[arg(short = 'k', long)]
    pub key: Option<String>,
}

impl AgentConfig {
    /// Parses command-line flags, then applies environment overrides.
    /// Environment variables take precedence over flags.
    pub fn load() -> Result<Self> {
        let mut config = Self::parse();
        if let Ok(value) = std::env::var("ADDRESS") {
            config.address = value;
        }
        if let Ok(value) = std::env::var("REPORT_INTERVAL") {
            config.report_interval = value.parse().context("REPORT_INTERVAL must be seconds")?;
        }
        if let Ok(value) = std::env::var("POLL_INTERVAL") {
            config.poll_interval = value.parse().context("POLL_INTERVAL must be seconds")?;
        }
        if let Ok(value) = std::env::var("RATE_LIMIT") {
            config.rate_limit = value.parse().context("RATE_LIMIT must be a worker count")?;
        }
        if let Ok(value) = std::env::var("KEY") {
            config.key = Some(value);
        }
        if config.report_interval < config.poll_interval {
            anyhow::bail!(
                "report interval ({}s) must not be shorter than poll interval ({}s)",
                config.report_interval,
                config.poll_interval
            );
        }
        Ok(config)
    }
}
