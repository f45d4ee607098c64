use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::error::ConfigError;
use crate::scheduler::WatchSettings;

/// sportcast: live sports event broadcast server
#[derive(Parser, Debug, Clone)]
#[command(name = "sportcast")]
pub struct Config {
    /// HTTP/WebSocket listen address
    #[arg(long, env = "SPORTCAST_LISTEN_ADDR", default_value = "127.0.0.1:8080")]
    pub listen_addr: String,

    /// NHL stats API base URL
    #[arg(long, env = "SPORTCAST_NHL_BASE_URL", default_value = sportcast_sports::nhl::DEFAULT_BASE_URL)]
    pub nhl_base_url: String,

    /// NBA data feed base URL
    #[arg(long, env = "SPORTCAST_NBA_BASE_URL", default_value = sportcast_sports::nba::DEFAULT_BASE_URL)]
    pub nba_base_url: String,

    /// Directory for JSONL snapshot archives (archival disabled when unset)
    #[arg(long, env = "SPORTCAST_ARCHIVE_DIR")]
    pub archive_dir: Option<PathBuf>,

    /// Seconds between schedule discovery runs
    #[arg(long, env = "SPORTCAST_DISCOVERY_INTERVAL_SECS", default_value = "3600")]
    pub discovery_interval_secs: u64,

    /// Seconds between play-by-play polls of a live event
    #[arg(long, env = "SPORTCAST_POLL_INTERVAL_SECS", default_value = "20")]
    pub poll_interval_secs: u64,

    /// Bound on a single client write, and on client silence before a keepalive ping
    #[arg(long, env = "SPORTCAST_IO_TIMEOUT_SECS", default_value = "15")]
    pub io_timeout_secs: u64,

    /// Provider HTTP request timeout
    #[arg(long, env = "SPORTCAST_PROVIDER_TIMEOUT_SECS", default_value = "10")]
    pub provider_timeout_secs: u64,

    /// Emit JSON logs
    #[arg(long, env = "SPORTCAST_LOG_JSON", default_value_t = false)]
    pub log_json: bool,
}

fn non_zero(secs: u64, name: &'static str) -> Result<Duration, ConfigError> {
    if secs == 0 {
        return Err(ConfigError::ZeroDuration(name));
    }
    Ok(Duration::from_secs(secs))
}

impl Config {
    pub fn watch_settings(&self) -> Result<WatchSettings, ConfigError> {
        Ok(WatchSettings {
            discovery_interval: non_zero(self.discovery_interval_secs, "discovery interval")?,
            poll_interval: non_zero(self.poll_interval_secs, "poll interval")?,
        })
    }

    pub fn io_timeout(&self) -> Result<Duration, ConfigError> {
        non_zero(self.io_timeout_secs, "io timeout")
    }

    pub fn provider_timeout(&self) -> Result<Duration, ConfigError> {
        non_zero(self.provider_timeout_secs, "provider timeout")
    }
}
