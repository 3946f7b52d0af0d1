use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use monitor_logging::{LogDestination, DEFAULT_LOG_FILE};
use scrape_client::{ClientConfig, DEFAULT_BASE_URL};
use serde::Deserialize;

use crate::cli::{Cli, LogTarget};

pub const CONFIG_FILENAME: &str = "scrape_monitor.ron";

/// Optional overrides read from the RON config file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub api_url: Option<String>,
    pub poll_interval_ms: Option<u64>,
    pub files_refresh_interval_ms: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    pub reconnect_max_attempts: Option<u32>,
    pub output_dir: Option<PathBuf>,
    pub log: Option<LogTarget>,
}

/// Everything resolved once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub client: ClientConfig,
    pub output_dir: PathBuf,
    pub log: LogTarget,
}

impl Settings {
    pub fn log_destination(&self) -> LogDestination {
        let file = PathBuf::from(DEFAULT_LOG_FILE);
        match self.log {
            LogTarget::File => LogDestination::File(file),
            LogTarget::Terminal => LogDestination::Terminal,
            LogTarget::Both => LogDestination::Both(file),
        }
    }
}

/// Reads the config file. `Ok(None)` when there is no file; a file that
/// cannot be read or parsed is an error the caller reports and ignores.
pub fn load_config_file(path: &Path) -> anyhow::Result<Option<ConfigFile>> {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err).with_context(|| format!("failed to read {path:?}")),
    };
    let file = ron::from_str(&content).with_context(|| format!("failed to parse {path:?}"))?;
    Ok(Some(file))
}

/// Flag (or `SCRAPER_API_URL`), then config file, then the built-in default.
pub fn resolve(cli: &Cli, file: ConfigFile) -> anyhow::Result<Settings> {
    let raw_url = cli
        .api_url
        .clone()
        .or(file.api_url)
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    let mut client = ClientConfig::from_base_url(&raw_url)
        .with_context(|| format!("invalid backend URL {raw_url:?}"))?;

    if let Some(ms) = file.poll_interval_ms.filter(|ms| *ms > 0) {
        client.poll_interval = Duration::from_millis(ms);
    }
    if let Some(ms) = file.files_refresh_interval_ms.filter(|ms| *ms > 0) {
        client.files_refresh_interval = Duration::from_millis(ms);
    }
    if let Some(secs) = file.request_timeout_secs.filter(|secs| *secs > 0) {
        client.request_timeout = Duration::from_secs(secs);
    }
    if file.reconnect_max_attempts.is_some() {
        client.reconnect.max_attempts = file.reconnect_max_attempts;
    }

    let output_dir = cli
        .output_dir
        .clone()
        .or(file.output_dir)
        .unwrap_or_else(|| PathBuf::from("."));
    let log = cli.log.or(file.log).unwrap_or(LogTarget::File);

    Ok(Settings {
        client,
        output_dir,
        log,
    })
}

pub fn config_path(cli: &Cli) -> PathBuf {
    cli.config
        .clone()
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILENAME))
}
