use std::{
    collections::HashMap,
    env, fs,
    path::{Path, PathBuf},
};

use chrono::NaiveDate;
use log::debug;
use serde::Deserialize;

use crate::error::{AppError, Context, Result};

use super::{validator, DashboardConfig, HistoryPeriod, ProviderSettings, WatchlistEntry};

pub const DEFAULT_CONFIG_PATH: &str = "assets/configs/dashboard.json";

/// Locate the dashboard config file.
///
/// An explicit path wins and is returned even when it does not exist so the
/// caller gets a read error instead of silent defaults. Otherwise the default
/// location is tried next to the executable, then under the working directory.
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    let mut candidates = Vec::new();
    if let Ok(exe) = env::current_exe() {
        if let Some(dir) = exe.parent() {
            candidates.push(dir.join(DEFAULT_CONFIG_PATH));
        }
    }
    if let Ok(cwd) = env::current_dir() {
        candidates.push(cwd.join(DEFAULT_CONFIG_PATH));
    }

    candidates.into_iter().find(|path| path.is_file())
}

/// Read a JSON config file, layer it over the built-in defaults and validate the result.
pub fn load_dashboard_config(path: &Path) -> Result<DashboardConfig> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read dashboard config at {}", path.display()))?;

    let config = parse_dashboard_config(&json)
        .map_err(|err| AppError::message(format!("{}: {err}", path.display())))?;

    debug!(
        "loaded dashboard config from {} ({} tickers)",
        path.display(),
        config.watchlist.len()
    );
    Ok(config)
}

/// Resolve and load the config, falling back to the built-in defaults when no file exists.
pub fn load_or_builtin(explicit: Option<&Path>) -> Result<(DashboardConfig, Option<PathBuf>)> {
    match resolve_config_path(explicit) {
        Some(path) => {
            let config = load_dashboard_config(&path)?;
            Ok((config, Some(path)))
        }
        None => {
            debug!("no dashboard config file found, using built-in defaults");
            Ok((DashboardConfig::builtin(), None))
        }
    }
}

pub fn parse_dashboard_config(json: &str) -> Result<DashboardConfig> {
    let raw: RawDashboardConfig = serde_json::from_str(json)?;
    let config = raw.apply_onto(DashboardConfig::builtin())?;
    validator::validate_dashboard_config(&config)?;
    Ok(config)
}

#[derive(Debug, Deserialize, Default)]
struct RawDashboardConfig {
    title: Option<String>,
    currency_symbol: Option<String>,
    watchlist: Option<Vec<RawWatchlistEntry>>,
    history_start: Option<String>,
    default_period: Option<HistoryPeriod>,
    watchlist_columns: Option<usize>,
    #[serde(default)]
    provider: RawProviderSettings,
    export_dir: Option<String>,
}

impl RawDashboardConfig {
    fn apply_onto(self, mut config: DashboardConfig) -> Result<DashboardConfig> {
        if let Some(title) = self.title {
            config.title = title;
        }
        if let Some(symbol) = self.currency_symbol {
            config.currency_symbol = symbol;
        }
        if let Some(entries) = self.watchlist {
            config.watchlist = entries
                .into_iter()
                .map(RawWatchlistEntry::into_entry)
                .collect();
        }
        if let Some(start) = self.history_start {
            config.history_start = NaiveDate::parse_from_str(start.trim(), "%Y-%m-%d")?;
        }
        if let Some(period) = self.default_period {
            config.default_period = period;
        }
        if let Some(columns) = self.watchlist_columns {
            config.watchlist_columns = columns;
        }
        if let Some(dir) = self.export_dir {
            if dir.trim().is_empty() {
                return Err(AppError::message("export_dir must not be empty"));
            }
            config.export_dir = PathBuf::from(dir);
        }

        self.provider.apply_onto(&mut config.provider);
        Ok(config)
    }
}

#[derive(Debug, Deserialize)]
struct RawWatchlistEntry {
    ticker: String,
    #[serde(default)]
    name: Option<String>,
}

impl RawWatchlistEntry {
    fn into_entry(self) -> WatchlistEntry {
        let ticker = self.ticker.trim().to_string();
        let name = self
            .name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| ticker.clone());
        WatchlistEntry { name, ticker }
    }
}

#[derive(Debug, Deserialize, Default)]
struct RawProviderSettings {
    chart_base_url: Option<String>,
    summary_base_url: Option<String>,
    timeout_secs: Option<u64>,
    concurrency: Option<usize>,
    headers: Option<HashMap<String, String>>,
}

impl RawProviderSettings {
    fn apply_onto(self, settings: &mut ProviderSettings) {
        if let Some(url) = self.chart_base_url {
            settings.chart_base_url = trim_base_url(url);
        }
        if let Some(url) = self.summary_base_url {
            settings.summary_base_url = trim_base_url(url);
        }
        if let Some(timeout) = self.timeout_secs {
            settings.timeout_secs = timeout;
        }
        if let Some(limit) = self.concurrency {
            settings.concurrency = limit;
        }
        if let Some(headers) = self.headers {
            settings.headers = headers;
        }
    }
}

fn trim_base_url(url: String) -> String {
    url.trim().trim_end_matches('/').to_string()
}
