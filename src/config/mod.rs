use std::{collections::HashMap, fmt, path::PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub mod loader;
pub mod registry;
pub mod validator;

pub use loader::{load_dashboard_config, resolve_config_path, DEFAULT_CONFIG_PATH};
pub use registry::ConfigRegistry;
pub use validator::validate_dashboard_config;

/// Trailing window shown by the symbol history panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryPeriod {
    Weekly,
    Monthly,
    #[default]
    Quarterly,
    Yearly,
}

impl HistoryPeriod {
    pub const ALL: [HistoryPeriod; 4] = [
        HistoryPeriod::Weekly,
        HistoryPeriod::Monthly,
        HistoryPeriod::Quarterly,
        HistoryPeriod::Yearly,
    ];

    pub fn days(self) -> i64 {
        match self {
            HistoryPeriod::Weekly => 7,
            HistoryPeriod::Monthly => 31,
            HistoryPeriod::Quarterly => 90,
            HistoryPeriod::Yearly => 365,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            HistoryPeriod::Weekly => "Weekly",
            HistoryPeriod::Monthly => "Monthly",
            HistoryPeriod::Quarterly => "Quarterly",
            HistoryPeriod::Yearly => "Yearly",
        }
    }

    fn index(self) -> usize {
        Self::ALL
            .iter()
            .position(|period| *period == self)
            .unwrap_or_default()
    }

    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

impl fmt::Display for HistoryPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchlistEntry {
    pub name: String,
    pub ticker: String,
}

impl WatchlistEntry {
    pub fn new(name: impl Into<String>, ticker: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ticker: ticker.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSettings {
    pub chart_base_url: String,
    pub summary_base_url: String,
    pub timeout_secs: u64,
    pub concurrency: usize,
    pub headers: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardConfig {
    pub title: String,
    pub currency_symbol: String,
    pub watchlist: Vec<WatchlistEntry>,
    pub history_start: NaiveDate,
    pub default_period: HistoryPeriod,
    pub watchlist_columns: usize,
    pub provider: ProviderSettings,
    pub export_dir: PathBuf,
}

impl DashboardConfig {
    pub fn builtin() -> Self {
        let watchlist = [
            ("ITAUSA", "ITSA4.SA"),
            ("BANCO DO BRASIL", "BBAS3.SA"),
            ("BANCO BRADESCO", "BBDC4.SA"),
            ("COPASA", "CSMG3.SA"),
            ("SANEPAR", "SAPR11.SA"),
            ("TAESA", "TAEE11.SA"),
            ("CEMIG", "CMIG4.SA"),
            ("BB SEGURIDADE", "BBSE3.SA"),
            ("PORTO SEGURO", "PSSA3.SA"),
            ("PETROBRAS", "PETR4.SA"),
        ]
        .into_iter()
        .map(|(name, ticker)| WatchlistEntry::new(name, ticker))
        .collect();

        let headers = HashMap::from([
            (
                "User-Agent".to_string(),
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36".to_string(),
            ),
            ("Accept-Language".to_string(), "en-US,en;q=0.9".to_string()),
        ]);

        Self {
            title: "Stock Dashboard".to_string(),
            currency_symbol: "R$".to_string(),
            watchlist,
            history_start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default(),
            default_period: HistoryPeriod::Quarterly,
            watchlist_columns: 4,
            provider: ProviderSettings {
                chart_base_url: "https://query1.finance.yahoo.com".to_string(),
                summary_base_url: "https://query2.finance.yahoo.com".to_string(),
                timeout_secs: 10,
                concurrency: 5,
                headers,
            },
            export_dir: PathBuf::from("assets/exports"),
        }
    }

    pub fn tickers(&self) -> Vec<String> {
        self.watchlist
            .iter()
            .map(|entry| entry.ticker.clone())
            .collect()
    }

    /// Display name for a ticker, falling back to the ticker itself.
    pub fn display_name<'a>(&'a self, ticker: &'a str) -> &'a str {
        self.watchlist
            .iter()
            .find(|entry| entry.ticker.eq_ignore_ascii_case(ticker))
            .map(|entry| entry.name.as_str())
            .unwrap_or(ticker)
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self::builtin()
    }
}
