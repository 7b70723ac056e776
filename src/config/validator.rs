use std::collections::HashSet;

use reqwest::Url;

use crate::error::{AppError, Result};

use super::{DashboardConfig, ProviderSettings, WatchlistEntry};

/// Validate a dashboard config and surface every problem in one error.
pub fn validate_dashboard_config(config: &DashboardConfig) -> Result<()> {
    let mut issues = Vec::new();

    validate_watchlist(&config.watchlist, &mut issues);
    validate_layout(config, &mut issues);
    validate_provider(&config.provider, &mut issues);

    if issues.is_empty() {
        Ok(())
    } else {
        Err(AppError::message(format!(
            "dashboard config invalid:\n  - {}",
            issues.join("\n  - ")
        )))
    }
}

fn validate_watchlist(watchlist: &[WatchlistEntry], issues: &mut Vec<String>) {
    if watchlist.is_empty() {
        issues.push("watchlist must contain at least one ticker".to_string());
        return;
    }

    let mut seen = HashSet::new();
    let mut duplicates = Vec::new();

    for (idx, entry) in watchlist.iter().enumerate() {
        let ticker = entry.ticker.trim();
        if ticker.is_empty() {
            issues.push(format!("watchlist entry {} has a blank ticker", idx + 1));
            continue;
        }
        if ticker.chars().any(char::is_whitespace) {
            issues.push(format!("ticker `{ticker}` must not contain whitespace"));
        }
        if !seen.insert(ticker.to_uppercase()) {
            duplicates.push(ticker.to_string());
        }
    }

    if !duplicates.is_empty() {
        issues.push(format!(
            "watchlist contains duplicate tickers: {}",
            duplicates.join(", ")
        ));
    }
}

fn validate_layout(config: &DashboardConfig, issues: &mut Vec<String>) {
    if config.watchlist_columns < 1 {
        issues.push("watchlist_columns must be at least 1".to_string());
    }
}

fn validate_provider(provider: &ProviderSettings, issues: &mut Vec<String>) {
    validate_base_url("provider.chart_base_url", &provider.chart_base_url, issues);
    validate_base_url(
        "provider.summary_base_url",
        &provider.summary_base_url,
        issues,
    );

    if provider.timeout_secs == 0 {
        issues.push("provider.timeout_secs must be greater than zero".to_string());
    }

    if provider.concurrency < 1 {
        issues.push("provider.concurrency must be at least 1".to_string());
    }

    for name in provider.headers.keys() {
        if name.trim().is_empty() {
            issues.push("provider.headers contains an empty header name".to_string());
        }
    }
}

fn validate_base_url(field: &str, value: &str, issues: &mut Vec<String>) {
    match Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => issues.push(format!(
            "{field} must use http or https, found `{}`",
            url.scheme()
        )),
        Err(err) => issues.push(format!("{field} `{value}` is not a valid URL: {err}")),
    }
}
