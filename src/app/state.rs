use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use futures::future::join_all;
use log::info;

use crate::config::DashboardConfig;
use crate::error::Result;
use crate::fetch::{
    FetchResult, MarketDataProvider, SnapshotFetcher, StockSnapshot, WatchlistLoad, YahooProvider,
};
use crate::records::{Records, SnapshotTable};
use crate::utils::today;

/// Runtime pieces built from one config: provider, fetcher and export records.
pub struct SessionState<P> {
    config: Arc<DashboardConfig>,
    fetcher: SnapshotFetcher<P>,
    records: Records,
}

impl SessionState<YahooProvider> {
    pub fn for_yahoo(config: Arc<DashboardConfig>) -> Result<Self> {
        let provider = Arc::new(YahooProvider::new(&config.provider)?);
        Ok(Self::new(config, provider))
    }

    /// Rebuild the HTTP provider when its settings changed, otherwise just swap the config.
    pub fn reconfigure(&mut self, config: Arc<DashboardConfig>) -> Result<()> {
        if config.provider != self.config.provider {
            info!("provider settings changed, rebuilding HTTP client");
            let provider = Arc::new(YahooProvider::new(&config.provider)?);
            self.fetcher = SnapshotFetcher::with_concurrency_limit(provider, config.provider.concurrency);
        }
        self.records = Records::for_config(&config);
        self.config = config;
        Ok(())
    }
}

impl<P: MarketDataProvider> SessionState<P> {
    pub fn new(config: Arc<DashboardConfig>, provider: Arc<P>) -> Self {
        let fetcher = SnapshotFetcher::with_concurrency_limit(provider, config.provider.concurrency);
        let records = Records::for_config(&config);
        Self {
            config,
            fetcher,
            records,
        }
    }

    pub fn config(&self) -> &Arc<DashboardConfig> {
        &self.config
    }

    pub fn provider(&self) -> &Arc<P> {
        self.fetcher.provider()
    }

    pub fn fetcher(&self) -> &SnapshotFetcher<P> {
        &self.fetcher
    }

    pub fn records(&self) -> &Records {
        &self.records
    }

    /// History is always fetched from the configured start up to today.
    pub fn history_window(&self) -> (NaiveDate, NaiveDate) {
        (self.config.history_start, today())
    }

    /// Load every watchlist ticker without any terminal UI.
    pub async fn load_watchlist(&self) -> FetchResult<WatchlistLoad> {
        let (start, end) = self.history_window();
        self.fetcher
            .fetch_watchlist(&self.config.tickers(), start, end)
            .await
    }

    /// Fetch each ticker on its own; one failure never hides the others.
    pub async fn fetch_snapshots(&self, tickers: &[String]) -> Vec<(String, FetchResult<StockSnapshot>)> {
        let results = join_all(tickers.iter().map(|ticker| self.fetcher.fetch_snapshot(ticker))).await;
        tickers.iter().cloned().zip(results).collect()
    }

    /// Fetch the watchlist and write the overview CSV into `output` (or the configured export dir).
    pub async fn export_overview(&self, output: Option<&Path>) -> Result<PathBuf> {
        let load = self.load_watchlist().await?;
        let table = SnapshotTable::new(load.snapshots);
        let path = match output {
            Some(dir) => Records::with_dir(dir).save_overview(&table)?,
            None => self.records.save_overview(&table)?,
        };
        info!("exported {} snapshots to {}", table.len(), path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WatchlistEntry;
    use crate::fetch::snapshots::tests::{aapl_quote, StaticProvider};

    fn session(dir: &Path, tickers: &[&str]) -> SessionState<StaticProvider> {
        let mut config = DashboardConfig::builtin();
        config.watchlist = tickers
            .iter()
            .map(|ticker| WatchlistEntry::new(*ticker, *ticker))
            .collect();
        config.export_dir = dir.to_path_buf();

        let mut provider = StaticProvider::default();
        provider.quotes.insert("AAPL".to_string(), aapl_quote());
        SessionState::new(Arc::new(config), Arc::new(provider))
    }

    #[tokio::test]
    async fn fetch_snapshots_reports_each_ticker() {
        let dir = tempfile::tempdir().unwrap();
        let session = session(dir.path(), &["AAPL"]);
        let tickers = vec!["AAPL".to_string(), "ZZZZINVALID".to_string()];
        let results = session.fetch_snapshots(&tickers).await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, "AAPL");
        assert!(results[0].1.is_ok());
        assert!(results[1].1.as_ref().unwrap_err().is_data_unavailable());
    }

    #[tokio::test]
    async fn export_writes_loadable_overview() {
        let dir = tempfile::tempdir().unwrap();
        let session = session(dir.path(), &["AAPL", "ZZZZINVALID"]);

        let path = session.export_overview(None).await.unwrap();
        assert!(path.starts_with(dir.path()));

        let table = session.records().load_overview(&path).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.data[0].ticker(), "AAPL");

        let other = dir.path().join("elsewhere");
        let path = session.export_overview(Some(&other)).await.unwrap();
        assert!(path.starts_with(&other));
    }
}
