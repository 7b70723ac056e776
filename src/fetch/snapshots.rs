use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use futures::stream::{self, StreamExt};
use log::{debug, info, warn};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::fetch::{
    ensure_concurrency_limit, Candle, FetchResult, MarketDataProvider, SNAPSHOT_CONCURRENCY_LIMIT,
};

/// Raw provider answer for one ticker, before any derived value is computed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderQuote {
    pub ticker: String,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub last_price: Decimal,
    pub previous_day_price: Decimal,
    pub last_trade_time: DateTime<Utc>,
    pub shares_outstanding: Option<Decimal>,
}

/// Point-in-time price record for a single security.
///
/// Built only through [`normalize`] (or by re-validating an exported row), so
/// `change` always equals `last_price - previous_day_price`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SnapshotRecord")]
pub struct StockSnapshot {
    ticker: String,
    #[serde(with = "rust_decimal::serde::str")]
    open: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    high: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    low: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    close: Decimal,
    last_trade_time: DateTime<Utc>,
    #[serde(with = "rust_decimal::serde::str")]
    last_price: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    previous_day_price: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    change: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    change_pct: Decimal,
    #[serde(default, with = "rust_decimal::serde::str_option")]
    marketcap: Option<Decimal>,
}

impl StockSnapshot {
    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn open(&self) -> Decimal {
        self.open
    }

    pub fn high(&self) -> Decimal {
        self.high
    }

    pub fn low(&self) -> Decimal {
        self.low
    }

    pub fn close(&self) -> Decimal {
        self.close
    }

    pub fn last_trade_time(&self) -> DateTime<Utc> {
        self.last_trade_time
    }

    pub fn last_price(&self) -> Decimal {
        self.last_price
    }

    pub fn previous_day_price(&self) -> Decimal {
        self.previous_day_price
    }

    pub fn change(&self) -> Decimal {
        self.change
    }

    pub fn change_pct(&self) -> Decimal {
        self.change_pct
    }

    /// Absent when the provider did not report shares outstanding.
    pub fn marketcap(&self) -> Option<Decimal> {
        self.marketcap
    }

    pub fn is_down(&self) -> bool {
        self.change_pct.is_sign_negative() && !self.change_pct.is_zero()
    }
}

/// Turn a provider quote into a snapshot, deriving change, change percent and market cap locally.
pub fn normalize(quote: ProviderQuote) -> FetchResult<StockSnapshot> {
    let ProviderQuote {
        ticker,
        open,
        high,
        low,
        close,
        last_price,
        previous_day_price,
        last_trade_time,
        shares_outstanding,
    } = quote;

    if previous_day_price.is_zero() {
        return Err(AppError::unavailable(
            ticker,
            "previous session price is zero, change percent is undefined",
        ));
    }

    let (change, change_pct) = derive_change(&ticker, last_price, previous_day_price)?;
    let marketcap = match shares_outstanding {
        Some(shares) => Some(
            shares
                .checked_mul(last_price)
                .ok_or_else(|| overflow(&ticker, "marketcap"))?,
        ),
        None => None,
    };

    Ok(StockSnapshot {
        ticker,
        open,
        high,
        low,
        close,
        last_trade_time,
        last_price,
        previous_day_price,
        change,
        change_pct,
        marketcap,
    })
}

fn derive_change(
    ticker: &str,
    last_price: Decimal,
    previous_day_price: Decimal,
) -> FetchResult<(Decimal, Decimal)> {
    let change = last_price
        .checked_sub(previous_day_price)
        .ok_or_else(|| overflow(ticker, "change"))?;
    let change_pct = change
        .checked_div(previous_day_price)
        .and_then(|ratio| ratio.checked_mul(dec!(100)))
        .ok_or_else(|| overflow(ticker, "change_pct"))?;
    Ok((change, change_pct))
}

fn overflow(ticker: &str, field: &str) -> AppError {
    AppError::provider(format!("{ticker}: `{field}` overflows decimal range"))
}

/// Flat row shape used when reading exported snapshots back. Decimals are read from
/// their text form so exported values load back unchanged.
#[derive(Debug, Deserialize)]
struct SnapshotRecord {
    ticker: String,
    #[serde(with = "rust_decimal::serde::str")]
    open: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    high: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    low: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    close: Decimal,
    last_trade_time: DateTime<Utc>,
    #[serde(with = "rust_decimal::serde::str")]
    last_price: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    previous_day_price: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    change: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    change_pct: Decimal,
    #[serde(default, with = "rust_decimal::serde::str_option")]
    marketcap: Option<Decimal>,
}

impl TryFrom<SnapshotRecord> for StockSnapshot {
    type Error = AppError;

    fn try_from(record: SnapshotRecord) -> Result<Self, Self::Error> {
        if record.ticker.trim().is_empty() {
            return Err(AppError::message("snapshot row has an empty ticker"));
        }
        if record.previous_day_price.is_zero() {
            return Err(AppError::message(format!(
                "snapshot row for {} has a zero previous price",
                record.ticker
            )));
        }

        let (change, change_pct) =
            derive_change(&record.ticker, record.last_price, record.previous_day_price)?;
        if change != record.change {
            return Err(AppError::message(format!(
                "snapshot row for {} has change {} but prices imply {}",
                record.ticker, record.change, change
            )));
        }
        if change_pct.round_dp(8) != record.change_pct.round_dp(8) {
            return Err(AppError::message(format!(
                "snapshot row for {} has change_pct {} but prices imply {}",
                record.ticker, record.change_pct, change_pct
            )));
        }

        Ok(StockSnapshot {
            ticker: record.ticker,
            open: record.open,
            high: record.high,
            low: record.low,
            close: record.close,
            last_trade_time: record.last_trade_time,
            last_price: record.last_price,
            previous_day_price: record.previous_day_price,
            change,
            change_pct,
            marketcap: record.marketcap,
        })
    }
}

#[derive(Debug)]
pub struct TickerFailure {
    pub ticker: String,
    pub error: AppError,
}

/// Outcome of loading a whole watchlist. Snapshots follow the requested ticker order.
#[derive(Debug, Default)]
pub struct WatchlistLoad {
    pub snapshots: Vec<StockSnapshot>,
    pub histories: HashMap<String, Vec<Candle>>,
    pub failures: Vec<TickerFailure>,
}

impl WatchlistLoad {
    pub fn snapshot(&self, ticker: &str) -> Option<&StockSnapshot> {
        self.snapshots
            .iter()
            .find(|snapshot| snapshot.ticker().eq_ignore_ascii_case(ticker))
    }

    pub fn failure(&self, ticker: &str) -> Option<&AppError> {
        self.failures
            .iter()
            .find(|failure| failure.ticker.eq_ignore_ascii_case(ticker))
            .map(|failure| &failure.error)
    }
}

struct TickerOutcome {
    index: usize,
    ticker: String,
    snapshot: FetchResult<StockSnapshot>,
    history: Option<Vec<Candle>>,
}

/// Fetches snapshots concurrently while exposing a shared progress counter for the UI.
pub struct SnapshotFetcher<P> {
    provider: Arc<P>,
    progress_counter: Arc<AtomicUsize>,
    concurrency_limit: usize,
}

impl<P> Clone for SnapshotFetcher<P> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            progress_counter: Arc::clone(&self.progress_counter),
            concurrency_limit: self.concurrency_limit,
        }
    }
}

impl<P: MarketDataProvider> SnapshotFetcher<P> {
    pub fn new(provider: Arc<P>) -> Self {
        Self::with_concurrency_limit(provider, SNAPSHOT_CONCURRENCY_LIMIT)
    }

    pub fn with_concurrency_limit(provider: Arc<P>, concurrency_limit: usize) -> Self {
        Self {
            provider,
            progress_counter: Arc::new(AtomicUsize::new(0)),
            concurrency_limit: ensure_concurrency_limit(concurrency_limit),
        }
    }

    pub fn provider(&self) -> &Arc<P> {
        &self.provider
    }

    pub fn progress_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.progress_counter)
    }

    /// Fetch and normalize a single ticker. Blank tickers never reach the provider.
    pub async fn fetch_snapshot(&self, ticker: &str) -> FetchResult<StockSnapshot> {
        let ticker = ticker.trim();
        if ticker.is_empty() {
            return Err(AppError::message("ticker symbol must not be empty"));
        }

        debug!("fetching snapshot for {ticker}");
        let quote = self.provider.fetch_quote(ticker).await?;
        normalize(quote)
    }

    /// Fetch snapshot and history for every ticker, independently and with bounded concurrency.
    ///
    /// A failing ticker is recorded in [`WatchlistLoad::failures`]; the call only
    /// errors when no ticker could be loaded at all.
    pub async fn fetch_watchlist(
        &self,
        tickers: &[String],
        history_start: NaiveDate,
        history_end: NaiveDate,
    ) -> FetchResult<WatchlistLoad> {
        let concurrency_limit = self.concurrency_limit;
        let semaphore = Arc::new(tokio::sync::Semaphore::new(concurrency_limit));
        let progress_counter = Arc::clone(&self.progress_counter);

        progress_counter.store(0, Ordering::SeqCst);

        let mut outcomes: Vec<TickerOutcome> = stream::iter(tickers.iter().cloned().enumerate())
            .map(|(index, ticker)| {
                let semaphore = Arc::clone(&semaphore);
                let progress_counter = Arc::clone(&progress_counter);
                async move {
                    let _permit = semaphore.acquire().await;
                    let (snapshot, history) = futures::join!(
                        self.fetch_snapshot(&ticker),
                        self.provider
                            .fetch_history(&ticker, history_start, history_end)
                    );

                    progress_counter.fetch_add(1, Ordering::SeqCst);

                    let history = match history {
                        Ok(candles) => Some(candles),
                        Err(err) => {
                            warn!("history unavailable for {ticker}: {err}");
                            None
                        }
                    };
                    TickerOutcome {
                        index,
                        ticker,
                        snapshot,
                        history,
                    }
                }
            })
            .buffer_unordered(concurrency_limit)
            .collect()
            .await;

        outcomes.sort_by_key(|outcome| outcome.index);

        let mut load = WatchlistLoad::default();
        for outcome in outcomes {
            if let Some(candles) = outcome.history {
                load.histories.insert(outcome.ticker.clone(), candles);
            }
            match outcome.snapshot {
                Ok(snapshot) => load.snapshots.push(snapshot),
                Err(error) => {
                    warn!("snapshot unavailable for {}: {error}", outcome.ticker);
                    load.failures.push(TickerFailure {
                        ticker: outcome.ticker,
                        error,
                    });
                }
            }
        }

        if load.snapshots.is_empty() && !load.failures.is_empty() {
            return Err(load.failures.remove(0).error);
        }

        info!(
            "loaded {} of {} tickers",
            load.snapshots.len(),
            tickers.len()
        );
        Ok(load)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Mutex;

    /// In-memory provider keyed by ticker; unknown tickers are `DataUnavailable`.
    #[derive(Default)]
    pub(crate) struct StaticProvider {
        pub quotes: HashMap<String, ProviderQuote>,
        pub candles: HashMap<String, Vec<Candle>>,
        pub calls: Mutex<Vec<String>>,
    }

    impl MarketDataProvider for StaticProvider {
        async fn fetch_quote(&self, ticker: &str) -> FetchResult<ProviderQuote> {
            self.calls.lock().unwrap().push(ticker.to_string());
            self.quotes
                .get(ticker)
                .cloned()
                .ok_or_else(|| AppError::unavailable(ticker, "unknown symbol"))
        }

        async fn fetch_history(
            &self,
            ticker: &str,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> FetchResult<Vec<Candle>> {
            self.candles
                .get(ticker)
                .cloned()
                .ok_or_else(|| AppError::unavailable(ticker, "no history"))
        }
    }

    pub(crate) fn aapl_quote() -> ProviderQuote {
        ProviderQuote {
            ticker: "AAPL".to_string(),
            open: dec!(150),
            high: dec!(152),
            low: dec!(149),
            close: dec!(151),
            last_price: dec!(151.5),
            previous_day_price: dec!(150),
            last_trade_time: Utc.with_ymd_and_hms(2024, 3, 1, 21, 0, 0).unwrap(),
            shares_outstanding: Some(dec!(1_000_000)),
        }
    }

    fn quote(ticker: &str, last: Decimal, previous: Decimal) -> ProviderQuote {
        ProviderQuote {
            ticker: ticker.to_string(),
            last_price: last,
            previous_day_price: previous,
            shares_outstanding: None,
            ..aapl_quote()
        }
    }

    #[test]
    fn derives_change_percent_and_marketcap() {
        let snapshot = normalize(aapl_quote()).expect("snapshot normalizes");
        assert_eq!(snapshot.ticker(), "AAPL");
        assert_eq!(snapshot.change(), dec!(1.5));
        assert_eq!(snapshot.change_pct(), dec!(1.0));
        assert_eq!(snapshot.marketcap(), Some(dec!(151_500_000)));
        assert_eq!(snapshot.open(), dec!(150));
        assert_eq!(snapshot.high(), dec!(152));
        assert_eq!(snapshot.low(), dec!(149));
        assert_eq!(snapshot.close(), dec!(151));
        assert!(!snapshot.is_down());
    }

    #[test]
    fn change_is_exact_for_awkward_decimals() {
        let cases = [
            (dec!(0.3), dec!(0.1)),
            (dec!(10.07), dec!(10.1)),
            (dec!(33.333), dec!(66.667)),
            (dec!(1), dec!(3)),
        ];
        for (last, previous) in cases {
            let snapshot = normalize(quote("X", last, previous)).unwrap();
            assert_eq!(snapshot.change(), last - previous);
            assert_eq!(snapshot.change_pct(), (last - previous) / previous * dec!(100));
        }
    }

    #[test]
    fn negative_change_is_flagged_down() {
        let snapshot = normalize(quote("DOWN", dec!(9), dec!(10))).unwrap();
        assert_eq!(snapshot.change(), dec!(-1));
        assert_eq!(snapshot.change_pct(), dec!(-10));
        assert!(snapshot.is_down());
        assert_eq!(snapshot.marketcap(), None);
    }

    #[test]
    fn zero_previous_price_is_rejected() {
        let err = normalize(quote("ZERO", dec!(1), dec!(0))).unwrap_err();
        assert!(err.is_data_unavailable(), "unexpected error: {err}");
    }

    #[tokio::test]
    async fn blank_ticker_never_reaches_provider() {
        let provider = Arc::new(StaticProvider::default());
        let fetcher = SnapshotFetcher::new(Arc::clone(&provider));

        let err = fetcher.fetch_snapshot("   ").await.unwrap_err();
        assert!(matches!(err, AppError::Message(_)));
        assert!(provider.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_ticker_is_data_unavailable() {
        let fetcher = SnapshotFetcher::new(Arc::new(StaticProvider::default()));
        let err = fetcher.fetch_snapshot("ZZZZINVALID").await.unwrap_err();
        assert!(err.is_data_unavailable());
    }

    #[tokio::test]
    async fn watchlist_keeps_order_and_reports_failures() {
        let mut provider = StaticProvider::default();
        for (ticker, last) in [("AAA", dec!(11)), ("BBB", dec!(12)), ("CCC", dec!(13))] {
            provider
                .quotes
                .insert(ticker.to_string(), quote(ticker, last, dec!(10)));
        }
        provider.candles.insert("AAA".to_string(), Vec::new());

        let fetcher = SnapshotFetcher::with_concurrency_limit(Arc::new(provider), 2);
        let tickers: Vec<String> = ["CCC", "MISSING", "AAA", "BBB"]
            .iter()
            .map(|t| t.to_string())
            .collect();
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();

        let load = fetcher
            .fetch_watchlist(&tickers, start, end)
            .await
            .expect("partial load succeeds");

        let order: Vec<&str> = load.snapshots.iter().map(|s| s.ticker()).collect();
        assert_eq!(order, vec!["CCC", "AAA", "BBB"]);
        assert_eq!(load.failures.len(), 1);
        assert!(load.failure("missing").unwrap().is_data_unavailable());
        assert!(load.histories.contains_key("AAA"));
        assert!(!load.histories.contains_key("BBB"));
        assert_eq!(load.snapshot("bbb").unwrap().change(), dec!(2));
        assert_eq!(fetcher.progress_counter().load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn watchlist_fails_when_every_ticker_fails() {
        let fetcher = SnapshotFetcher::new(Arc::new(StaticProvider::default()));
        let tickers = vec!["NOPE".to_string(), "NADA".to_string()];
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

        let err = fetcher.fetch_watchlist(&tickers, day, day).await.unwrap_err();
        assert!(err.is_data_unavailable());
        assert!(err.to_string().contains("NOPE"));
    }

    #[test]
    fn snapshot_rows_are_revalidated() {
        let snapshot = normalize(aapl_quote()).unwrap();
        let json = serde_json::to_string(&snapshot).unwrap();
        let back: StockSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);

        let tampered = json.replace("\"change\":\"1.5\"", "\"change\":\"2.5\"");
        assert_ne!(tampered, json);
        assert!(serde_json::from_str::<StockSnapshot>(&tampered).is_err());
    }
}
