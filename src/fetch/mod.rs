use std::future::Future;

use chrono::NaiveDate;

use crate::error::Result;

pub mod decode;
pub mod history;
pub mod request;
pub mod snapshots;
pub mod yahoo;

pub use history::{
    filter_history, opening_prices, spawn_history_fetch, Candle, HistoryReceiver, PricePoint,
};
pub use snapshots::{
    normalize, ProviderQuote, SnapshotFetcher, StockSnapshot, TickerFailure, WatchlistLoad,
};
pub use yahoo::YahooProvider;

/// Default concurrency guard applied when issuing snapshot requests.
pub const SNAPSHOT_CONCURRENCY_LIMIT: usize = 5;

pub type FetchResult<T> = Result<T>;

#[inline]
pub fn ensure_concurrency_limit(limit: usize) -> usize {
    limit.max(1)
}

/// Upstream source of quotes and daily candles.
///
/// Implementations map "nothing known for this symbol" to
/// [`AppError::DataUnavailable`](crate::error::AppError::DataUnavailable) and
/// every transport or payload failure to
/// [`AppError::Provider`](crate::error::AppError::Provider).
pub trait MarketDataProvider: Send + Sync {
    fn fetch_quote(&self, ticker: &str) -> impl Future<Output = FetchResult<ProviderQuote>> + Send;

    /// Daily candles between `start` and `end` (inclusive), oldest first.
    fn fetch_history(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> impl Future<Output = FetchResult<Vec<Candle>>> + Send;
}
