use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;

use chrono::{DateTime, Duration, Local, NaiveDate, Utc};
use log::debug;

use crate::config::HistoryPeriod;

use super::{FetchResult, MarketDataProvider};

/// One daily session.
#[derive(Debug, Clone, PartialEq)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    pub fn local_date(&self) -> NaiveDate {
        self.timestamp.with_timezone(&Local).date_naive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
}

pub type HistoryReceiver = Receiver<FetchResult<Vec<Candle>>>;

/// Fetch candles on the runtime and hand the result back through a channel the UI can poll.
pub fn spawn_history_fetch<P>(
    provider: Arc<P>,
    ticker: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> HistoryReceiver
where
    P: MarketDataProvider + 'static,
{
    let ticker = ticker.to_string();
    let (tx, rx) = mpsc::channel();

    tokio::spawn(async move {
        debug!("fetching history for {ticker} from {start} to {end}");
        let result = provider.fetch_history(&ticker, start, end).await;
        let _ = tx.send(result);
    });

    rx
}

/// Candles dated from `today - period.days()` through `today`, both ends included.
pub fn filter_history(candles: &[Candle], period: HistoryPeriod, today: NaiveDate) -> Vec<Candle> {
    let since = today - Duration::days(period.days());
    candles
        .iter()
        .filter(|candle| {
            let date = candle.local_date();
            date >= since && date <= today
        })
        .cloned()
        .collect()
}

pub fn opening_prices(candles: &[Candle]) -> Vec<PricePoint> {
    candles
        .iter()
        .map(|candle| PricePoint {
            timestamp: candle.timestamp,
            price: candle.open,
        })
        .collect()
}

#[cfg(test)]
pub(crate) fn candle_on(date: NaiveDate, open: f64, close: f64, volume: f64) -> Candle {
    use chrono::TimeZone;

    let local = Local
        .from_local_datetime(&date.and_hms_opt(12, 0, 0).unwrap())
        .earliest()
        .unwrap();
    Candle {
        timestamp: local.with_timezone(&Utc),
        open,
        high: open.max(close) + 1.0,
        low: open.min(close) - 1.0,
        close,
        volume,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn daily_candles(today: NaiveDate, days: i64) -> Vec<Candle> {
        (0..days)
            .rev()
            .map(|offset| {
                let date = today - Duration::days(offset);
                candle_on(date, offset as f64, offset as f64 + 0.5, 100.0)
            })
            .collect()
    }

    #[test]
    fn filters_by_trailing_period() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
        let candles = daily_candles(today, 400);

        assert_eq!(filter_history(&candles, HistoryPeriod::Weekly, today).len(), 8);
        assert_eq!(filter_history(&candles, HistoryPeriod::Monthly, today).len(), 32);
        assert_eq!(filter_history(&candles, HistoryPeriod::Quarterly, today).len(), 91);
        assert_eq!(filter_history(&candles, HistoryPeriod::Yearly, today).len(), 366);

        let weekly = filter_history(&candles, HistoryPeriod::Weekly, today);
        assert_eq!(weekly.first().map(Candle::local_date), Some(today - Duration::days(7)));
        assert_eq!(weekly.last().map(Candle::local_date), Some(today));
    }

    #[test]
    fn projects_price_points() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let candles = daily_candles(today, 3);
        let opens = opening_prices(&candles);
        assert_eq!(opens.iter().map(|p| p.price).collect::<Vec<_>>(), vec![2.0, 1.0, 0.0]);
        assert_eq!(opens[0].timestamp, candles[0].timestamp);
    }
}
