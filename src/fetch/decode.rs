use chrono::{DateTime, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::AppError;

use super::{Candle, FetchResult, ProviderQuote};

#[derive(Debug, Deserialize)]
pub struct ChartEnvelope {
    pub chart: ChartBody,
}

#[derive(Debug, Deserialize)]
pub struct ChartBody {
    #[serde(default)]
    pub result: Option<Vec<ChartResult>>,
    #[serde(default)]
    pub error: Option<ProviderErrorBody>,
}

#[derive(Debug, Deserialize)]
pub struct ProviderErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChartResult {
    pub meta: ChartMeta,
    #[serde(default)]
    pub timestamp: Vec<i64>,
    #[serde(default)]
    pub indicators: Indicators,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMeta {
    #[serde(default)]
    pub regular_market_price: Option<f64>,
    #[serde(default)]
    pub regular_market_time: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Indicators {
    #[serde(default)]
    pub quote: Vec<QuoteSeries>,
}

#[derive(Debug, Default, Deserialize)]
pub struct QuoteSeries {
    #[serde(default)]
    pub open: Vec<Option<f64>>,
    #[serde(default)]
    pub high: Vec<Option<f64>>,
    #[serde(default)]
    pub low: Vec<Option<f64>>,
    #[serde(default)]
    pub close: Vec<Option<f64>>,
    #[serde(default)]
    pub volume: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
pub struct QuoteSummaryEnvelope {
    #[serde(rename = "quoteSummary")]
    pub quote_summary: QuoteSummaryBody,
}

#[derive(Debug, Deserialize)]
pub struct QuoteSummaryBody {
    #[serde(default)]
    pub result: Option<Vec<QuoteSummaryResult>>,
}

#[derive(Debug, Deserialize)]
pub struct QuoteSummaryResult {
    #[serde(rename = "defaultKeyStatistics", default)]
    pub default_key_statistics: Option<KeyStatistics>,
}

#[derive(Debug, Deserialize)]
pub struct KeyStatistics {
    #[serde(rename = "sharesOutstanding", default)]
    pub shares_outstanding: Option<RawNumber>,
}

#[derive(Debug, Deserialize)]
pub struct RawNumber {
    #[serde(default)]
    pub raw: Option<f64>,
}

impl ChartEnvelope {
    /// Take the first chart result, mapping an empty answer to `DataUnavailable`.
    pub fn into_result(self, ticker: &str) -> FetchResult<ChartResult> {
        let reason = self
            .chart
            .error
            .as_ref()
            .and_then(|err| err.description.clone().or_else(|| err.code.clone()))
            .unwrap_or_else(|| "empty chart result".to_string());

        self.chart
            .result
            .and_then(|results| results.into_iter().next())
            .ok_or_else(|| AppError::unavailable(ticker, reason))
    }
}

impl QuoteSummaryEnvelope {
    pub fn shares_outstanding(&self) -> Option<f64> {
        self.quote_summary
            .result
            .as_ref()?
            .first()?
            .default_key_statistics
            .as_ref()?
            .shares_outstanding
            .as_ref()?
            .raw
            .filter(|shares| shares.is_finite() && *shares > 0.0)
    }
}

pub fn timestamp_to_utc(seconds: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(seconds, 0)
}

pub fn to_decimal(ticker: &str, field: &str, value: f64) -> FetchResult<Decimal> {
    Decimal::from_f64(value).ok_or_else(|| {
        AppError::provider(format!("{ticker}: `{field}` value {value} is not a finite price"))
    })
}

/// Rows with any missing or non-finite price are skipped; a missing volume counts as zero.
pub fn decode_candles(result: &ChartResult) -> Vec<Candle> {
    let Some(series) = result.indicators.quote.first() else {
        return Vec::new();
    };

    let price = |column: &[Option<f64>], idx: usize| -> Option<f64> {
        column
            .get(idx)
            .copied()
            .flatten()
            .filter(|value| value.is_finite())
    };

    let mut candles: Vec<Candle> = result
        .timestamp
        .iter()
        .enumerate()
        .filter_map(|(idx, seconds)| {
            Some(Candle {
                timestamp: timestamp_to_utc(*seconds)?,
                open: price(&series.open, idx)?,
                high: price(&series.high, idx)?,
                low: price(&series.low, idx)?,
                close: price(&series.close, idx)?,
                volume: price(&series.volume, idx).unwrap_or(0.0),
            })
        })
        .collect();

    candles.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
    candles
}

/// Map the last sessions of a chart onto a quote.
///
/// Session OHLC comes from the newest candle. The previous close is the candle
/// before it; a lone candle falls back to the last price.
pub fn quote_from_chart(ticker: &str, result: &ChartResult) -> FetchResult<ProviderQuote> {
    let candles = decode_candles(result);
    let Some(session) = candles.last() else {
        return Err(AppError::unavailable(ticker, "no trading sessions returned"));
    };

    let last_price = result
        .meta
        .regular_market_price
        .filter(|price| price.is_finite())
        .unwrap_or(session.close);
    let last_trade_time = result
        .meta
        .regular_market_time
        .and_then(timestamp_to_utc)
        .unwrap_or(session.timestamp);
    let previous_close = candles
        .len()
        .checked_sub(2)
        .and_then(|idx| candles.get(idx))
        .map(|candle| candle.close)
        .unwrap_or(last_price);

    Ok(ProviderQuote {
        ticker: ticker.to_string(),
        open: to_decimal(ticker, "open", session.open)?,
        high: to_decimal(ticker, "high", session.high)?,
        low: to_decimal(ticker, "low", session.low)?,
        close: to_decimal(ticker, "close", session.close)?,
        last_price: to_decimal(ticker, "last_price", last_price)?,
        previous_day_price: to_decimal(ticker, "previous_day_price", previous_close)?,
        last_trade_time,
        shares_outstanding: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn chart(json: serde_json::Value) -> ChartResult {
        let envelope: ChartEnvelope = serde_json::from_value(json).expect("chart decodes");
        envelope.into_result("TEST").expect("chart has a result")
    }

    #[test]
    fn skips_null_rows_and_sorts() {
        let result = chart(serde_json::json!({
            "chart": { "result": [{
                "meta": { "symbol": "TEST" },
                "timestamp": [1704326400, 1704153600, 1704240000],
                "indicators": { "quote": [{
                    "open":   [12.0, 10.0, null],
                    "high":   [12.5, 10.5, 11.5],
                    "low":    [11.5,  9.5, 10.5],
                    "close":  [12.2, 10.2, 11.2],
                    "volume": [null, 1000, 1100]
                }]}
            }], "error": null }
        }));

        let candles = decode_candles(&result);
        assert_eq!(candles.len(), 2);
        assert!(candles[0].timestamp < candles[1].timestamp);
        assert_eq!(candles[0].open, 10.0);
        assert_eq!(candles[1].volume, 0.0);
    }

    #[test]
    fn meta_reads_only_market_fields() {
        let meta: ChartMeta = serde_json::from_value(serde_json::json!({
            "symbol": "PETR4.SA",
            "currency": "BRL",
            "exchangeName": "SAO",
            "regularMarketPrice": 37.12
        }))
        .unwrap();

        assert_eq!(meta.regular_market_price, Some(37.12));
        assert_eq!(meta.regular_market_time, None);
    }

    #[test]
    fn meta_overrides_last_candle_when_present() {
        let result = chart(serde_json::json!({
            "chart": { "result": [{
                "meta": { "regularMarketPrice": 151.5, "regularMarketTime": 1704300000 },
                "timestamp": [1704153600, 1704240000],
                "indicators": { "quote": [{
                    "open": [149.0, 150.0], "high": [150.5, 152.0],
                    "low": [148.0, 149.0], "close": [150.0, 151.0],
                    "volume": [10, 20]
                }]}
            }]}
        }));

        let quote = quote_from_chart("AAPL", &result).expect("quote maps");
        assert_eq!(quote.open, dec!(150));
        assert_eq!(quote.close, dec!(151));
        assert_eq!(quote.last_price, dec!(151.5));
        assert_eq!(quote.previous_day_price, dec!(150));
        assert_eq!(quote.last_trade_time.timestamp(), 1704300000);
        assert_eq!(quote.shares_outstanding, None);
    }

    #[test]
    fn single_session_falls_back_to_last_price() {
        let result = chart(serde_json::json!({
            "chart": { "result": [{
                "meta": {},
                "timestamp": [1704153600],
                "indicators": { "quote": [{
                    "open": [9.0], "high": [9.5], "low": [8.5], "close": [9.25], "volume": [5]
                }]}
            }]}
        }));

        let quote = quote_from_chart("ONE", &result).expect("quote maps");
        assert_eq!(quote.last_price, dec!(9.25));
        assert_eq!(quote.previous_day_price, quote.last_price);
        assert_eq!(quote.last_trade_time.timestamp(), 1704153600);
    }

    #[test]
    fn empty_chart_is_data_unavailable() {
        let envelope: ChartEnvelope = serde_json::from_value(serde_json::json!({
            "chart": { "result": null, "error": { "code": "Not Found", "description": "No data found, symbol may be delisted" } }
        }))
        .unwrap();
        let err = envelope.into_result("ZZZZINVALID").unwrap_err();
        assert!(err.is_data_unavailable());
        assert!(err.to_string().contains("delisted"));

        let result = chart(serde_json::json!({
            "chart": { "result": [{ "meta": {}, "indicators": { "quote": [{}] } }] }
        }));
        assert!(quote_from_chart("EMPTY", &result).unwrap_err().is_data_unavailable());
    }

    #[test]
    fn reads_shares_outstanding() {
        let summary: QuoteSummaryEnvelope = serde_json::from_value(serde_json::json!({
            "quoteSummary": { "result": [{
                "defaultKeyStatistics": { "sharesOutstanding": { "raw": 1000000, "fmt": "1M" } }
            }], "error": null }
        }))
        .unwrap();
        assert_eq!(summary.shares_outstanding(), Some(1_000_000.0));

        let missing: QuoteSummaryEnvelope = serde_json::from_value(serde_json::json!({
            "quoteSummary": { "result": [{ "defaultKeyStatistics": { "sharesOutstanding": {} } }] }
        }))
        .unwrap();
        assert_eq!(missing.shares_outstanding(), None);
    }
}
