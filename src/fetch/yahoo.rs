use chrono::{Duration, NaiveDate, NaiveTime};
use log::debug;
use reqwest::{Client, StatusCode, Url};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

use crate::config::{DashboardConfig, ProviderSettings};
use crate::error::AppError;

use super::decode::{self, ChartEnvelope, ChartResult, QuoteSummaryEnvelope};
use super::request::{build_client, endpoint};
use super::{Candle, FetchResult, MarketDataProvider, ProviderQuote};

/// HTTP provider speaking the Yahoo Finance chart and quote summary APIs.
pub struct YahooProvider {
    client: Client,
    chart_base_url: String,
    summary_base_url: String,
}

impl YahooProvider {
    pub fn new(settings: &ProviderSettings) -> FetchResult<Self> {
        Ok(Self {
            client: build_client(settings)?,
            chart_base_url: settings.chart_base_url.clone(),
            summary_base_url: settings.summary_base_url.clone(),
        })
    }

    /// Point both APIs at one host (used with wiremock in tests).
    pub fn with_base_url(base_url: &str) -> FetchResult<Self> {
        let mut settings = DashboardConfig::builtin().provider;
        settings.chart_base_url = base_url.to_string();
        settings.summary_base_url = base_url.to_string();
        Self::new(&settings)
    }

    async fn get_chart(&self, ticker: &str, query: &[(&str, String)]) -> FetchResult<ChartResult> {
        let url = endpoint(&self.chart_base_url, &["v8", "finance", "chart", ticker])?;
        let body = self.get_text(ticker, url, query).await?;
        let envelope: ChartEnvelope = serde_json::from_str(&body).map_err(|err| {
            AppError::provider(format!("{ticker}: malformed chart response: {err}"))
        })?;
        envelope.into_result(ticker)
    }

    /// Shares outstanding are best-effort; any failure leaves market cap unknown.
    async fn fetch_shares_outstanding(&self, ticker: &str) -> Option<Decimal> {
        let url = match endpoint(
            &self.summary_base_url,
            &["v10", "finance", "quoteSummary", ticker],
        ) {
            Ok(url) => url,
            Err(err) => {
                debug!("skipping shares outstanding for {ticker}: {err}");
                return None;
            }
        };
        let query = [("modules", "defaultKeyStatistics".to_string())];

        let body = match self.get_text(ticker, url, &query).await {
            Ok(body) => body,
            Err(err) => {
                debug!("shares outstanding unavailable for {ticker}: {err}");
                return None;
            }
        };

        serde_json::from_str::<QuoteSummaryEnvelope>(&body)
            .ok()?
            .shares_outstanding()
            .and_then(Decimal::from_f64)
    }

    async fn get_text(&self, ticker: &str, url: Url, query: &[(&str, String)]) -> FetchResult<String> {
        let response = self.client.get(url).query(query).send().await?;
        if let Some(err) = classify_status(ticker, response.status()) {
            return Err(err);
        }
        Ok(response.text().await?)
    }
}

/// 404 means the symbol is unknown; every other non-success status is a provider failure.
fn classify_status(ticker: &str, status: StatusCode) -> Option<AppError> {
    if status.is_success() {
        None
    } else if status == StatusCode::NOT_FOUND {
        Some(AppError::unavailable(ticker, "symbol not found"))
    } else if status == StatusCode::TOO_MANY_REQUESTS {
        Some(AppError::provider(format!("{ticker}: rate limited (HTTP 429)")))
    } else if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        Some(AppError::provider(format!(
            "{ticker}: request rejected (HTTP {})",
            status.as_u16()
        )))
    } else {
        Some(AppError::provider(format!(
            "{ticker}: unexpected HTTP {}",
            status.as_u16()
        )))
    }
}

fn unix_start_of(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp()
}

impl MarketDataProvider for YahooProvider {
    async fn fetch_quote(&self, ticker: &str) -> FetchResult<ProviderQuote> {
        let query = [
            ("range", "5d".to_string()),
            ("interval", "1d".to_string()),
        ];
        let (chart, shares) = futures::join!(
            self.get_chart(ticker, &query),
            self.fetch_shares_outstanding(ticker)
        );

        let mut quote = decode::quote_from_chart(ticker, &chart?)?;
        quote.shares_outstanding = shares;
        Ok(quote)
    }

    async fn fetch_history(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> FetchResult<Vec<Candle>> {
        let query = [
            ("period1", unix_start_of(start).to_string()),
            ("period2", unix_start_of(end + Duration::days(1)).to_string()),
            ("interval", "1d".to_string()),
        ];
        let chart = self.get_chart(ticker, &query).await?;
        let candles = decode::decode_candles(&chart);

        if candles.is_empty() {
            return Err(AppError::unavailable(
                ticker,
                format!("no history between {start} and {end}"),
            ));
        }
        debug!("{ticker}: {} candles", candles.len());
        Ok(candles)
    }
}
