// src/forecast/history.rs

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use url::Url;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub ts: DateTime<Utc>,
    pub close: f64,
}

/// Внутридневной ряд: последний торговый день с шагом 5 минут
pub const INTRADAY_RANGE: &str = "1d";
pub const INTRADAY_INTERVAL: &str = "5m";

/// Диапазоны, которые понимает chart API
pub const RANGES: &[&str] = &["1d", "5d", "1mo", "3mo", "6mo", "1y", "2y", "5y", "10y", "ytd", "max"];

/// Источник цен закрытия
#[async_trait]
pub trait PriceHistory: Send + Sync {
    /// Точки за `range` с шагом `interval` (`1d`, `5m`, ...), по возрастанию времени
    async fn closes(&self, ticker: &str, range: &str, interval: &str) -> Result<Vec<PricePoint>>;

    async fn daily_closes(&self, ticker: &str, range: &str) -> Result<Vec<PricePoint>> {
        self.closes(ticker, range, "1d").await
    }

    async fn intraday(&self, ticker: &str) -> Result<Vec<PricePoint>> {
        self.closes(ticker, INTRADAY_RANGE, INTRADAY_INTERVAL).await
    }
}

// --- ответ chart API ---
#[derive(Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Deserialize)]
struct Indicators {
    quote: Vec<Quote>,
}

#[derive(Deserialize)]
struct Quote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

/// Yahoo chart API (`v8/finance/chart/{ticker}`)
#[derive(Debug, Clone)]
pub struct YahooHistory {
    client: Client,
    base_url: Url,
}

impl YahooHistory {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| anyhow!("Invalid history URL `{}`: {}", base_url, e))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent("Mozilla/5.0 orderfan")
            .build()
            .map_err(|e| anyhow!("HTTP client build error: {}", e))?;
        Ok(Self { client, base_url })
    }
}

#[async_trait]
impl PriceHistory for YahooHistory {
    async fn closes(&self, ticker: &str, range: &str, interval: &str) -> Result<Vec<PricePoint>> {
        let endpoint = format!("v8/finance/chart/{}", urlencoding::encode(ticker));
        let url = self.base_url.join(&endpoint)?;
        debug!(%url, range, interval, "Fetching price history");

        let resp = self
            .client
            .get(url)
            .query(&[("range", range), ("interval", interval)])
            .send()
            .await?;
        let status = resp.status();
        let body: ChartResponse = resp
            .json()
            .await
            .with_context(|| format!("Bad chart response for {} (HTTP {})", ticker, status))?;

        if let Some(err) = body.chart.error {
            return Err(anyhow!("History error for {}: {} {}", ticker, err.code, err.description));
        }
        let result = body
            .chart
            .result
            .and_then(|mut r| if r.is_empty() { None } else { Some(r.swap_remove(0)) })
            .ok_or_else(|| anyhow!("No price history for {}", ticker))?;

        let closes = result
            .indicators
            .quote
            .first()
            .map(|q| q.close.as_slice())
            .unwrap_or(&[]);
        Ok(points_from_columns(&result.timestamp, closes))
    }
}

/// Склеивает колонки времени и цен, пропуская пустые цены
pub fn points_from_columns(timestamps: &[i64], closes: &[Option<f64>]) -> Vec<PricePoint> {
    timestamps
        .iter()
        .zip(closes)
        .filter_map(|(&ts, close)| {
            let close = (*close)?;
            let ts = DateTime::<Utc>::from_timestamp(ts, 0)?;
            close.is_finite().then_some(PricePoint { ts, close })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_closes_are_skipped() {
        let pts = points_from_columns(&[1, 2, 3], &[Some(10.0), None, Some(12.0)]);
        assert_eq!(pts.len(), 2);
        assert_eq!(pts[1].close, 12.0);
    }
}
