// src/forecast/mod.rs

pub mod history;
pub mod market;
pub mod model;
pub mod tickers;

use anyhow::{anyhow, bail, Result};
use serde::Serialize;
use std::fmt;
use tracing::{info, warn};

use crate::config::ForecastConfig;
pub use history::{PriceHistory, PricePoint, YahooHistory, RANGES};
pub use market::{split_tickers, IntradayReport, Performance};
pub use tickers::TickerDirectory;

/// Торговых сессий на календарный год, если по ряду шаг не оценить
const TRADING_DAYS_PER_YEAR: f64 = 252.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Recommendation {
    Buy,
    Sell,
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recommendation::Buy => write!(f, "Buy"),
            Recommendation::Sell => write!(f, "Sell"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ForecastReport {
    pub ticker: String,
    pub horizon_days: u32,
    /// Шагов модели (торговых сессий) в горизонте
    pub steps: u32,
    pub current_price: f64,
    pub predicted_price: f64,
    pub change_pct: f64,
    pub recommendation: Recommendation,
    pub observations: usize,
}

impl ForecastReport {
    pub fn summary(&self) -> String {
        format!(
            "Recommendation: {}, Change: {:.2}%, Current: {:.2}, Predicted: {:.2}",
            self.recommendation, self.change_pct, self.current_price, self.predicted_price
        )
    }
}

/// Buy, только если прогноз строго выше текущей цены
pub fn recommend(current: f64, predicted: f64) -> Recommendation {
    if predicted > current {
        Recommendation::Buy
    } else {
        Recommendation::Sell
    }
}

/// Календарные дни -> шаги ряда. Плотность ряда берём из его же дат:
/// у дневных котировок это около 252 точек на 365 дней.
pub fn horizon_steps(points: &[PricePoint], horizon_days: u32) -> u32 {
    if horizon_days == 0 {
        return 0;
    }
    let span_days = match (points.first(), points.last()) {
        (Some(a), Some(b)) => (b.ts - a.ts).num_seconds() as f64 / 86_400.0,
        _ => 0.0,
    };
    let per_day = if points.len() > 1 && span_days >= 1.0 {
        ((points.len() - 1) as f64 / span_days).min(1.0)
    } else {
        TRADING_DAYS_PER_YEAR / 365.0
    };
    ((horizon_days as f64 * per_day).round() as u32).max(1)
}

pub struct Forecaster<H> {
    history: H,
    cfg: ForecastConfig,
    directory: TickerDirectory,
}

impl<H: PriceHistory> Forecaster<H> {
    pub fn new(history: H, cfg: ForecastConfig) -> Self {
        Self { history, cfg, directory: TickerDirectory::default() }
    }

    pub fn with_directory(mut self, directory: TickerDirectory) -> Self {
        self.directory = directory;
        self
    }

    pub fn history(&self) -> &H {
        &self.history
    }

    pub fn compare_range(&self) -> &str {
        &self.cfg.compare_range
    }

    pub fn default_horizon(&self) -> u32 {
        self.cfg.default_horizon_days
    }

    /// Название компании или тикер -> тикер
    fn ticker_for(&self, input: &str) -> Result<String> {
        if input.trim().is_empty() {
            bail!("Please enter a stock symbol.");
        }
        Ok(self.directory.resolve(input))
    }

    /// `horizon_days` в календарных днях
    pub async fn predict(&self, input: &str, horizon_days: u32) -> Result<ForecastReport> {
        let ticker = self.ticker_for(input)?;
        let ticker = ticker.as_str();
        let points = self.history.daily_closes(ticker, &self.cfg.range).await?;
        let closes: Vec<f64> = points.iter().map(|p| p.close).collect();

        let current_price = *closes
            .last()
            .ok_or_else(|| anyhow!("No price history for {}", ticker))?;
        if current_price <= 0.0 {
            return Err(anyhow!("Invalid last price {} for {}", current_price, ticker));
        }
        let steps = horizon_steps(&points, horizon_days);
        let predicted_price = model::holt_forecast(&closes, self.cfg.alpha, self.cfg.beta, steps)?;

        let report = ForecastReport {
            ticker: ticker.to_string(),
            horizon_days,
            steps,
            current_price,
            predicted_price,
            change_pct: model::percentage_change(current_price, predicted_price),
            recommendation: recommend(current_price, predicted_price),
            observations: closes.len(),
        };
        info!("Forecast for {} ({} days, {} steps): {}", ticker, horizon_days, steps, report.summary());
        Ok(report)
    }

    /// 5-минутные цены за последний торговый день
    pub async fn intraday(&self, input: &str) -> Result<IntradayReport> {
        let ticker = self.ticker_for(input)?;
        let points = self.history.intraday(&ticker).await?;
        let report = IntradayReport::from_points(&ticker, &points)
            .ok_or_else(|| anyhow!("No intraday prices for {}", ticker))?;
        info!("Intraday {} ({} points): {}", ticker, report.points.len(), report.summary());
        Ok(report)
    }

    /// Изменение цены нескольких бумаг за `range` (по умолчанию `compare_range`).
    /// Тикер без данных пропускается; ошибка, только если не удалось ни одного.
    pub async fn compare(&self, inputs: &[String], range: Option<&str>) -> Result<Vec<Performance>> {
        let range = range.unwrap_or(self.cfg.compare_range.as_str());
        if !RANGES.contains(&range) {
            bail!("Unknown range `{}`, expected one of: {}", range, RANGES.join(", "));
        }
        let mut wanted: Vec<(String, &str)> = Vec::new();
        for input in inputs.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
            let ticker = self.directory.resolve(input);
            if !wanted.iter().any(|(t, _)| *t == ticker) {
                wanted.push((ticker, input));
            }
        }
        if wanted.is_empty() {
            bail!("Please enter at least one stock symbol.");
        }

        let mut rows = Vec::with_capacity(wanted.len());
        for (ticker, label) in &wanted {
            match self.history.daily_closes(ticker, range).await {
                Ok(points) => match Performance::from_points(ticker, label, &points) {
                    Some(p) => rows.push(p),
                    None => warn!("No prices for {} over {}", ticker, range),
                },
                Err(e) => warn!("History for {} failed: {:#}", ticker, e),
            }
        }
        if rows.is_empty() {
            let names: Vec<&str> = wanted.iter().map(|(t, _)| t.as_str()).collect();
            bail!("No price history for any of: {}", names.join(", "));
        }
        info!("Compared {} of {} tickers over {}", rows.len(), wanted.len(), range);
        Ok(rows)
    }
}
