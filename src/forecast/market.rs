// src/forecast/market.rs

use serde::Serialize;

use super::history::PricePoint;
use super::model::percentage_change;

/// Сколько последних 5-минутных точек показывать в тексте
pub const INTRADAY_TAIL: usize = 6;

/// Цена внутри последнего торгового дня
#[derive(Debug, Clone, Serialize)]
pub struct IntradayReport {
    pub ticker: String,
    pub points: Vec<(String, f64)>,
    pub open: f64,
    pub last: f64,
    pub high: f64,
    pub low: f64,
    pub change_pct: f64,
}

impl IntradayReport {
    pub fn from_points(ticker: &str, points: &[PricePoint]) -> Option<Self> {
        let first = points.first()?;
        let last = points.last()?;
        let (high, low) = points
            .iter()
            .fold((f64::MIN, f64::MAX), |(h, l), p| (h.max(p.close), l.min(p.close)));
        Some(Self {
            ticker: ticker.to_string(),
            points: points
                .iter()
                .map(|p| (p.ts.format("%H:%M").to_string(), p.close))
                .collect(),
            open: first.close,
            last: last.close,
            high,
            low,
            change_pct: percentage_change(first.close, last.close),
        })
    }

    pub fn summary(&self) -> String {
        format!(
            "Last: {:.2}, Open: {:.2}, High: {:.2}, Low: {:.2}, Change: {:.2}%",
            self.last, self.open, self.high, self.low, self.change_pct
        )
    }

    /// Последние `n` точек в виде `HH:MM price`
    pub fn tail(&self, n: usize) -> Vec<String> {
        let skip = self.points.len().saturating_sub(n);
        self.points
            .iter()
            .skip(skip)
            .map(|(t, c)| format!("{} {:.2}", t, c))
            .collect()
    }
}

/// Итог одного тикера в сравнении за период
#[derive(Debug, Clone, Serialize)]
pub struct Performance {
    pub ticker: String,
    /// Что ввёл пользователь (название компании или тикер)
    pub label: String,
    pub start_price: f64,
    pub last_price: f64,
    pub change_pct: f64,
    pub high: f64,
    pub low: f64,
    pub observations: usize,
}

impl Performance {
    pub fn from_points(ticker: &str, label: &str, points: &[PricePoint]) -> Option<Self> {
        let first = points.first()?;
        let last = points.last()?;
        let (high, low) = points
            .iter()
            .fold((f64::MIN, f64::MAX), |(h, l), p| (h.max(p.close), l.min(p.close)));
        Some(Self {
            ticker: ticker.to_string(),
            label: label.to_string(),
            start_price: first.close,
            last_price: last.close,
            change_pct: percentage_change(first.close, last.close),
            high,
            low,
            observations: points.len(),
        })
    }

    pub fn line(&self) -> String {
        format!(
            "{}: {:+.2}% ({:.2} → {:.2}, min {:.2}, max {:.2})",
            self.ticker, self.change_pct, self.start_price, self.last_price, self.low, self.high
        )
    }
}

/// `"RELIANCE.NS, Tata Motors"` -> список без пустых элементов
pub fn split_tickers(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
