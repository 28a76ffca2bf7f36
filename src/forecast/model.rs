// src/forecast/model.rs

use anyhow::{anyhow, Result};

/// Линейное (двойное) экспоненциальное сглаживание Хольта.
/// Прогноз через `horizon` шагов: уровень + horizon * тренд.
pub fn holt_forecast(series: &[f64], alpha: f64, beta: f64, horizon: u32) -> Result<f64> {
    if series.len() < 2 {
        return Err(anyhow!("need at least 2 prices, got {}", series.len()));
    }
    if !(0.0..=1.0).contains(&alpha) || !(0.0..=1.0).contains(&beta) {
        return Err(anyhow!("smoothing factors must be in [0, 1]: alpha={}, beta={}", alpha, beta));
    }

    let mut level = series[0];
    let mut trend = series[1] - series[0];
    for &y in &series[1..] {
        let prev_level = level;
        level = alpha * y + (1.0 - alpha) * (level + trend);
        trend = beta * (level - prev_level) + (1.0 - beta) * trend;
    }
    Ok(level + f64::from(horizon) * trend)
}

pub fn percentage_change(current: f64, predicted: f64) -> f64 {
    (predicted - current) / current * 100.0
}
