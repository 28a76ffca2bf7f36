// tests/forecast_tests.rs

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use orderfan::config::ForecastConfig;
use orderfan::forecast::{
    horizon_steps, recommend, Forecaster, PriceHistory, PricePoint, Recommendation, TickerDirectory,
};
use std::collections::HashMap;
use std::sync::Mutex;

/// Один ряд на все тикеры, точки через `gap` минут. Запоминает запросы.
struct Series {
    closes: Vec<f64>,
    gap_minutes: i64,
    per_ticker: HashMap<String, Vec<f64>>,
    failing: Vec<String>,
    requests: Mutex<Vec<(String, String, String)>>,
}

impl Series {
    fn daily(closes: Vec<f64>) -> Self {
        Self::every(closes, 24 * 60)
    }

    fn every(closes: Vec<f64>, gap_minutes: i64) -> Self {
        Self {
            closes,
            gap_minutes,
            per_ticker: HashMap::new(),
            failing: Vec::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn requests(&self) -> Vec<(String, String, String)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PriceHistory for Series {
    async fn closes(&self, ticker: &str, range: &str, interval: &str) -> Result<Vec<PricePoint>> {
        self.requests
            .lock()
            .unwrap()
            .push((ticker.to_string(), range.to_string(), interval.to_string()));
        if self.failing.iter().any(|t| t == ticker) {
            bail!("HTTP 404 for {}", ticker);
        }
        let closes = self.per_ticker.get(ticker).unwrap_or(&self.closes);
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 3, 45, 0).unwrap();
        Ok(closes
            .iter()
            .enumerate()
            .map(|(i, &close)| PricePoint { ts: start + Duration::minutes(i as i64 * self.gap_minutes), close })
            .collect())
    }
}

fn directory() -> TickerDirectory {
    let csv = "Company Name,Ticker\nTest Company Ltd,TESTCO.NS\nOther Corp,OTHER.NS\n";
    TickerDirectory::read(csv.as_bytes()).unwrap()
}

#[tokio::test]
async fn rising_series_is_a_buy() {
    let closes: Vec<f64> = (0..50).map(|i| 100.0 + i as f64).collect();
    let forecaster = Forecaster::new(Series::daily(closes), ForecastConfig::default());
    let report = forecaster.predict("TESTCO.NS", 10).await.unwrap();

    assert_eq!(report.current_price, 149.0);
    assert!((report.predicted_price - 159.0).abs() < 1e-6);
    assert_eq!(report.steps, 10);
    assert_eq!(report.recommendation, Recommendation::Buy);
    assert!(report.change_pct > 0.0);
    assert_eq!(report.observations, 50);
    assert!(report.summary().starts_with("Recommendation: Buy"));
}

#[tokio::test]
async fn horizon_counts_calendar_days() {
    // котировка раз в два дня: 10 календарных дней = 5 точек ряда
    let closes: Vec<f64> = (0..50).map(|i| 100.0 + i as f64).collect();
    let forecaster = Forecaster::new(Series::every(closes, 2 * 24 * 60), ForecastConfig::default());
    let report = forecaster.predict("TESTCO.NS", 10).await.unwrap();
    assert_eq!(report.horizon_days, 10);
    assert_eq!(report.steps, 5);
    assert!((report.predicted_price - 154.0).abs() < 1e-6);
}

#[test]
fn steps_fall_back_to_trading_calendar() {
    let one = [PricePoint { ts: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(), close: 1.0 }];
    assert_eq!(horizon_steps(&one, 365), 252);
    assert_eq!(horizon_steps(&one, 1), 1);
    assert_eq!(horizon_steps(&one, 0), 0);
    assert_eq!(horizon_steps(&[], 30), 21);
}

#[tokio::test]
async fn falling_series_is_a_sell() {
    let closes: Vec<f64> = (0..30).map(|i| 200.0 - 2.0 * i as f64).collect();
    let forecaster = Forecaster::new(Series::daily(closes), ForecastConfig::default());
    let report = forecaster.predict("TESTCO.NS", 5).await.unwrap();
    assert_eq!(report.recommendation, Recommendation::Sell);
    assert!(report.change_pct < 0.0);
}

#[tokio::test]
async fn empty_input_is_rejected() {
    let forecaster = Forecaster::new(Series::daily(vec![]), ForecastConfig::default());
    assert!(forecaster.predict("  ", 10).await.is_err());
    assert!(forecaster.predict("TESTCO.NS", 10).await.is_err());
}

#[tokio::test]
async fn company_name_is_looked_up() {
    let closes: Vec<f64> = (0..20).map(|i| 50.0 + i as f64).collect();
    let forecaster =
        Forecaster::new(Series::daily(closes), ForecastConfig::default()).with_directory(directory());
    let report = forecaster.predict("test company ltd", 5).await.unwrap();
    assert_eq!(report.ticker, "TESTCO.NS");

    let history = &forecaster_history(&forecaster);
    assert_eq!(history[0], ("TESTCO.NS".to_string(), "5y".to_string(), "1d".to_string()));
}

fn forecaster_history(f: &Forecaster<Series>) -> Vec<(String, String, String)> {
    f.history().requests()
}

#[tokio::test]
async fn intraday_reads_last_day_in_five_minute_steps() {
    let closes = vec![100.0, 101.5, 99.0, 103.0, 102.0];
    let forecaster = Forecaster::new(Series::every(closes, 5), ForecastConfig::default());
    let report = forecaster.intraday("testco.ns").await.unwrap();

    assert_eq!(report.ticker, "TESTCO.NS");
    assert_eq!(report.points.len(), 5);
    assert_eq!(report.points[0].0, "03:45");
    assert_eq!(report.points[4].0, "04:05");
    assert_eq!((report.open, report.last, report.high, report.low), (100.0, 102.0, 103.0, 99.0));
    assert!((report.change_pct - 2.0).abs() < 1e-9);
    assert_eq!(
        forecaster_history(&forecaster),
        vec![("TESTCO.NS".to_string(), "1d".to_string(), "5m".to_string())]
    );

    let empty = Forecaster::new(Series::every(vec![], 5), ForecastConfig::default());
    assert!(empty.intraday("TESTCO.NS").await.is_err());
}

#[tokio::test]
async fn comparison_keeps_input_order_and_skips_missing_tickers() {
    let mut series = Series::daily(vec![]);
    series.per_ticker.insert("TESTCO.NS".into(), vec![100.0, 120.0, 110.0]);
    series.per_ticker.insert("OTHER.NS".into(), vec![50.0, 40.0, 45.0]);
    series.failing.push("GONE.NS".into());
    let forecaster = Forecaster::new(series, ForecastConfig::default()).with_directory(directory());

    let inputs = vec![
        "Other Corp".to_string(),
        "gone.ns".to_string(),
        "TESTCO.NS".to_string(),
        "other.ns".to_string(),
    ];
    let rows = forecaster.compare(&inputs, Some("6mo")).await.unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].ticker, "OTHER.NS");
    assert_eq!(rows[0].label, "Other Corp");
    assert!((rows[0].change_pct + 10.0).abs() < 1e-9);
    assert_eq!(rows[1].ticker, "TESTCO.NS");
    assert!((rows[1].change_pct - 10.0).abs() < 1e-9);
    assert_eq!((rows[1].high, rows[1].low), (120.0, 100.0));

    // повтор OTHER.NS не запрашивается второй раз
    let requests = forecaster_history(&forecaster);
    assert_eq!(requests.len(), 3);
    assert!(requests.iter().all(|(_, range, interval)| range == "6mo" && interval == "1d"));
}

#[tokio::test]
async fn comparison_rejects_bad_input() {
    let forecaster = Forecaster::new(Series::daily(vec![1.0, 2.0]), ForecastConfig::default());
    assert!(forecaster.compare(&["TESTCO.NS".to_string()], Some("3w")).await.is_err());
    assert!(forecaster.compare(&[" ".to_string()], None).await.is_err());
    assert!(forecaster_history(&forecaster).is_empty());

    let rows = forecaster.compare(&["TESTCO.NS".to_string()], None).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(forecaster_history(&forecaster)[0].1, "1y");

    let mut failing = Series::daily(vec![]);
    failing.failing.push("GONE.NS".into());
    let forecaster = Forecaster::new(failing, ForecastConfig::default());
    assert!(forecaster.compare(&["GONE.NS".to_string()], None).await.is_err());
}

#[test]
fn flat_forecast_is_not_a_buy() {
    assert_eq!(recommend(100.0, 100.0), Recommendation::Sell);
    assert_eq!(recommend(100.0, 100.01), Recommendation::Buy);
}
