// src/config.rs
use serde::Deserialize;
use std::env;
use anyhow::Result;
use config::{Config as Loader, Environment, File};

use crate::catalog::SuffixPolicy;

/// Какой интерфейс запускать
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Frontend {
    Console,
    Web,
    Telegram,
}

/// Хеш-функция для TOTP (брокер выдаёт секреты под SHA-1)
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TotpAlgorithm {
    Sha1,
    Sha256,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    #[serde(default = "default_frontend")]
    pub frontend: Frontend,

    // Список счетов (CSV)
    #[serde(default = "default_accounts_path")]
    pub accounts_path: String,

    // SQLite журнал ордеров, без него журнал не ведётся
    #[serde(default)]
    pub sqlite_path: Option<String>,

    // Telegram
    #[serde(default)]
    pub telegram_token: Option<String>,

    // Web
    #[serde(default = "default_web_bind")]
    pub web_bind: String,

    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub totp: TotpConfig,
    #[serde(default)]
    pub forecast: ForecastConfig,
}

#[derive(Deserialize, Debug, Clone)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Файл лога (ротация раз в сутки), None = только консоль
    #[serde(default)]
    pub file: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct BrokerConfig {
    #[serde(default = "default_broker_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_client_local_ip")]
    pub client_local_ip: String,
    #[serde(default = "default_client_public_ip")]
    pub client_public_ip: String,
    #[serde(default = "default_mac_address")]
    pub mac_address: String,
    #[serde(default = "default_source_id")]
    pub source_id: String,
    #[serde(default = "default_user_type")]
    pub user_type: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct CatalogConfig {
    #[serde(default = "default_catalog_url")]
    pub url: String,
    #[serde(default)]
    pub suffix_policy: SuffixPolicy,
}

#[derive(Deserialize, Debug, Clone)]
pub struct DispatchConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

#[derive(Deserialize, Debug, Clone)]
pub struct TotpConfig {
    #[serde(default = "default_totp_digits")]
    pub digits: u32,
    #[serde(default = "default_totp_period_secs")]
    pub period_secs: u64,
    #[serde(default = "default_totp_algorithm")]
    pub algorithm: TotpAlgorithm,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ForecastConfig {
    #[serde(default = "default_history_url")]
    pub history_url: String,
    #[serde(default = "default_history_range")]
    pub range: String,
    #[serde(default = "default_alpha")]
    pub alpha: f64,
    #[serde(default = "default_beta")]
    pub beta: f64,
    /// Горизонт прогноза в календарных днях
    #[serde(default = "default_horizon_days")]
    pub default_horizon_days: u32,
    /// CSV `Company Name,Ticker` для поиска по названию
    #[serde(default = "default_tickers_path")]
    pub tickers_path: String,
    #[serde(default = "default_compare_range")]
    pub compare_range: String,
}

// --- Значения по умолчанию ---
fn default_frontend() -> Frontend { Frontend::Console }
fn default_accounts_path() -> String { "data.csv".into() }
fn default_web_bind() -> String { "127.0.0.1:8080".into() }
fn default_log_level() -> String { "info".into() }
fn default_broker_base_url() -> String { "https://apiconnect.angelbroking.com/".into() }
fn default_request_timeout_secs() -> u64 { 10 }
fn default_client_local_ip() -> String { "127.0.0.1".into() }
fn default_client_public_ip() -> String { "127.0.0.1".into() }
fn default_mac_address() -> String { "00:00:00:00:00:00".into() }
fn default_source_id() -> String { "WEB".into() }
fn default_user_type() -> String { "USER".into() }
fn default_catalog_url() -> String {
    "https://margincalculator.angelbroking.com/OpenAPI_File/files/OpenAPIScripMaster.json".into()
}
fn default_poll_interval_ms() -> u64 { 1_000 }
fn default_totp_digits() -> u32 { 6 }
fn default_totp_period_secs() -> u64 { 30 }
fn default_totp_algorithm() -> TotpAlgorithm { TotpAlgorithm::Sha1 }
fn default_history_url() -> String { "https://query1.finance.yahoo.com/".into() }
fn default_history_range() -> String { "5y".into() }
fn default_alpha() -> f64 { 0.5 }
fn default_beta() -> f64 { 0.1 }
fn default_horizon_days() -> u32 { 365 }
fn default_tickers_path() -> String { "StockStreamTickersData.csv".into() }
fn default_compare_range() -> String { "1y".into() }

impl Default for LogConfig {
    fn default() -> Self {
        Self { level: default_log_level(), file: None }
    }
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            base_url: default_broker_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            client_local_ip: default_client_local_ip(),
            client_public_ip: default_client_public_ip(),
            mac_address: default_mac_address(),
            source_id: default_source_id(),
            user_type: default_user_type(),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self { url: default_catalog_url(), suffix_policy: SuffixPolicy::default() }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self { poll_interval_ms: default_poll_interval_ms() }
    }
}

impl Default for TotpConfig {
    fn default() -> Self {
        Self {
            digits: default_totp_digits(),
            period_secs: default_totp_period_secs(),
            algorithm: default_totp_algorithm(),
        }
    }
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            history_url: default_history_url(),
            range: default_history_range(),
            alpha: default_alpha(),
            beta: default_beta(),
            default_horizon_days: default_horizon_days(),
            tickers_path: default_tickers_path(),
            compare_range: default_compare_range(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let file = env::var("ORDERFAN_CONFIG").unwrap_or_else(|_| "Config.toml".into());
        let loader = Loader::builder()
            .add_source(File::with_name(&file).required(false))
            .add_source(Environment::with_prefix("ORDERFAN").separator("__"))
            .build()?;
        Ok(loader.try_deserialize()?)
    }
}
