// src/dispatch/mod.rs

pub mod runner;
pub mod submit;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

pub use runner::{DispatchEvent, DispatchHandle, Dispatcher};
pub use submit::{normalize_response, OrderClient};

/// Почему ордер по счёту не ушёл. Всегда касается только одного счёта.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("authentication failed: {message}")]
    AuthenticationFailed { message: String },
    #[error("symbol not found for `{stock}` on {exchange}")]
    SymbolUnresolved { stock: String, exchange: String },
    #[error("submission failed: {0:#}")]
    Submission(#[from] anyhow::Error),
}

impl SubmitError {
    /// Короткий код для журнала
    pub fn kind(&self) -> &'static str {
        match self {
            SubmitError::AuthenticationFailed { .. } => "AuthFailed",
            SubmitError::SymbolUnresolved { .. } => "Unresolved",
            SubmitError::Submission(_) => "Failed",
        }
    }
}

/// Ордер дошёл до брокера. `response` показываем как есть.
#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub trading_symbol: String,
    pub token: String,
    pub response: Value,
    /// флаг `status` из ответа
    pub accepted: bool,
    pub order_id: Option<String>,
}

#[derive(Debug)]
pub struct AccountReport {
    pub account: String,
    pub available_funds: Decimal,
    pub result: Result<PlacedOrder, SubmitError>,
}

impl AccountReport {
    pub fn status(&self) -> &'static str {
        match &self.result {
            Ok(p) if p.accepted => "Accepted",
            Ok(_) => "Rejected",
            Err(e) => e.kind(),
        }
    }

    /// Одна строка для экрана
    pub fn status_line(&self) -> String {
        match &self.result {
            Ok(p) => format!("Order response for {}: {}", self.account, p.response),
            Err(e) => format!("{}: {}", self.account, e),
        }
    }
}

#[derive(Debug)]
pub struct DispatchReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcomes: Vec<AccountReport>,
}

impl DispatchReport {
    pub fn accepted(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(&o.result, Ok(p) if p.accepted))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_err()).count()
    }

    pub fn get(&self, account: &str) -> Option<&AccountReport> {
        self.outcomes.iter().find(|o| o.account == account)
    }

    pub fn summary(&self) -> String {
        format!(
            "All orders have been placed: {} accounts, {} accepted, {} failed",
            self.outcomes.len(),
            self.accepted(),
            self.failed()
        )
    }
}
