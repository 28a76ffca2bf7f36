// src/broker/mod.rs

pub mod smartapi;
pub mod totp;
pub mod types;

use async_trait::async_trait;
use serde_json::Value;

pub use smartapi::SmartApi;
pub use totp::{Totp, TotpError};
pub use types::{Credentials, LoginResponse, OrderParams, Session, SessionTokens};

/// Сессионный REST брокера: вход -> ордер -> выход.
/// Один экземпляр обслуживает все счета, ключи идут в каждом запросе.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Ответ со `status == false` не ошибка транспорта, решает вызывающий
    async fn login(&self, creds: &Credentials<'_>) -> anyhow::Result<LoginResponse>;
    /// Сырой ответ брокера, без проверки схемы
    async fn place_order(&self, session: &Session, params: &OrderParams) -> anyhow::Result<Value>;
    async fn logout(&self, session: &Session) -> anyhow::Result<()>;
}
