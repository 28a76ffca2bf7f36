// src/broker/types.rs
use serde::{Deserialize, Serialize};

/// Что нужно для открытия сессии
#[derive(Debug, Clone)]
pub struct Credentials<'a> {
    pub api_key: &'a str,
    pub client_code: &'a str,
    pub password: &'a str,
    pub totp: String,
}

/// Универсальная обёртка ответа SmartAPI
#[derive(Deserialize, Debug, Clone)]
pub struct ApiResponse<T> {
    #[serde(default)]
    pub status: bool,
    #[serde(default)]
    pub message: String,
    #[serde(rename = "errorcode", default)]
    pub error_code: String,
    pub data: Option<T>,
}

/// Ответ на loginByPassword
#[derive(Deserialize, Debug, Clone)]
pub struct SessionTokens {
    #[serde(rename = "jwtToken")]
    pub jwt_token: String,
    #[serde(rename = "refreshToken", default)]
    pub refresh_token: String,
    #[serde(rename = "feedToken", default)]
    pub feed_token: Option<String>,
}

pub type LoginResponse = ApiResponse<SessionTokens>;

/// Открытая сессия одного счёта
#[derive(Debug, Clone)]
pub struct Session {
    pub api_key: String,
    pub client_code: String,
    pub jwt_token: String,
    pub refresh_token: String,
}

/// Тело placeOrder. Числа брокер принимает строками.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct OrderParams {
    pub variety: String,
    #[serde(rename = "tradingsymbol")]
    pub trading_symbol: String,
    #[serde(rename = "symboltoken")]
    pub symbol_token: String,
    #[serde(rename = "transactiontype")]
    pub transaction_type: String,
    pub exchange: String,
    #[serde(rename = "ordertype")]
    pub order_type: String,
    #[serde(rename = "producttype")]
    pub product_type: String,
    pub duration: String,
    pub price: String,
    #[serde(rename = "squareoff")]
    pub square_off: String,
    #[serde(rename = "stoploss")]
    pub stop_loss: String,
    pub quantity: String,
}
