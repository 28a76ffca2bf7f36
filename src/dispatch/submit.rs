// src/dispatch/submit.rs

use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::{PlacedOrder, SubmitError};
use crate::accounts::Account;
use crate::broker::{Broker, Credentials, OrderParams, Session, Totp};
use crate::catalog::{CatalogSnapshot, ResolvedSymbol};
use crate::config::TotpConfig;
use crate::models::OrderTemplate;

/// Клиент одного счёта: сессия -> поиск символа -> ордер -> выход
pub struct OrderClient<B> {
    broker: Arc<B>,
    totp: TotpConfig,
}

// derive(Clone) потребовал бы B: Clone
impl<B> Clone for OrderClient<B> {
    fn clone(&self) -> Self {
        Self { broker: self.broker.clone(), totp: self.totp.clone() }
    }
}

impl<B> OrderClient<B>
where
    B: Broker + 'static,
{
    pub fn new(broker: Arc<B>, totp: TotpConfig) -> Self {
        Self { broker, totp }
    }

    pub async fn submit(
        &self,
        account: &Account,
        order: &OrderTemplate,
        catalog: &CatalogSnapshot,
    ) -> Result<PlacedOrder, SubmitError> {
        let result = self.submit_inner(account, order, catalog).await;
        if let Err(e) = &result {
            error!("Error placing order for {}: {}", account.username, e);
        }
        result
    }

    async fn submit_inner(
        &self,
        account: &Account,
        order: &OrderTemplate,
        catalog: &CatalogSnapshot,
    ) -> Result<PlacedOrder, SubmitError> {
        // 1) сессия
        let code = Totp::from_base32(&account.totp_secret, &self.totp)
            .map_err(|e| anyhow::anyhow!("bad TOTP secret: {}", e))?
            .now();
        let creds = Credentials {
            api_key: &account.api_key,
            client_code: &account.username,
            password: &account.password,
            totp: code,
        };
        let login = self.broker.login(&creds).await?;

        // 2) брокер отказал во входе
        let tokens = match (login.status, login.data) {
            (true, Some(tokens)) => tokens,
            (_, _) => {
                let message = if login.error_code.is_empty() {
                    login.message
                } else {
                    format!("{} ({})", login.message, login.error_code)
                };
                return Err(SubmitError::AuthenticationFailed { message });
            }
        };
        let session = Session {
            api_key: account.api_key.clone(),
            client_code: account.username.clone(),
            jwt_token: tokens.jwt_token,
            refresh_token: tokens.refresh_token,
        };

        // 3-5) ордер внутри открытой сессии
        let result = self.place_in_session(&session, order, catalog).await;

        // 6) выходим в любом случае
        if let Err(e) = self.broker.logout(&session).await {
            warn!("Logout failed for {}: {:#}", account.username, e);
        }
        result
    }

    async fn place_in_session(
        &self,
        session: &Session,
        order: &OrderTemplate,
        catalog: &CatalogSnapshot,
    ) -> Result<PlacedOrder, SubmitError> {
        let exchange = order.exchange.as_str();
        let Some(ResolvedSymbol { trading_symbol, token }) =
            catalog.resolve(&order.stock_name, exchange)
        else {
            if catalog.is_empty() {
                error!("Instrument catalog is not loaded.");
            }
            return Err(SubmitError::SymbolUnresolved {
                stock: order.stock_name.clone(),
                exchange: exchange.to_string(),
            });
        };

        info!(
            "Placing order for {} shares of {} for account {}...",
            order.quantity, trading_symbol, session.client_code
        );
        let params = build_order_params(order, &trading_symbol, &token);
        let raw = self.broker.place_order(session, &params).await?;
        let response = normalize_response(raw);
        info!("Order response for {}: {}", session.client_code, response);

        let accepted = response.get("status").and_then(Value::as_bool).unwrap_or(false);
        let order_id = response
            .pointer("/data/orderid")
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(PlacedOrder { trading_symbol, token, response, accepted, order_id })
    }
}

pub fn build_order_params(order: &OrderTemplate, trading_symbol: &str, token: &str) -> OrderParams {
    OrderParams {
        variety: "NORMAL".into(),
        trading_symbol: trading_symbol.to_string(),
        symbol_token: token.to_string(),
        transaction_type: order.transaction_type.as_str().into(),
        exchange: order.exchange.as_str().into(),
        order_type: order.order_type.as_str().into(),
        product_type: order.product_type.as_str().into(),
        duration: "DAY".into(),
        price: order.price.normalize().to_string(),
        square_off: "0".into(),
        stop_loss: "0".into(),
        quantity: order.quantity.to_string(),
    }
}

/// Ответ брокера иногда приходит JSON-строкой внутри JSON: раскрываем.
/// Текст, который не парсится, оставляем строкой.
pub fn normalize_response(raw: Value) -> Value {
    match raw {
        Value::String(text) => match serde_json::from_str::<Value>(text.trim()) {
            Ok(Value::String(inner)) => normalize_response(Value::String(inner)),
            Ok(parsed) => parsed,
            Err(_) => Value::String(text),
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Exchange, OrderType, ProductType, TransactionType};
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn normalize_unwraps_encoded_payloads() {
        let encoded = Value::String(r#"{"status":true,"data":{"orderid":"1"}}"#.into());
        assert_eq!(normalize_response(encoded), json!({"status": true, "data": {"orderid": "1"}}));

        let twice = Value::String(json!(r#"{"status":false}"#).to_string());
        assert_eq!(normalize_response(twice), json!({"status": false}));

        let plain = Value::String("Service Unavailable".into());
        assert_eq!(normalize_response(plain.clone()), plain);
    }

    #[test]
    fn order_params_match_wire_format() {
        let order = OrderTemplate {
            stock_name: "TESTCO".into(),
            transaction_type: TransactionType::Buy,
            product_type: ProductType::Delivery,
            exchange: Exchange::Nse,
            order_type: OrderType::Limit,
            price: dec!(101.50),
            quantity: 3,
        };
        let p = serde_json::to_value(build_order_params(&order, "TESTCO-EQ", "999")).unwrap();
        assert_eq!(
            p,
            json!({
                "variety": "NORMAL",
                "tradingsymbol": "TESTCO-EQ",
                "symboltoken": "999",
                "transactiontype": "BUY",
                "exchange": "NSE",
                "ordertype": "LIMIT",
                "producttype": "DELIVERY",
                "duration": "DAY",
                "price": "101.5",
                "squareoff": "0",
                "stoploss": "0",
                "quantity": "3"
            })
        );
    }
}
