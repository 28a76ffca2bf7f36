// src/broker/smartapi.rs

use super::types::{Credentials, LoginResponse, OrderParams, Session};
use super::Broker;
use crate::config::BrokerConfig;
use anyhow::{anyhow, Context, Result};
use reqwest::{Client, Method, RequestBuilder};
use url::Url;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

const LOGIN_ENDPOINT: &str = "rest/auth/angelbroking/user/v1/loginByPassword";
const PLACE_ORDER_ENDPOINT: &str = "rest/secure/angelbroking/order/v1/placeOrder";
const LOGOUT_ENDPOINT: &str = "rest/secure/angelbroking/user/v1/logout";

/// Клиент SmartAPI
#[derive(Debug, Clone)]
pub struct SmartApi {
    client: Client,
    base_url: Url,
    local_ip: String,
    public_ip: String,
    mac_address: String,
    source_id: String,
    user_type: String,
}

impl SmartApi {
    pub fn new(cfg: &BrokerConfig) -> Result<Self> {
        // join() отрезает последний сегмент пути, если нет завершающего `/`
        let raw = if cfg.base_url.ends_with('/') {
            cfg.base_url.clone()
        } else {
            format!("{}/", cfg.base_url)
        };
        let base_url = Url::parse(&raw)
            .map_err(|e| anyhow!("Invalid broker URL `{}`: {}", cfg.base_url, e))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.request_timeout_secs))
            .build()
            .map_err(|e| anyhow!("HTTP client build error: {}", e))?;

        Ok(Self {
            client,
            base_url,
            local_ip: cfg.client_local_ip.clone(),
            public_ip: cfg.client_public_ip.clone(),
            mac_address: cfg.mac_address.clone(),
            source_id: cfg.source_id.clone(),
            user_type: cfg.user_type.clone(),
        })
    }

    fn request(&self, method: Method, endpoint: &str, api_key: &str) -> Result<RequestBuilder> {
        let url = self.base_url.join(endpoint)?;
        Ok(self
            .client
            .request(method, url)
            .header("Accept", "application/json")
            .header("X-UserType", &self.user_type)
            .header("X-SourceID", &self.source_id)
            .header("X-ClientLocalIP", &self.local_ip)
            .header("X-ClientPublicIP", &self.public_ip)
            .header("X-MACAddress", &self.mac_address)
            .header("X-PrivateKey", api_key))
    }

    fn secure(&self, method: Method, endpoint: &str, session: &Session) -> Result<RequestBuilder> {
        Ok(self
            .request(method, endpoint, &session.api_key)?
            .bearer_auth(&session.jwt_token))
    }

    /// Тело ответа как JSON, а если это не JSON, то строкой
    async fn read_body(req: RequestBuilder) -> Result<(u16, Value)> {
        let resp = req.send().await?;
        let status = resp.status().as_u16();
        let text = resp.text().await?;
        let body = serde_json::from_str::<Value>(&text).unwrap_or(Value::String(text));
        Ok((status, body))
    }
}

#[async_trait::async_trait]
impl Broker for SmartApi {
    /// POST loginByPassword
    async fn login(&self, creds: &Credentials<'_>) -> Result<LoginResponse> {
        let body = json!({
            "clientcode": creds.client_code,
            "password": creds.password,
            "totp": creds.totp,
        });
        let req = self.request(Method::POST, LOGIN_ENDPOINT, creds.api_key)?.json(&body);
        let (status, body) = Self::read_body(req).await?;
        debug!(client = creds.client_code, status, "Login response received");

        let text = body.to_string();
        let de = &mut serde_json::Deserializer::from_str(&text);
        let parsed: LoginResponse = serde_path_to_error::deserialize(de)
            .with_context(|| format!("Unexpected login response (HTTP {}): {}", status, text))?;
        Ok(parsed)
    }

    /// POST placeOrder
    async fn place_order(&self, session: &Session, params: &OrderParams) -> Result<Value> {
        let req = self
            .secure(Method::POST, PLACE_ORDER_ENDPOINT, session)?
            .json(params);
        let (status, body) = Self::read_body(req).await?;
        debug!(client = %session.client_code, status, "placeOrder response received");
        Ok(body)
    }

    /// POST logout
    async fn logout(&self, session: &Session) -> Result<()> {
        let req = self
            .secure(Method::POST, LOGOUT_ENDPOINT, session)?
            .json(&json!({ "clientcode": session.client_code }));
        let (status, body) = Self::read_body(req).await?;
        if !(200..300).contains(&status) {
            return Err(anyhow!("Logout failed with HTTP {}: {}", status, body));
        }
        Ok(())
    }
}
