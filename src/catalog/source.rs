// src/catalog/source.rs

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::CatalogError;

/// Откуда берётся каталог. В тестах подменяется на in-memory источник.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch(&self) -> Result<Value, CatalogError>;
}

/// Каталог по HTTP (публичный scrip master брокера)
#[derive(Debug, Clone)]
pub struct HttpCatalogSource {
    client: Client,
    url: String,
}

impl HttpCatalogSource {
    pub fn new(url: &str, timeout_secs: u64) -> anyhow::Result<Self> {
        let client = Client::builder()
            // каталог большой, даём запас по времени
            .timeout(Duration::from_secs(timeout_secs.max(1) * 6))
            .build()
            .map_err(|e| anyhow::anyhow!("HTTP client build error: {}", e))?;
        Ok(Self { client, url: url.to_string() })
    }
}

#[async_trait]
impl CatalogSource for HttpCatalogSource {
    async fn fetch(&self) -> Result<Value, CatalogError> {
        debug!(url = %self.url, "Fetching instrument catalog");
        let resp = self.client.get(&self.url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(CatalogError::Status(status.as_u16()));
        }
        Ok(resp.json::<Value>().await?)
    }
}
