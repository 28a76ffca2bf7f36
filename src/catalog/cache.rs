// src/catalog/cache.rs

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex as TokioMutex;
use tracing::{debug, info, warn};

use super::source::CatalogSource;
use super::types::{Instrument, RawInstrument, ResolvedSymbol, SuffixPolicy};
use super::CatalogError;

/// Неизменяемый снимок каталога. Заменяется только целиком.
#[derive(Debug)]
pub struct CatalogSnapshot {
    instruments: Vec<Instrument>,
    // (ИМЯ, БИРЖА) в верхнем регистре -> индексы в порядке каталога
    index: HashMap<(String, String), Vec<usize>>,
    digest: Option<String>,
    fetched_at: Option<DateTime<Utc>>,
    policy: SuffixPolicy,
}

impl CatalogSnapshot {
    pub fn empty(policy: SuffixPolicy) -> Self {
        Self {
            instruments: Vec::new(),
            index: HashMap::new(),
            digest: None,
            fetched_at: None,
            policy,
        }
    }

    pub fn from_instruments(
        instruments: Vec<Instrument>,
        digest: Option<String>,
        policy: SuffixPolicy,
    ) -> Self {
        let mut index: HashMap<(String, String), Vec<usize>> = HashMap::new();
        for (i, inst) in instruments.iter().enumerate() {
            let key = (
                inst.display_name.to_uppercase(),
                inst.exchange_segment.to_uppercase(),
            );
            index.entry(key).or_default().push(i);
        }
        Self {
            instruments,
            index,
            digest,
            fetched_at: Some(Utc::now()),
            policy,
        }
    }

    /// Имя и биржа сравниваются без учёта регистра, дальше работает `SuffixPolicy`.
    /// Записи без токена не подходят: ордер без него брокер не примет.
    /// Если подходящих записей несколько, берём первую по порядку каталога.
    pub fn resolve(&self, display_name: &str, exchange: &str) -> Option<ResolvedSymbol> {
        let name = display_name.trim().to_uppercase();
        let exchange = exchange.trim().to_uppercase();
        let candidates = self.index.get(&(name, exchange.clone()))?;
        candidates
            .iter()
            .map(|&i| &self.instruments[i])
            .filter(|inst| !inst.token.trim().is_empty())
            .find_map(|inst| {
                let symbol = inst.trading_symbol.to_uppercase();
                self.policy
                    .is_eligible(&exchange, &symbol)
                    .then(|| ResolvedSymbol { trading_symbol: symbol, token: inst.token.clone() })
            })
    }

    pub fn len(&self) -> usize { self.instruments.len() }
    pub fn is_empty(&self) -> bool { self.instruments.is_empty() }
    pub fn digest(&self) -> Option<&str> { self.digest.as_deref() }
    pub fn fetched_at(&self) -> Option<DateTime<Utc>> { self.fetched_at }
    pub fn policy(&self) -> SuffixPolicy { self.policy }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshStatus {
    /// Содержимое изменилось, снимок заменён
    Updated,
    /// Хеш совпал, снимок тот же
    Unchanged,
    /// Каталог недоступен, остался прежний снимок
    Unavailable,
}

#[derive(Debug, Clone)]
pub struct Refresh {
    pub snapshot: Arc<CatalogSnapshot>,
    pub status: RefreshStatus,
}

/// Кэш каталога: владеет текущим снимком и умеет его обновлять.
pub struct CatalogCache {
    source: Arc<dyn CatalogSource>,
    policy: SuffixPolicy,
    current: RwLock<Arc<CatalogSnapshot>>,
    // одновременно идёт не больше одного обновления
    refresh_lock: TokioMutex<()>,
}

impl CatalogCache {
    pub fn new(source: Arc<dyn CatalogSource>, policy: SuffixPolicy) -> Self {
        Self {
            source,
            policy,
            current: RwLock::new(Arc::new(CatalogSnapshot::empty(policy))),
            refresh_lock: TokioMutex::new(()),
        }
    }

    pub fn snapshot(&self) -> Arc<CatalogSnapshot> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Скачивает каталог и заменяет снимок, только если изменился хеш.
    /// Ошибки сети и формата не пробрасываются: пишем в лог и оставляем старый снимок.
    pub async fn refresh(&self) -> Refresh {
        let _guard = self.refresh_lock.lock().await;
        let current = self.snapshot();

        match self.try_refresh(&current).await {
            Ok(Some(next)) => {
                info!(
                    "Instrument catalog has been updated: {} records, digest {}",
                    next.len(),
                    next.digest().unwrap_or("-")
                );
                let next = Arc::new(next);
                *self.current.write().unwrap_or_else(|e| e.into_inner()) = next.clone();
                Refresh { snapshot: next, status: RefreshStatus::Updated }
            }
            Ok(None) => {
                info!("Instrument catalog has not been updated.");
                Refresh { snapshot: current, status: RefreshStatus::Unchanged }
            }
            Err(e) => {
                warn!(
                    "Failed to fetch instrument catalog: {}. Keeping previous snapshot ({} records).",
                    e,
                    current.len()
                );
                Refresh { snapshot: current, status: RefreshStatus::Unavailable }
            }
        }
    }

    async fn try_refresh(&self, current: &CatalogSnapshot) -> Result<Option<CatalogSnapshot>, CatalogError> {
        let doc = self.source.fetch().await?;
        let digest = content_digest(&doc);
        if current.digest() == Some(digest.as_str()) {
            return Ok(None);
        }

        let Value::Array(items) = doc else {
            return Err(CatalogError::Format("catalog root is not an array".into()));
        };

        let mut skipped = 0usize;
        let instruments: Vec<Instrument> = items
            .into_iter()
            .filter_map(|item| match serde_json::from_value::<RawInstrument>(item) {
                Ok(raw) => Some(Instrument::from(raw)),
                Err(_) => {
                    skipped += 1;
                    None
                }
            })
            .collect();
        if skipped > 0 {
            debug!("Skipped {} malformed catalog entries", skipped);
        }

        Ok(Some(CatalogSnapshot::from_instruments(instruments, Some(digest), self.policy)))
    }
}

/// SHA-256 от канонического JSON (ключи объектов отсортированы)
pub fn content_digest(doc: &Value) -> String {
    let canonical = canonicalize(doc).to_string();
    hex::encode(Sha256::digest(canonical.as_bytes()))
}

fn canonicalize(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = Map::new();
            for k in keys {
                sorted.insert(k.clone(), canonicalize(&map[k]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}
