// src/forecast/tickers.rs

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::info;

#[derive(Deserialize)]
struct TickerRow {
    #[serde(rename = "Company Name")]
    company: String,
    #[serde(rename = "Ticker")]
    ticker: String,
}

/// Справочник «название компании -> тикер» (`Company Name,Ticker`)
#[derive(Debug, Clone, Default)]
pub struct TickerDirectory {
    by_name: HashMap<String, String>,
}

impl TickerDirectory {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .with_context(|| format!("Не удалось открыть справочник тикеров {:?}", path))?;
        let dir = Self::read(file).with_context(|| format!("Bad ticker directory {:?}", path))?;
        info!("Loaded {} company tickers from {:?}", dir.len(), path);
        Ok(dir)
    }

    pub fn read<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut by_name = HashMap::new();
        for (idx, row) in rdr.deserialize::<TickerRow>().enumerate() {
            let row = row.with_context(|| format!("row {}", idx + 2))?;
            if row.company.is_empty() || row.ticker.is_empty() {
                continue;
            }
            // первая строка с таким названием побеждает
            by_name.entry(row.company.to_uppercase()).or_insert(row.ticker);
        }
        Ok(Self { by_name })
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Название из справочника -> его тикер, всё остальное считаем тикером как есть
    pub fn resolve(&self, input: &str) -> String {
        let key = input.trim().to_uppercase();
        self.by_name.get(&key).cloned().unwrap_or(key)
    }
}
