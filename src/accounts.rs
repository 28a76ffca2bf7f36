// src/accounts.rs

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::fmt;
use std::io::Read;
use std::path::Path;
use tracing::info;

/// Торговый счёт из CSV (`api_key, username, password, demo_token, available_funds`)
#[derive(Clone, Deserialize)]
pub struct Account {
    pub api_key: String,
    pub username: String,
    pub password: String,
    #[serde(rename = "demo_token")]
    pub totp_secret: String,
    pub available_funds: Decimal,
}

// Секреты в логи не пишем
impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("username", &self.username)
            .field("available_funds", &self.available_funds)
            .finish_non_exhaustive()
    }
}

pub fn load_accounts(path: impl AsRef<Path>) -> Result<Vec<Account>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)
        .with_context(|| format!("Не удалось открыть список счетов {:?}", path))?;
    let accounts = read_accounts(file).with_context(|| format!("Bad account list {:?}", path))?;
    info!("Loaded {} accounts from {:?}", accounts.len(), path);
    Ok(accounts)
}

pub fn read_accounts<R: Read>(reader: R) -> Result<Vec<Account>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut accounts = Vec::new();
    for (idx, row) in rdr.deserialize::<Account>().enumerate() {
        // +2: заголовок и нумерация с единицы
        let account = row.with_context(|| format!("row {}", idx + 2))?;
        accounts.push(account);
    }
    Ok(accounts)
}
