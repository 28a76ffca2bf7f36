// src/storage/db.rs
use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    SqlitePool,
};
use std::{env, path::PathBuf, str::FromStr};
use tracing::{debug, warn};

use super::schema::{apply_migrations, JournalEntry};
use crate::dispatch::{AccountReport, DispatchReport};
use crate::models::OrderTemplate;

#[derive(Debug, Clone)]
pub struct Db {
    pub pool: SqlitePool,
}

impl Db {
    /// Подключается к SQLite, создаёт файл, если его нет,
    /// и заводит таблицу журнала.
    pub async fn connect(path: &str) -> Result<Self> {
        // 1) абсолютный путь к файлу
        let abs_path: PathBuf = {
            let p = PathBuf::from(path);
            if p.is_absolute() {
                p
            } else {
                env::current_dir()?.join(p)
            }
        };

        // 2) создаём папку, если нужна
        if let Some(dir) = abs_path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Не удалось создать директорию {:?}", dir))?;
        }

        let opts = SqliteConnectOptions::new()
            .filename(&abs_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);
        let pool = SqlitePool::connect_with(opts).await?;
        apply_migrations(&pool).await?;

        Ok(Db { pool })
    }

    /// База в памяти, одно соединение (иначе у каждого своя пустая база)
    pub async fn connect_in_memory() -> Result<Self> {
        let opts = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(opts)
            .await?;
        apply_migrations(&pool).await?;
        Ok(Db { pool })
    }
}

pub async fn insert_outcome(
    db: &Db,
    run_id: &str,
    order: &OrderTemplate,
    outcome: &AccountReport,
) -> Result<i64> {
    let (order_id, response, error_message) = match &outcome.result {
        Ok(placed) => (placed.order_id.clone(), Some(placed.response.to_string()), None),
        Err(e) => (None, None, Some(e.to_string())),
    };

    let res = sqlx::query(
        r#"
        INSERT INTO order_journal
            (run_id, account, stock_name, exchange, side, quantity, price, status, order_id, response, error_message, ts)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(run_id)
    .bind(&outcome.account)
    .bind(&order.stock_name)
    .bind(order.exchange.as_str())
    .bind(order.transaction_type.as_str())
    .bind(i64::from(order.quantity))
    .bind(order.price.to_string())
    .bind(outcome.status())
    .bind(order_id)
    .bind(response)
    .bind(error_message)
    .bind(Utc::now().timestamp())
    .execute(&db.pool)
    .await?;

    Ok(res.last_insert_rowid())
}

/// Пишет весь отчёт. Ошибки журнала не должны влиять на результат ордеров,
/// поэтому только логируем их. Возвращает число записанных строк.
pub async fn record_report(db: &Db, order: &OrderTemplate, report: &DispatchReport) -> usize {
    let run_id = report.run_id.to_string();
    let mut written = 0;
    for outcome in &report.outcomes {
        match insert_outcome(db, &run_id, order, outcome).await {
            Ok(id) => {
                debug!("Journal row {} for {}", id, outcome.account);
                written += 1;
            }
            Err(e) => warn!("Failed to journal outcome for {}: {:#}", outcome.account, e),
        }
    }
    written
}

pub async fn recent_orders(db: &Db, limit: i64) -> Result<Vec<JournalEntry>> {
    let rows = sqlx::query_as::<_, JournalEntry>(
        r#"
        SELECT * FROM order_journal
        ORDER BY id DESC
        LIMIT ?
        "#,
    )
    .bind(limit)
    .fetch_all(&db.pool)
    .await?;
    Ok(rows)
}

pub async fn orders_for_run(db: &Db, run_id: &str) -> Result<Vec<JournalEntry>> {
    let rows = sqlx::query_as::<_, JournalEntry>(
        "SELECT * FROM order_journal WHERE run_id = ? ORDER BY id",
    )
    .bind(run_id)
    .fetch_all(&db.pool)
    .await?;
    Ok(rows)
}
