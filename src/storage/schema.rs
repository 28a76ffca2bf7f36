// src/storage/schema.rs

//! Схема журнала ордеров в SQLite.

use serde::Serialize;
use sqlx::sqlite::SqlitePool;
use sqlx::{Error, FromRow};
use tracing::info;

/// Создаёт таблицы, если их ещё нет. Можно вызывать повторно.
pub async fn apply_migrations(pool: &SqlitePool) -> Result<(), Error> {
    info!("Applying database migrations...");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS order_journal (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            run_id TEXT NOT NULL,
            account TEXT NOT NULL,
            stock_name TEXT NOT NULL,
            exchange TEXT NOT NULL,
            side TEXT NOT NULL,
            quantity INTEGER NOT NULL,
            price TEXT NOT NULL,
            status TEXT NOT NULL CHECK(status IN ('Accepted', 'Rejected', 'AuthFailed', 'Unresolved', 'Failed')),
            order_id TEXT,
            response TEXT,
            error_message TEXT,
            ts INTEGER NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_order_journal_run
        ON order_journal (run_id);
        "#,
    )
    .execute(pool)
    .await?;

    info!("Database migrations applied successfully.");
    Ok(())
}

/// Строка журнала
#[derive(Debug, FromRow, Clone, Serialize)]
pub struct JournalEntry {
    pub id: i64,
    pub run_id: String,
    pub account: String,
    pub stock_name: String,
    pub exchange: String,
    pub side: String,
    pub quantity: i64,
    pub price: String,
    pub status: String, // "Accepted", "Rejected", "AuthFailed", "Unresolved", "Failed"
    pub order_id: Option<String>,
    pub response: Option<String>,
    pub error_message: Option<String>,
    pub ts: i64,
}
