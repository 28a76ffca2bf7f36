// src/storage/mod.rs

pub mod db;
pub mod schema;

pub use db::Db;
pub use db::{insert_outcome, orders_for_run, recent_orders, record_report};
pub use schema::JournalEntry;
