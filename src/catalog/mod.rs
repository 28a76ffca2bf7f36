// src/catalog/mod.rs

mod cache;
mod source;
mod types;

use thiserror::Error;

pub use cache::{content_digest, CatalogCache, CatalogSnapshot, Refresh, RefreshStatus};
pub use source::{CatalogSource, HttpCatalogSource};
pub use types::{Instrument, RawInstrument, ResolvedSymbol, SuffixPolicy, EQUITY_SUFFIX};

/// Каталог недоступен: кэш остаётся прежним
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("catalog endpoint returned status {0}")]
    Status(u16),
    #[error("unexpected catalog format: {0}")]
    Format(String),
}
