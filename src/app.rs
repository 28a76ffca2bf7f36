// src/app.rs

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::accounts::load_accounts;
use crate::broker::SmartApi;
use crate::catalog::{CatalogCache, HttpCatalogSource};
use crate::config::Config;
use crate::desk::TradingDesk;
use crate::dispatch::Dispatcher;
use crate::forecast::{Forecaster, TickerDirectory, YahooHistory};
use crate::storage::Db;

/// Всё, что нужно интерфейсам
pub struct App {
    pub config: Config,
    pub desk: TradingDesk<SmartApi>,
    pub forecaster: Forecaster<YahooHistory>,
}

impl App {
    pub async fn build(config: Config) -> Result<Self> {
        // Без списка счетов работаем дальше, интерфейс покажет пустой список
        let accounts = match load_accounts(&config.accounts_path) {
            Ok(accounts) => accounts,
            Err(e) => {
                error!("{:#}", e);
                Vec::new()
            }
        };

        let journal = match &config.sqlite_path {
            Some(path) => {
                let db = Db::connect(path).await?;
                info!("Order journal: {}", path);
                Some(db)
            }
            None => None,
        };

        let source = HttpCatalogSource::new(&config.catalog.url, config.broker.request_timeout_secs)?;
        let catalog = Arc::new(CatalogCache::new(Arc::new(source), config.catalog.suffix_policy));

        let broker = Arc::new(SmartApi::new(&config.broker)?);
        let dispatcher = Dispatcher::new(
            broker,
            config.totp.clone(),
            Duration::from_millis(config.dispatch.poll_interval_ms),
        );
        let desk = TradingDesk::new(accounts, catalog, dispatcher, journal);

        let history = YahooHistory::new(&config.forecast.history_url, config.broker.request_timeout_secs)?;
        // Без справочника названия компаний не распознаются, тикеры работают
        let directory = match TickerDirectory::load(&config.forecast.tickers_path) {
            Ok(dir) => dir,
            Err(e) => {
                warn!("{:#}", e);
                TickerDirectory::default()
            }
        };
        let forecaster = Forecaster::new(history, config.forecast.clone()).with_directory(directory);

        Ok(Self { config, desk, forecaster })
    }
}
