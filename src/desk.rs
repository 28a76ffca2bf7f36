// src/desk.rs

use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tracing::info;

use crate::accounts::Account;
use crate::broker::Broker;
use crate::catalog::{CatalogCache, RefreshStatus};
use crate::dispatch::{DispatchEvent, DispatchHandle, DispatchReport, Dispatcher};
use crate::models::{OrderForm, OrderTemplate};
use crate::storage::{record_report, Db};

/// Ошибки ввода: показываются пользователю до обработки счетов
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeskError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("no accounts selected")]
    NoAccountsSelected,
    #[error("no account at position {}", .0 + 1)]
    UnknownAccount(usize),
}

/// То, с чем работают интерфейсы: счета, каталог, раздача ордеров и журнал
pub struct TradingDesk<B> {
    accounts: Vec<Account>,
    catalog: Arc<CatalogCache>,
    dispatcher: Dispatcher<B>,
    journal: Option<Db>,
}

impl<B> TradingDesk<B>
where
    B: Broker + 'static,
{
    pub fn new(
        accounts: Vec<Account>,
        catalog: Arc<CatalogCache>,
        dispatcher: Dispatcher<B>,
        journal: Option<Db>,
    ) -> Self {
        Self { accounts, catalog, dispatcher, journal }
    }

    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    pub fn catalog(&self) -> &CatalogCache {
        &self.catalog
    }

    pub fn journal(&self) -> Option<&Db> {
        self.journal.as_ref()
    }

    /// Выбранные счета по номерам строк списка (с нуля), в порядке списка, без повторов.
    /// Имена в CSV могут повторяться, поэтому выбор идёт по строке, а не по имени.
    pub fn select(&self, selected: &[usize]) -> Result<Vec<Account>, DeskError> {
        if selected.is_empty() {
            return Err(DeskError::NoAccountsSelected);
        }
        if let Some(&missing) = selected.iter().find(|&&i| i >= self.accounts.len()) {
            return Err(DeskError::UnknownAccount(missing));
        }
        let wanted: BTreeSet<usize> = selected.iter().copied().collect();
        Ok(wanted.into_iter().map(|i| self.accounts[i].clone()).collect())
    }

    /// Проверка формы, обновление каталога и запуск всех счетов.
    /// Каталог обновляется до старта задач, дальше они читают один снимок.
    pub async fn begin(
        &self,
        form: &OrderForm,
        selected: &[usize],
        events: Option<UnboundedSender<DispatchEvent>>,
    ) -> Result<(OrderTemplate, DispatchHandle), DeskError> {
        let order = form.validate().map_err(DeskError::InvalidInput)?;
        let accounts = self.select(selected)?;

        let refresh = self.catalog.refresh().await;
        if refresh.status == RefreshStatus::Unavailable && refresh.snapshot.is_empty() {
            info!("Dispatching without instrument catalog, every account will report an unresolved symbol");
        }

        for account in &accounts {
            info!("Username: {}", account.username);
            info!("Available Funds: {}", account.available_funds);
        }

        let handle = self
            .dispatcher
            .spawn(accounts, order.clone(), refresh.snapshot, events);
        Ok((order, handle))
    }

    /// Пишет отчёт в журнал, если он включён
    pub async fn finish(&self, order: &OrderTemplate, report: &DispatchReport) {
        if let Some(db) = &self.journal {
            record_report(db, order, report).await;
        }
    }

    pub async fn place(&self, form: &OrderForm, selected: &[usize]) -> Result<DispatchReport, DeskError> {
        let (order, handle) = self.begin(form, selected, None).await?;
        let report = handle.wait().await;
        self.finish(&order, &report).await;
        Ok(report)
    }
}
