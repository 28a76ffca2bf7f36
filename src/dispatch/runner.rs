// src/dispatch/runner.rs

use chrono::Utc;
use rust_decimal::Decimal;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{error, info};
use uuid::Uuid;

use super::submit::OrderClient;
use super::{AccountReport, DispatchReport, PlacedOrder, SubmitError};
use crate::accounts::Account;
use crate::broker::Broker;
use crate::catalog::CatalogSnapshot;
use crate::config::TotpConfig;
use crate::models::OrderTemplate;

/// События для интерфейса. `Completed` приходит один раз на весь запуск.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchEvent {
    Started { run_id: Uuid, account: String },
    Finished { run_id: Uuid, account: String, status: &'static str },
    Completed { run_id: Uuid, accepted: usize, failed: usize },
}

/// Раздаёт один и тот же ордер по выбранным счетам, по задаче tokio на счёт.
pub struct Dispatcher<B> {
    client: OrderClient<B>,
    poll_interval: Duration,
}

impl<B> Dispatcher<B>
where
    B: Broker + 'static,
{
    pub fn new(broker: Arc<B>, totp: TotpConfig, poll_interval: Duration) -> Self {
        Self {
            client: OrderClient::new(broker, totp),
            // interval() паникует на нуле
            poll_interval: poll_interval.max(Duration::from_millis(10)),
        }
    }

    /// Запускает все счета сразу и возвращает ручку для ожидания.
    /// Снимок каталога к этому моменту уже обновлён и дальше не меняется.
    pub fn spawn(
        &self,
        accounts: Vec<Account>,
        order: OrderTemplate,
        catalog: Arc<CatalogSnapshot>,
        events: Option<UnboundedSender<DispatchEvent>>,
    ) -> DispatchHandle {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let order = Arc::new(order);
        info!(%run_id, "Dispatching {} to {} accounts", order.stock_name, accounts.len());

        let units = accounts
            .into_iter()
            .map(|account| {
                let name = account.username.clone();
                let available_funds = account.available_funds;
                let client = self.client.clone();
                let order = order.clone();
                let catalog = catalog.clone();
                let events = events.clone();

                if let Some(tx) = &events {
                    let _ = tx.send(DispatchEvent::Started { run_id, account: name.clone() });
                }

                let handle = tokio::spawn(async move {
                    let result = client.submit(&account, &order, &catalog).await;
                    if let Some(tx) = &events {
                        let status = match &result {
                            Ok(p) if p.accepted => "Accepted",
                            Ok(_) => "Rejected",
                            Err(e) => e.kind(),
                        };
                        let _ = tx.send(DispatchEvent::Finished {
                            run_id,
                            account: account.username.clone(),
                            status,
                        });
                    }
                    result
                });

                Unit { account: name, available_funds, handle }
            })
            .collect();

        DispatchHandle {
            run_id,
            started_at,
            units,
            poll_interval: self.poll_interval,
            events,
        }
    }

    /// Запустить и дождаться всех счетов
    pub async fn dispatch(
        &self,
        accounts: Vec<Account>,
        order: OrderTemplate,
        catalog: Arc<CatalogSnapshot>,
    ) -> DispatchReport {
        self.spawn(accounts, order, catalog, None).wait().await
    }
}

struct Unit {
    account: String,
    available_funds: Decimal,
    handle: JoinHandle<Result<PlacedOrder, SubmitError>>,
}

/// Ручка запущенной раздачи. Отмены нет: начатый счёт доходит до конца.
pub struct DispatchHandle {
    run_id: Uuid,
    started_at: chrono::DateTime<Utc>,
    units: Vec<Unit>,
    poll_interval: Duration,
    events: Option<UnboundedSender<DispatchEvent>>,
}

impl DispatchHandle {
    pub fn run_id(&self) -> Uuid { self.run_id }
    pub fn total(&self) -> usize { self.units.len() }

    pub fn pending(&self) -> usize {
        self.units.iter().filter(|u| !u.handle.is_finished()).count()
    }

    /// Ждёт все счета. Паника внутри задачи становится ошибкой только этого счёта.
    pub async fn wait(self) -> DispatchReport {
        let mut outcomes = Vec::with_capacity(self.units.len());
        for unit in self.units {
            let result = match unit.handle.await {
                Ok(result) => result,
                Err(e) => {
                    error!("Order task for {} did not complete: {}", unit.account, e);
                    Err(SubmitError::Submission(anyhow::anyhow!("order task aborted: {}", e)))
                }
            };
            outcomes.push(AccountReport {
                account: unit.account,
                available_funds: unit.available_funds,
                result,
            });
        }

        let report = DispatchReport {
            run_id: self.run_id,
            started_at: self.started_at,
            finished_at: Utc::now(),
            outcomes,
        };
        info!(run_id = %report.run_id, "{}", report.summary());
        if let Some(tx) = &self.events {
            let _ = tx.send(DispatchEvent::Completed {
                run_id: report.run_id,
                accepted: report.accepted(),
                failed: report.failed(),
            });
        }
        report
    }

    /// Опрос с фиксированным интервалом: `on_tick(done, total)` на каждом тике,
    /// отчёт возвращается один раз, когда закончились все счета.
    pub async fn wait_polling<F, Fut>(self, mut on_tick: F) -> DispatchReport
    where
        F: FnMut(usize, usize) -> Fut,
        Fut: Future<Output = ()>,
    {
        let total = self.total();
        let mut ticker = tokio::time::interval(self.poll_interval);
        loop {
            ticker.tick().await;
            let pending = self.pending();
            on_tick(total - pending, total).await;
            if pending == 0 {
                break;
            }
        }
        self.wait().await
    }
}
