// tests/desk_tests.rs

mod common;

use common::{account, testco_catalog, Call, FakeBroker, MemorySource};
use orderfan::catalog::{CatalogCache, SuffixPolicy};
use orderfan::config::TotpConfig;
use orderfan::desk::{DeskError, TradingDesk};
use orderfan::dispatch::{Dispatcher, SubmitError};
use orderfan::models::OrderForm;
use orderfan::storage::{orders_for_run, Db};
use rust_decimal_macros::dec;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

struct Fixture {
    desk: TradingDesk<FakeBroker>,
    broker: Arc<FakeBroker>,
    source: Arc<MemorySource>,
}

async fn fixture(broker: FakeBroker, journal: Option<Db>) -> Fixture {
    let broker = Arc::new(broker);
    let source = Arc::new(MemorySource::new(testco_catalog()));
    let catalog = Arc::new(CatalogCache::new(source.clone(), SuffixPolicy::Asymmetric));
    let dispatcher = Dispatcher::new(broker.clone(), TotpConfig::default(), Duration::from_millis(10));
    let desk = TradingDesk::new(
        vec![account("alice"), account("bob"), account("carol")],
        catalog,
        dispatcher,
        journal,
    );
    Fixture { desk, broker, source }
}

fn form(stock: &str, quantity: &str) -> OrderForm {
    OrderForm {
        stock_name: stock.into(),
        quantity: quantity.into(),
        ..Default::default()
    }
}

const ALICE: usize = 0;
const BOB: usize = 1;
const CAROL: usize = 2;

#[tokio::test]
async fn invalid_input_never_reaches_broker() {
    let fx = fixture(FakeBroker::default(), None).await;

    let err = fx.desk.place(&form("", "1"), &[ALICE]).await.unwrap_err();
    assert!(matches!(err, DeskError::InvalidInput(_)));

    let err = fx.desk.place(&form("TESTCO", "0"), &[ALICE]).await.unwrap_err();
    assert!(matches!(err, DeskError::InvalidInput(_)));

    let mut limit = form("TESTCO", "1");
    limit.order_type = "LIMIT".into();
    let err = fx.desk.place(&limit, &[ALICE]).await.unwrap_err();
    assert!(matches!(err, DeskError::InvalidInput(_)));

    let err = fx.desk.place(&form("TESTCO", "1"), &[]).await.unwrap_err();
    assert_eq!(err, DeskError::NoAccountsSelected);

    let err = fx.desk.place(&form("TESTCO", "1"), &[ALICE, 7]).await.unwrap_err();
    assert_eq!(err, DeskError::UnknownAccount(7));
    assert_eq!(err.to_string(), "no account at position 8");

    assert!(fx.broker.calls().is_empty());
    // каталог тоже не трогали
    assert_eq!(fx.source.fetches(), 0);
}

#[tokio::test]
async fn selection_keeps_list_order_without_duplicates() {
    let fx = fixture(FakeBroker::default(), None).await;
    let picked = fx.desk.select(&[CAROL, ALICE, CAROL]).unwrap();
    let picked: Vec<_> = picked.iter().map(|a| a.username.as_str()).collect();
    assert_eq!(picked, vec!["alice", "carol"]);
}

#[tokio::test]
async fn place_refreshes_catalog_and_fans_out() {
    let fx = fixture(FakeBroker::denying(&["bob"]), None).await;
    let report = fx
        .desk
        .place(&form("testco", "3"), &[ALICE, BOB])
        .await
        .unwrap();

    assert_eq!(fx.source.fetches(), 1);
    assert_eq!(report.outcomes.len(), 2);
    assert_eq!(report.get("alice").unwrap().status(), "Accepted");
    assert_eq!(report.get("bob").unwrap().status(), "AuthFailed");
    assert!(!fx.broker.calls().contains(&Call::Login("carol".into())));
}

#[tokio::test]
async fn outcomes_are_journaled() {
    let db = Db::connect_in_memory().await.unwrap();
    let fx = fixture(FakeBroker::denying(&["bob"]), Some(db.clone())).await;
    let report = fx
        .desk
        .place(&form("TESTCO", "2"), &[ALICE, BOB])
        .await
        .unwrap();

    let rows = orders_for_run(&db, &report.run_id.to_string()).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].account, "alice");
    assert_eq!(rows[0].status, "Accepted");
    assert_eq!(rows[0].order_id.as_deref(), Some("ord-alice"));
    assert_eq!(rows[1].status, "AuthFailed");
    assert!(rows[1].error_message.is_some());
}

#[tokio::test]
async fn unavailable_catalog_still_reports_every_account() {
    let fx = fixture(FakeBroker::default(), None).await;
    fx.source.fail.store(true, Ordering::SeqCst);

    let report = fx
        .desk
        .place(&form("TESTCO", "1"), &[ALICE, BOB, CAROL])
        .await
        .unwrap();

    assert_eq!(fx.source.fetches(), 1);
    assert_eq!(report.outcomes.len(), 3);
    for outcome in &report.outcomes {
        assert!(
            matches!(outcome.result, Err(SubmitError::SymbolUnresolved { .. })),
            "{}: {:?}",
            outcome.account,
            outcome.result
        );
    }
    assert!(!fx.broker.calls().iter().any(|c| matches!(c, Call::PlaceOrder(..))));
    // сессии всё равно закрыты
    for name in ["alice", "bob", "carol"] {
        assert_eq!(fx.broker.calls_for(name).last(), Some(&Call::Logout(name.into())));
    }
}

#[tokio::test]
async fn duplicate_usernames_are_picked_by_row() {
    let broker = Arc::new(FakeBroker::default());
    let source = Arc::new(MemorySource::new(testco_catalog()));
    let catalog = Arc::new(CatalogCache::new(source, SuffixPolicy::Asymmetric));
    let dispatcher = Dispatcher::new(broker.clone(), TotpConfig::default(), Duration::from_millis(10));

    let first = account("twin");
    let mut second = account("twin");
    second.available_funds = dec!(5);
    let desk = TradingDesk::new(vec![first, second], catalog, dispatcher, None);

    let report = desk.place(&form("TESTCO", "1"), &[1]).await.unwrap();
    assert_eq!(report.outcomes.len(), 1);
    assert_eq!(report.outcomes[0].available_funds, dec!(5));
    assert_eq!(broker.calls_for("twin").len(), 3);

    let both = desk.select(&[1, 0]).unwrap();
    let funds: Vec<_> = both.iter().map(|a| a.available_funds).collect();
    assert_eq!(funds, vec![dec!(1000.50), dec!(5)]);
}
