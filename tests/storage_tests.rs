// tests/storage_tests.rs

use chrono::Utc;
use orderfan::dispatch::{AccountReport, DispatchReport, PlacedOrder, SubmitError};
use orderfan::models::OrderForm;
use orderfan::storage::{insert_outcome, recent_orders, record_report, Db};
use rust_decimal_macros::dec;
use serde_json::json;
use uuid::Uuid;

fn placed(id: &str) -> PlacedOrder {
    PlacedOrder {
        trading_symbol: "TESTCO-EQ".into(),
        token: "111".into(),
        response: json!({"status": true, "data": {"orderid": id}}),
        accepted: true,
        order_id: Some(id.into()),
    }
}

#[tokio::test]
async fn report_rows_round_trip() {
    let db = Db::connect_in_memory().await.unwrap();
    let order = OrderForm {
        stock_name: "TESTCO".into(),
        transaction_type: "SELL".into(),
        order_type: "LIMIT".into(),
        price: "101.50".into(),
        quantity: "4".into(),
        ..Default::default()
    }
    .validate()
    .unwrap();

    let report = DispatchReport {
        run_id: Uuid::new_v4(),
        started_at: Utc::now(),
        finished_at: Utc::now(),
        outcomes: vec![
            AccountReport { account: "alice".into(), available_funds: dec!(10), result: Ok(placed("A1")) },
            AccountReport {
                account: "bob".into(),
                available_funds: dec!(20),
                result: Err(SubmitError::SymbolUnresolved { stock: "TESTCO".into(), exchange: "NSE".into() }),
            },
        ],
    };

    assert_eq!(record_report(&db, &order, &report).await, 2);

    let rows = recent_orders(&db, 10).await.unwrap();
    assert_eq!(rows.len(), 2);
    // новые сверху
    assert_eq!(rows[0].account, "bob");
    assert_eq!(rows[0].status, "Unresolved");
    assert_eq!(rows[0].response, None);
    assert_eq!(rows[1].account, "alice");
    assert_eq!(rows[1].side, "SELL");
    assert_eq!(rows[1].exchange, "NSE");
    assert_eq!(rows[1].quantity, 4);
    assert_eq!(rows[1].price, "101.50");
    assert_eq!(rows[1].order_id.as_deref(), Some("A1"));
    assert!(rows.iter().all(|r| r.run_id == report.run_id.to_string()));
}

#[tokio::test]
async fn limit_is_respected() {
    let db = Db::connect_in_memory().await.unwrap();
    let order = OrderForm { stock_name: "X".into(), quantity: "1".into(), ..Default::default() }
        .validate()
        .unwrap();
    for i in 0..5 {
        let outcome = AccountReport { account: format!("u{}", i), available_funds: dec!(0), result: Ok(placed("1")) };
        insert_outcome(&db, "run", &order, &outcome).await.unwrap();
    }
    assert_eq!(recent_orders(&db, 3).await.unwrap().len(), 3);
}

#[tokio::test]
async fn journal_file_is_created() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("journal.sqlite");
    let db = Db::connect(path.to_str().unwrap()).await.unwrap();
    assert!(path.exists());
    assert!(recent_orders(&db, 1).await.unwrap().is_empty());
}
