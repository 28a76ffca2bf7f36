// tests/common/mod.rs
#![allow(dead_code)]

use async_trait::async_trait;
use orderfan::accounts::Account;
use orderfan::broker::{Broker, Credentials, LoginResponse, OrderParams, Session, SessionTokens};
use orderfan::catalog::{CatalogError, CatalogSource};
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Каталог в памяти со счётчиком запросов
pub struct MemorySource {
    pub doc: Mutex<Value>,
    pub fail: AtomicBool,
    pub fetches: AtomicUsize,
}

impl MemorySource {
    pub fn new(doc: Value) -> Self {
        Self { doc: Mutex::new(doc), fail: AtomicBool::new(false), fetches: AtomicUsize::new(0) }
    }

    pub fn set(&self, doc: Value) {
        *self.doc.lock().unwrap() = doc;
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogSource for MemorySource {
    async fn fetch(&self) -> Result<Value, CatalogError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(CatalogError::Status(503));
        }
        Ok(self.doc.lock().unwrap().clone())
    }
}

pub fn testco_catalog() -> Value {
    json!([
        {"name": "TESTCO", "symbol": "TESTCO-EQ", "exch_seg": "NSE", "token": "111"},
        {"name": "TESTCO", "symbol": "TESTCO", "exch_seg": "BSE", "token": 222},
        {"name": "OTHER", "symbol": "OTHER-BE", "exch_seg": "NSE", "token": "333"}
    ])
}

/// Запись вызова брокера
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Login(String),
    PlaceOrder(String, String),
    Logout(String),
}

/// Брокер по сценарию: ответ на ордер строкой JSON.
/// `deny_login` - брокер отказал во входе, `unreachable` - вход падает с ошибкой сети,
/// `fail_orders` - placeOrder падает с ошибкой сети, `panic_for` - задача счёта паникует на ордере.
#[derive(Default)]
pub struct FakeBroker {
    pub deny_login: HashSet<String>,
    pub unreachable: HashSet<String>,
    pub reject_orders: bool,
    pub fail_orders: bool,
    pub panic_for: HashSet<String>,
    pub calls: Mutex<Vec<Call>>,
}

fn user_set(users: &[&str]) -> HashSet<String> {
    users.iter().map(|u| u.to_string()).collect()
}

impl FakeBroker {
    pub fn denying(users: &[&str]) -> Self {
        Self { deny_login: user_set(users), ..Default::default() }
    }

    pub fn unreachable_for(users: &[&str]) -> Self {
        Self { unreachable: user_set(users), ..Default::default() }
    }

    pub fn panicking_for(users: &[&str]) -> Self {
        Self { panic_for: user_set(users), ..Default::default() }
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn calls_for(&self, user: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| match c {
                Call::Login(u) | Call::Logout(u) | Call::PlaceOrder(u, _) => u == user,
            })
            .collect()
    }
}

#[async_trait]
impl Broker for FakeBroker {
    async fn login(&self, creds: &Credentials<'_>) -> anyhow::Result<LoginResponse> {
        self.record(Call::Login(creds.client_code.to_string()));
        assert_eq!(creds.totp.len(), 6);
        if self.unreachable.contains(creds.client_code) {
            anyhow::bail!("connection reset by peer");
        }
        if self.deny_login.contains(creds.client_code) {
            return Ok(LoginResponse {
                status: false,
                message: "Invalid totp".into(),
                error_code: "AB1050".into(),
                data: None,
            });
        }
        Ok(LoginResponse {
            status: true,
            message: "SUCCESS".into(),
            error_code: String::new(),
            data: Some(SessionTokens {
                jwt_token: format!("jwt-{}", creds.client_code),
                refresh_token: "refresh".into(),
                feed_token: None,
            }),
        })
    }

    async fn place_order(&self, session: &Session, params: &OrderParams) -> anyhow::Result<Value> {
        self.record(Call::PlaceOrder(session.client_code.clone(), params.trading_symbol.clone()));
        assert!(!params.symbol_token.is_empty(), "order without symbol token");
        if self.panic_for.contains(&session.client_code) {
            panic!("broker client crashed for {}", session.client_code);
        }
        if self.fail_orders {
            anyhow::bail!("placeOrder timed out");
        }
        let body = if self.reject_orders {
            json!({"status": false, "message": "RMS rejected", "errorcode": "AB4008", "data": null})
        } else {
            json!({"status": true, "message": "SUCCESS", "data": {"orderid": format!("ord-{}", session.client_code)}})
        };
        // брокер иногда отдаёт JSON строкой
        Ok(Value::String(body.to_string()))
    }

    async fn logout(&self, session: &Session) -> anyhow::Result<()> {
        self.record(Call::Logout(session.client_code.clone()));
        Ok(())
    }
}

pub fn account(name: &str) -> Account {
    Account {
        api_key: format!("key-{}", name),
        username: name.to_string(),
        password: "pw".into(),
        totp_secret: "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ".into(),
        available_funds: dec!(1000.50),
    }
}
