// src/frontend/console.rs

use anyhow::Result;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::mpsc;

use super::parse_selection;
use crate::app::App;
use crate::dispatch::DispatchEvent;
use crate::forecast::market::INTRADAY_TAIL;
use crate::forecast::{split_tickers, RANGES};
use crate::models::OrderForm;
use crate::storage::recent_orders;

struct Prompt {
    lines: Lines<BufReader<Stdin>>,
}

impl Prompt {
    /// None = stdin закрыт
    async fn ask(&mut self, question: &str) -> Result<Option<String>> {
        print!("{}", question);
        std::io::stdout().flush()?;
        Ok(self.lines.next_line().await?.map(|l| l.trim().to_string()))
    }
}

pub async fn run(app: Arc<App>) -> Result<()> {
    let mut prompt = Prompt { lines: BufReader::new(tokio::io::stdin()).lines() };
    println!("Добро пожаловать в orderfan!");

    loop {
        println!();
        println!("1. Разместить ордер");
        println!("2. Прогноз цены");
        println!("3. Сравнение акций");
        println!("4. Цена внутри дня");
        println!("5. Журнал ордеров");
        println!("6. Выход");
        let Some(choice) = prompt.ask("Выберите действие (1-6): ").await? else { break };
        let done = match choice.as_str() {
            "1" => place_order(&app, &mut prompt).await?,
            "2" => predict(&app, &mut prompt).await?,
            "3" => compare(&app, &mut prompt).await?,
            "4" => intraday(&app, &mut prompt).await?,
            "5" => {
                show_journal(&app).await;
                false
            }
            "6" | "q" | "exit" => true,
            _ => {
                println!("Неизвестный пункт меню.");
                false
            }
        };
        if done {
            break;
        }
    }
    Ok(())
}

/// true, если ввод закончился
async fn place_order(app: &App, prompt: &mut Prompt) -> Result<bool> {
    let desk = &app.desk;
    if desk.accounts().is_empty() {
        println!("Список счетов пуст, проверьте {}", app.config.accounts_path);
        return Ok(false);
    }

    let mut form = OrderForm::default();
    let fields: [(&str, &mut String); 5] = [
        ("Название акции: ", &mut form.stock_name),
        ("Тип сделки BUY/SELL [BUY]: ", &mut form.transaction_type),
        ("Продукт DELIVERY/INTRADAY [DELIVERY]: ", &mut form.product_type),
        ("Биржа NSE/BSE [NSE]: ", &mut form.exchange),
        ("Тип ордера MARKET/LIMIT [MARKET]: ", &mut form.order_type),
    ];
    for (question, slot) in fields {
        let Some(answer) = prompt.ask(question).await? else { return Ok(true) };
        *slot = answer;
    }
    if form.order_type.eq_ignore_ascii_case("LIMIT") {
        let Some(price) = prompt.ask("Цена: ").await? else { return Ok(true) };
        form.price = price;
    }
    let Some(quantity) = prompt.ask("Количество: ").await? else { return Ok(true) };
    form.quantity = quantity;

    println!("Счета:");
    for (i, a) in desk.accounts().iter().enumerate() {
        println!("  {}) {} (средства: {})", i + 1, a.username, a.available_funds);
    }
    let Some(raw) = prompt.ask("Номера счетов через запятую или all: ").await? else { return Ok(true) };
    let selected = match parse_selection(&raw, desk.accounts().len()) {
        Ok(idx) => idx,
        Err(e) => {
            println!("Ошибка: {}", e);
            return Ok(false);
        }
    };

    let (tx, mut rx) = mpsc::unbounded_channel();
    let (order, handle) = match desk.begin(&form, &selected, Some(tx)).await {
        Ok(started) => started,
        Err(e) => {
            println!("Ошибка: {}", e);
            return Ok(false);
        }
    };

    // статус по мере завершения счетов
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                DispatchEvent::Started { account, .. } => println!("⏳ {}", account),
                DispatchEvent::Finished { account, status, .. } => println!("• {}: {}", account, status),
                DispatchEvent::Completed { .. } => break,
            }
        }
    });

    let report = handle.wait().await;
    let _ = printer.await;
    desk.finish(&order, &report).await;

    for outcome in &report.outcomes {
        println!("{}", outcome.status_line());
    }
    println!("{}", report.summary());
    Ok(false)
}

async fn predict(app: &App, prompt: &mut Prompt) -> Result<bool> {
    let Some(ticker) = prompt.ask("Тикер или название компании: ").await? else { return Ok(true) };
    let default = app.forecaster.default_horizon();
    let Some(days) = prompt.ask(&format!("Горизонт в календарных днях [{}]: ", default)).await? else {
        return Ok(true);
    };
    let horizon = if days.is_empty() {
        default
    } else {
        match days.parse() {
            Ok(d) => d,
            Err(_) => {
                println!("Ошибка: `{}` не число", days);
                return Ok(false);
            }
        }
    };

    match app.forecaster.predict(&ticker, horizon).await {
        Ok(report) => println!("{}", report.summary()),
        Err(e) => println!("Ошибка прогноза: {:#}", e),
    }
    Ok(false)
}

async fn compare(app: &App, prompt: &mut Prompt) -> Result<bool> {
    let Some(raw) = prompt.ask("Тикеры или названия через запятую: ").await? else { return Ok(true) };
    let default = app.forecaster.compare_range();
    let Some(range) = prompt.ask(&format!("Период ({}) [{}]: ", RANGES.join("/"), default)).await? else {
        return Ok(true);
    };
    let range = (!range.is_empty()).then_some(range.as_str());

    match app.forecaster.compare(&split_tickers(&raw), range).await {
        Ok(rows) => {
            for p in rows {
                println!("{}", p.line());
            }
        }
        Err(e) => println!("Ошибка сравнения: {:#}", e),
    }
    Ok(false)
}

async fn intraday(app: &App, prompt: &mut Prompt) -> Result<bool> {
    let Some(ticker) = prompt.ask("Тикер или название компании: ").await? else { return Ok(true) };
    match app.forecaster.intraday(&ticker).await {
        Ok(report) => {
            println!("{}: {}", report.ticker, report.summary());
            for line in report.tail(INTRADAY_TAIL) {
                println!("  {}", line);
            }
        }
        Err(e) => println!("Ошибка: {:#}", e),
    }
    Ok(false)
}

async fn show_journal(app: &App) {
    let Some(db) = app.desk.journal() else {
        println!("Журнал выключен (sqlite_path не задан).");
        return;
    };
    match recent_orders(db, 20).await {
        Ok(rows) if rows.is_empty() => println!("Журнал пуст."),
        Ok(rows) => {
            for r in rows {
                println!(
                    "#{} {} {} {} {} x{} @{} -> {}",
                    r.id, r.account, r.side, r.stock_name, r.exchange, r.quantity, r.price, r.status
                );
            }
        }
        Err(e) => println!("Не удалось прочитать журнал: {:#}", e),
    }
}
