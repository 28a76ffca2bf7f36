// src/frontend/telegram/mod.rs

pub mod callbacks;
pub mod commands;

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use teloxide::utils::command::BotCommands;
use tokio::sync::RwLock as TokioRwLock;

use crate::app::App;
use crate::models::OrderForm;
pub use callbacks::handle_callback;
pub use commands::handle_command;

/// Выбранные строки списка счетов по чатам
pub type Selections = Arc<TokioRwLock<HashMap<ChatId, BTreeSet<usize>>>>;

/// Все доступные команды бота
#[derive(BotCommands, Clone, Debug)]
#[command(rename_rule = "lowercase", description = "Доступные команды:")]
pub enum Command {
    #[command(description = "показать это сообщение")]
    Help,
    #[command(description = "главное меню")]
    Start,
    #[command(description = "выбрать счета")]
    Accounts,
    #[command(description = "ордер: /order <STOCK> <BUY|SELL> <QTY> [NSE|BSE] [DELIVERY|INTRADAY] [LIMIT <PRICE>]")]
    Order(String),
    #[command(description = "прогноз: /forecast <TICKER|компания> [календарных дней]")]
    Forecast(String),
    #[command(description = "цена внутри дня: /realtime <TICKER|компания>")]
    Realtime(String),
    #[command(description = "сравнение: /compare <T1,T2,...> [1mo|6mo|1y|...]")]
    Compare(String),
    #[command(description = "последние ордера из журнала")]
    History,
}

pub mod callback_data {
    pub const PREFIX_TOGGLE_ACCOUNT: &str = "acct:";
    pub const SELECT_ALL: &str = "acct_all";
    pub const CLEAR_ALL: &str = "acct_none";
}

/// Клавиатура-чеклист счетов
pub fn make_accounts_keyboard(app: &App, selected: &BTreeSet<usize>) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = app
        .desk
        .accounts()
        .iter()
        .enumerate()
        .map(|(i, a)| {
            let mark = if selected.contains(&i) { "✅" } else { "▫️" };
            vec![InlineKeyboardButton::callback(
                format!("{} {} ({})", mark, a.username, a.available_funds),
                format!("{}{}", callback_data::PREFIX_TOGGLE_ACCOUNT, i),
            )]
        })
        .collect();
    rows.push(vec![
        InlineKeyboardButton::callback("☑️ Выбрать все", callback_data::SELECT_ALL),
        InlineKeyboardButton::callback("✖️ Сбросить", callback_data::CLEAR_ALL),
    ]);
    InlineKeyboardMarkup::new(rows)
}

/// `/order` аргументы -> поля формы. Первые три обязательны, остальные в любом порядке.
pub fn parse_order_args(args: &str) -> Result<OrderForm, String> {
    let mut tokens = args.split_whitespace();
    let (Some(stock), Some(side), Some(qty)) = (tokens.next(), tokens.next(), tokens.next()) else {
        return Err("Использование: /order <STOCK> <BUY|SELL> <QTY> [NSE|BSE] [DELIVERY|INTRADAY] [LIMIT <PRICE>]".into());
    };
    let mut form = OrderForm {
        stock_name: stock.to_string(),
        transaction_type: side.to_string(),
        quantity: qty.to_string(),
        ..Default::default()
    };
    while let Some(tok) = tokens.next() {
        match tok.to_ascii_uppercase().as_str() {
            "NSE" | "BSE" => form.exchange = tok.to_string(),
            "DELIVERY" | "INTRADAY" => form.product_type = tok.to_string(),
            "MARKET" => form.order_type = tok.to_string(),
            "LIMIT" => {
                form.order_type = tok.to_string();
                form.price = tokens
                    .next()
                    .ok_or_else(|| "После LIMIT нужна цена".to_string())?
                    .to_string();
            }
            other => return Err(format!("Непонятный параметр `{}`", other)),
        }
    }
    Ok(form)
}

pub async fn run(bot: Bot, app: Arc<App>) {
    let selections: Selections = Arc::new(TokioRwLock::new(HashMap::new()));

    // 1) Текстовые команды
    let commands_branch = Update::filter_message()
        .filter_command::<Command>()
        .endpoint({
            let app = app.clone();
            let selections = selections.clone();
            move |bot: Bot, msg: Message, cmd: Command| {
                let app = app.clone();
                let selections = selections.clone();
                async move {
                    if let Err(err) = handle_command(bot, msg, cmd, app, selections).await {
                        tracing::error!("command handler error: {:?}", err);
                    }
                    respond(())
                }
            }
        });

    // 2) Inline-callbacks
    let callback_branch = Update::filter_callback_query()
        .endpoint({
            let app = app.clone();
            let selections = selections.clone();
            move |bot: Bot, q: CallbackQuery| {
                let app = app.clone();
                let selections = selections.clone();
                async move {
                    if let Err(err) = handle_callback(bot, q, app, selections).await {
                        tracing::error!("callback handler error: {:?}", err);
                    }
                    respond(())
                }
            }
        });

    Dispatcher::builder(bot, dptree::entry()
        .branch(commands_branch)
        .branch(callback_branch))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}
