// src/frontend/telegram/commands.rs

use std::collections::BTreeSet;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use teloxide::utils::command::BotCommands;
use tracing::{error, info, warn};

use super::{make_accounts_keyboard, parse_order_args, Command, Selections};
use crate::app::App;
use crate::dispatch::DispatchReport;
use crate::forecast::market::INTRADAY_TAIL;
use crate::forecast::{split_tickers, RANGES};
use crate::storage::recent_orders;

/// Лимит Telegram 4096, оставляем запас под многоточие
const MAX_MESSAGE_LEN: usize = 4000;

pub async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    app: Arc<App>,
    selections: Selections,
) -> anyhow::Result<()> {
    let chat_id = msg.chat.id;

    match cmd {
        Command::Help | Command::Start => {
            let kb = InlineKeyboardMarkup::new(vec![vec![
                InlineKeyboardButton::callback("👥 Счета", "accounts"),
                InlineKeyboardButton::callback("📒 Журнал", "history"),
            ]]);
            bot.send_message(chat_id, Command::descriptions().to_string())
                .reply_markup(kb)
                .await?;
        }
        Command::Accounts => {
            if app.desk.accounts().is_empty() {
                bot.send_message(chat_id, "ℹ️ Список счетов пуст.").await?;
                return Ok(());
            }
            let selected = selections.read().await.get(&chat_id).cloned().unwrap_or_default();
            bot.send_message(chat_id, selection_caption(&selected))
                .reply_markup(make_accounts_keyboard(&app, &selected))
                .await?;
        }
        Command::Order(args) => {
            let form = match parse_order_args(&args) {
                Ok(form) => form,
                Err(e) => {
                    bot.send_message(chat_id, format!("❌ {}", e)).await?;
                    return Ok(());
                }
            };
            let selected: Vec<usize> = selections
                .read()
                .await
                .get(&chat_id)
                .map(|s| s.iter().cloned().collect())
                .unwrap_or_default();

            // Ошибки ввода показываем сразу, до запуска
            let (order, handle) = match app.desk.begin(&form, &selected, None).await {
                Ok(started) => started,
                Err(e) => {
                    bot.send_message(chat_id, format!("❌ {}. Счета: /accounts", e)).await?;
                    return Ok(());
                }
            };
            info!(run_id = %handle.run_id(), "Order {} started from chat {}", order.stock_name, chat_id);

            let status = bot
                .send_message(chat_id, format!("⏳ {} {}: 0/{}", order.transaction_type, order.stock_name, handle.total()))
                .await?;
            let status_id = status.id;

            // Ожидание в отдельной задаче, чтобы не держать диспетчер
            tokio::spawn(async move {
                let title = format!("{} {} x{}", order.transaction_type, order.stock_name, order.quantity);
                let report = handle
                    .wait_polling(|done, total| {
                        let bot = bot.clone();
                        let text = format!("⏳ {}: {}/{}", title, done, total);
                        async move {
                            if done < total {
                                let _ = bot.edit_message_text(chat_id, status_id, text).await;
                            }
                        }
                    })
                    .await;

                if let Err(e) = bot
                    .edit_message_text(chat_id, status_id, render_report(&title, &report))
                    .await
                {
                    warn!("Failed to edit status message {}: {}", status_id, e);
                }
                app.desk.finish(&order, &report).await;
            });
        }
        Command::Forecast(args) => {
            // число в конце = горизонт, остальное = тикер или название компании
            let args = args.trim();
            let (ticker, days) = match args.rsplit_once(char::is_whitespace) {
                Some((head, last)) if last.chars().all(|c| c.is_ascii_digit()) => (head.trim_end(), Some(last)),
                _ => (args, None),
            };
            if ticker.is_empty() {
                bot.send_message(chat_id, "Использование: /forecast <TICKER|компания> [дней]").await?;
                return Ok(());
            }
            let horizon = match days.map(str::parse::<u32>) {
                None => app.forecaster.default_horizon(),
                Some(Ok(d)) if d > 0 => d,
                Some(_) => {
                    bot.send_message(chat_id, "❌ Горизонт должен быть положительным числом дней").await?;
                    return Ok(());
                }
            };
            let waiting = bot.send_message(chat_id, format!("⏳ Прогноз {} на {} дн...", ticker, horizon)).await?;
            match app.forecaster.predict(ticker, horizon).await {
                Ok(r) => {
                    bot.edit_message_text(chat_id, waiting.id, format!("📈 {}: {}", r.ticker, r.summary()))
                        .await?;
                }
                Err(e) => {
                    error!("Forecast for {} failed: {:#}", ticker, e);
                    bot.edit_message_text(chat_id, waiting.id, format!("❌ Не удалось построить прогноз: {:#}", e))
                        .await?;
                }
            }
        }
        Command::Realtime(args) => {
            let input = args.trim();
            if input.is_empty() {
                bot.send_message(chat_id, "Использование: /realtime <TICKER|компания>").await?;
                return Ok(());
            }
            let text = match app.forecaster.intraday(input).await {
                Ok(r) => {
                    let mut text = format!("🕔 {}: {}\n", r.ticker, r.summary());
                    for line in r.tail(INTRADAY_TAIL) {
                        text.push_str(&format!("• {}\n", line));
                    }
                    text
                }
                Err(e) => {
                    error!("Intraday for {} failed: {:#}", input, e);
                    format!("❌ Не удалось получить цены: {:#}", e)
                }
            };
            bot.send_message(chat_id, text).await?;
        }
        Command::Compare(args) => {
            let (list, range) = split_compare_args(&args);
            let tickers = split_tickers(list);
            if tickers.is_empty() {
                bot.send_message(chat_id, "Использование: /compare <T1,T2,...> [период]").await?;
                return Ok(());
            }
            let waiting = bot.send_message(chat_id, format!("⏳ Сравниваю {} бумаг...", tickers.len())).await?;
            let text = match app.forecaster.compare(&tickers, range).await {
                Ok(rows) => {
                    let period = range.unwrap_or(app.forecaster.compare_range());
                    let mut text = format!("📊 Изменение за {}:\n", period);
                    for p in rows {
                        text.push_str(&format!("• {}\n", p.line()));
                    }
                    truncate(text)
                }
                Err(e) => format!("❌ {:#}", e),
            };
            bot.edit_message_text(chat_id, waiting.id, text).await?;
        }
        Command::History => {
            let text = history_text(&app).await;
            bot.send_message(chat_id, text).await?;
        }
    }
    Ok(())
}

/// Последние ордера из журнала одним сообщением
pub async fn history_text(app: &App) -> String {
    let Some(db) = app.desk.journal() else {
        return "ℹ️ Журнал выключен.".to_string();
    };
    match recent_orders(db, 15).await {
        Ok(rows) if rows.is_empty() => "ℹ️ Журнал пуст.".to_string(),
        Ok(rows) => {
            let mut text = "📒 Последние ордера:\n".to_string();
            for r in rows {
                text.push_str(&format!(
                    "• {} {} {} {} x{} → {}\n",
                    r.ts, r.account, r.side, r.stock_name, r.quantity, r.status
                ));
            }
            truncate(text)
        }
        Err(e) => {
            error!("Failed to read journal: {:#}", e);
            format!("❌ Не удалось прочитать журнал: {}", e)
        }
    }
}

fn render_report(title: &str, report: &DispatchReport) -> String {
    let mut text = format!("✅ {}\n{}\n", title, report.summary());
    for o in &report.outcomes {
        let mark = match o.status() {
            "Accepted" => "✅",
            "Rejected" => "⚠️",
            _ => "❌",
        };
        text.push_str(&format!("{} {}\n", mark, o.status_line()));
    }
    truncate(text)
}

fn truncate(mut text: String) -> String {
    if text.len() > MAX_MESSAGE_LEN {
        let mut cut = MAX_MESSAGE_LEN;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        text.truncate(cut);
        text.push('…');
    }
    text
}

/// `"A.NS, Tata Motors 6mo"` -> список и период, если последнее слово из `RANGES`
fn split_compare_args(args: &str) -> (&str, Option<&str>) {
    let args = args.trim();
    match args.rsplit_once(char::is_whitespace) {
        Some((head, last)) if RANGES.contains(&last) => (head.trim_end(), Some(last)),
        _ => (args, None),
    }
}

pub fn selection_caption(selected: &BTreeSet<usize>) -> String {
    if selected.is_empty() {
        "Отметьте счета для ордера:".to_string()
    } else {
        format!("Выбрано счетов: {}. Теперь /order ...", selected.len())
    }
}

#[cfg(test)]
mod tests {
    use super::{split_compare_args, truncate};

    #[test]
    fn compare_args_take_trailing_range() {
        assert_eq!(split_compare_args("A.NS, Tata Motors 6mo"), ("A.NS, Tata Motors", Some("6mo")));
        assert_eq!(split_compare_args(" Tata Motors "), ("Tata Motors", None));
        assert_eq!(split_compare_args("1y"), ("1y", None));
    }

    #[test]
    fn long_text_is_cut_on_char_boundary() {
        let text = "ы".repeat(3000);
        let cut = truncate(text);
        assert!(cut.len() <= super::MAX_MESSAGE_LEN + '…'.len_utf8());
        assert!(cut.ends_with('…'));
        assert_eq!(truncate("ok".into()), "ok");
    }
}
