// src/frontend/telegram/callbacks.rs

use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::CallbackQuery;
use tracing::{info, warn};

use super::commands::{history_text, selection_caption};
use super::{callback_data, make_accounts_keyboard, Selections};
use crate::app::App;

pub async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    app: Arc<App>,
    selections: Selections,
) -> anyhow::Result<()> {
    let Some(data) = q.data.as_deref() else {
        return Ok(());
    };
    let Some(message) = q.message.as_ref() else {
        warn!("Callback {} without message", q.id);
        return Ok(());
    };
    let chat_id = message.chat().id;
    let message_id = message.id();
    let _ = bot.answer_callback_query(q.id.clone()).await;

    match data {
        "history" => {
            let text = history_text(&app).await;
            let _ = bot.edit_message_text(chat_id, message_id, text).await;
            return Ok(());
        }
        "accounts" | callback_data::SELECT_ALL | callback_data::CLEAR_ALL => {}
        other if other.starts_with(callback_data::PREFIX_TOGGLE_ACCOUNT) => {}
        other => {
            warn!("Unknown callback data from chat {}: {}", chat_id, other);
            return Ok(());
        }
    }

    let accounts = app.desk.accounts();
    let selected = {
        let mut guard = selections.write().await;
        let entry = guard.entry(chat_id).or_default();
        match data {
            callback_data::SELECT_ALL => entry.extend(0..accounts.len()),
            callback_data::CLEAR_ALL => entry.clear(),
            "accounts" => {}
            toggle => {
                let idx = toggle[callback_data::PREFIX_TOGGLE_ACCOUNT.len()..].parse::<usize>().ok();
                match idx.filter(|&i| i < accounts.len()) {
                    Some(i) => {
                        if !entry.remove(&i) {
                            entry.insert(i);
                        }
                    }
                    None => warn!("Callback for unknown account index: {}", toggle),
                }
            }
        }
        entry.clone()
    };
    info!("Chat {} selected {} accounts", chat_id, selected.len());

    if accounts.is_empty() {
        let _ = bot.edit_message_text(chat_id, message_id, "ℹ️ Список счетов пуст.").await;
        return Ok(());
    }
    let _ = bot
        .edit_message_text(chat_id, message_id, selection_caption(&selected))
        .reply_markup(make_accounts_keyboard(&app, &selected))
        .await;
    Ok(())
}
