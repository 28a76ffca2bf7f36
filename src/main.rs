// src/main.rs

use anyhow::{anyhow, Result};
use std::sync::Arc;
use teloxide::Bot;
use tracing::info;

use orderfan::app::App;
use orderfan::config::{Config, Frontend};
use orderfan::frontend::{console, telegram, web};
use orderfan::logger;

#[tokio::main]
async fn main() -> Result<()> {
    // 1) .env, конфиг и логгер
    dotenv::dotenv().ok();
    let cfg = Config::load()?;
    let _log_guard = logger::init(&cfg);

    // 2) счета, каталог, брокер, журнал
    let app = Arc::new(App::build(cfg).await?);
    info!(
        "Loaded {} accounts, frontend: {:?}",
        app.desk.accounts().len(),
        app.config.frontend
    );

    // 3) интерфейс
    let frontend = app.config.frontend;
    match frontend {
        Frontend::Console => console::run(app).await?,
        Frontend::Web => web::run(app).await?,
        Frontend::Telegram => {
            let token = app
                .config
                .telegram_token
                .clone()
                .ok_or_else(|| anyhow!("telegram_token is required for the telegram frontend"))?;
            telegram::run(Bot::new(token), app).await;
        }
    }
    Ok(())
}
