// src/frontend/web.rs

//! Web-форма: тот же ордер, что и в консоли, плюс прогноз, рынок и журнал.

use anyhow::Result;
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Form, Json, Router,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::app::App;
use crate::dispatch::DispatchReport;
use crate::forecast::{split_tickers, RANGES};
use crate::models::OrderForm;
use crate::storage::recent_orders;

const ACCOUNT_FIELD_PREFIX: &str = "acct_";

pub fn router(app: Arc<App>) -> Router {
    Router::new()
        .route("/", get(order_page))
        .route("/orders", axum::routing::post(submit_order))
        .route("/forecast", get(forecast_page).post(submit_forecast))
        .route("/real_time", get(real_time_page).post(submit_real_time))
        .route("/compare", get(compare_page).post(submit_compare))
        .route("/api/orders", get(journal_json))
        .with_state(app)
}

pub async fn run(app: Arc<App>) -> Result<()> {
    let addr = app.config.web_bind.clone();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Web form listening on http://{}", addr);
    axum::serve(listener, router(app)).await?;
    Ok(())
}

/// GET / - форма ордера
async fn order_page(State(app): State<Arc<App>>) -> Html<String> {
    let mut accounts = String::new();
    for (i, a) in app.desk.accounts().iter().enumerate() {
        accounts.push_str(&format!(
            r#"<label><input type="checkbox" class="acct" name="{}{}" value="on"> {} ({})</label><br>"#,
            ACCOUNT_FIELD_PREFIX,
            i,
            escape_html(&a.username),
            a.available_funds
        ));
    }
    if accounts.is_empty() {
        accounts.push_str("<p>Список счетов пуст.</p>");
    }
    Html(page("Ордер", &ORDER_FORM_HTML.replace("{accounts}", &accounts)))
}

/// POST /orders - раздача по выбранным счетам
async fn submit_order(
    State(app): State<Arc<App>>,
    Form(fields): Form<HashMap<String, String>>,
) -> Response {
    let (form, selected) = split_order_fields(&fields);
    match app.desk.place(&form, &selected).await {
        Ok(report) => Html(page("Результат", &render_report(&report))).into_response(),
        Err(e) => {
            warn!("Rejected web order: {}", e);
            (
                StatusCode::BAD_REQUEST,
                Html(page("Ошибка", &format!(r#"<p class="err">{}</p><a href="/">Назад</a>"#, escape_html(&e.to_string())))),
            )
                .into_response()
        }
    }
}

/// Поля формы -> ордер и номера выбранных строк (`acct_N`, N с нуля)
pub fn split_order_fields(fields: &HashMap<String, String>) -> (OrderForm, Vec<usize>) {
    let get = |k: &str| fields.get(k).cloned().unwrap_or_default();
    let form = OrderForm {
        stock_name: get("stock_name"),
        transaction_type: get("transaction_type"),
        product_type: get("product_type"),
        exchange: get("exchange"),
        order_type: get("order_type"),
        price: get("price"),
        quantity: get("quantity"),
    };
    // порядок как в списке на странице, мусорные ключи пропускаем
    let mut selected: Vec<usize> = fields
        .keys()
        .filter_map(|k| k.strip_prefix(ACCOUNT_FIELD_PREFIX)?.parse().ok())
        .collect();
    selected.sort_unstable();
    (form, selected)
}

fn render_report(report: &DispatchReport) -> String {
    let mut rows = String::new();
    for o in &report.outcomes {
        let detail = match &o.result {
            Ok(p) => p.response.to_string(),
            Err(e) => e.to_string(),
        };
        rows.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td><code>{}</code></td></tr>",
            escape_html(&o.account),
            o.available_funds,
            o.status(),
            escape_html(&detail)
        ));
    }
    format!(
        r#"<p>{}</p><p>run {}</p>
<table><tr><th>Счёт</th><th>Средства</th><th>Статус</th><th>Ответ</th></tr>{}</table>
<a href="/">Новый ордер</a>"#,
        escape_html(&report.summary()),
        report.run_id,
        rows
    )
}

#[derive(Deserialize)]
struct ForecastForm {
    symbol: String,
    #[serde(default)]
    period: String,
}

/// GET /forecast
async fn forecast_page(State(app): State<Arc<App>>) -> Html<String> {
    let body = FORECAST_FORM_HTML.replace("{period}", &app.forecaster.default_horizon().to_string());
    Html(page("Прогноз", &body))
}

/// POST /forecast
async fn submit_forecast(State(app): State<Arc<App>>, Form(f): Form<ForecastForm>) -> Response {
    let horizon = match f.period.trim() {
        "" => app.forecaster.default_horizon(),
        p => match p.parse() {
            Ok(d) => d,
            Err(_) => {
                return (StatusCode::BAD_REQUEST, Html(page("Ошибка", "<p class=\"err\">Период должен быть числом</p>")))
                    .into_response()
            }
        },
    };
    match app.forecaster.predict(&f.symbol, horizon).await {
        Ok(r) => Html(page(
            "Прогноз",
            &format!(
                "<p>{}: {}</p><p>Наблюдений: {}, горизонт {} дн. ({} торговых сессий)</p><a href=\"/forecast\">Назад</a>",
                escape_html(&r.ticker),
                escape_html(&r.summary()),
                r.observations,
                r.horizon_days,
                r.steps
            ),
        ))
        .into_response(),
        Err(e) => upstream_error(e),
    }
}

#[derive(Deserialize)]
struct RealTimeForm {
    symbol: String,
}

/// GET /real_time
async fn real_time_page() -> Html<String> {
    Html(page("Цена внутри дня", REAL_TIME_FORM_HTML))
}

/// POST /real_time - 5-минутные цены за последний торговый день
async fn submit_real_time(State(app): State<Arc<App>>, Form(f): Form<RealTimeForm>) -> Response {
    match app.forecaster.intraday(&f.symbol).await {
        Ok(r) => {
            let mut rows = String::new();
            for (time, close) in &r.points {
                rows.push_str(&format!("<tr><td>{}</td><td>{:.2}</td></tr>", time, close));
            }
            let body = format!(
                "<p>{}: {}</p><table><tr><th>Время (UTC)</th><th>Цена</th></tr>{}</table>{}",
                escape_html(&r.ticker),
                escape_html(&r.summary()),
                rows,
                REAL_TIME_FORM_HTML
            );
            Html(page("Цена внутри дня", &body)).into_response()
        }
        Err(e) => upstream_error(e),
    }
}

#[derive(Deserialize)]
struct CompareForm {
    tickers: String,
    #[serde(default)]
    range: String,
}

/// GET /compare
async fn compare_page(State(app): State<Arc<App>>) -> Html<String> {
    Html(page("Сравнение", &compare_form(app.forecaster.compare_range())))
}

/// POST /compare - изменение цены нескольких бумаг за период
async fn submit_compare(State(app): State<Arc<App>>, Form(f): Form<CompareForm>) -> Response {
    let range = f.range.trim();
    let range = (!range.is_empty()).then_some(range);
    match app.forecaster.compare(&split_tickers(&f.tickers), range).await {
        Ok(rows) => {
            let mut table = String::new();
            for p in &rows {
                table.push_str(&format!(
                    "<tr><td>{}</td><td>{}</td><td>{:.2}</td><td>{:.2}</td><td>{:+.2}%</td></tr>",
                    escape_html(&p.ticker),
                    escape_html(&p.label),
                    p.start_price,
                    p.last_price,
                    p.change_pct
                ));
            }
            let body = format!(
                "<table><tr><th>Тикер</th><th>Запрос</th><th>Начало</th><th>Сейчас</th><th>Изменение</th></tr>{}</table>{}",
                table,
                compare_form(range.unwrap_or(app.forecaster.compare_range()))
            );
            Html(page("Сравнение", &body)).into_response()
        }
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Html(page("Ошибка", &format!("<p class=\"err\">{}</p><a href=\"/compare\">Назад</a>", escape_html(&format!("{:#}", e))))),
        )
            .into_response(),
    }
}

fn compare_form(selected: &str) -> String {
    let options: String = RANGES
        .iter()
        .map(|r| {
            let mark = if *r == selected { " selected" } else { "" };
            format!(r#"<option value="{r}"{mark}>{r}</option>"#)
        })
        .collect();
    COMPARE_FORM_HTML.replace("{ranges}", &options)
}

fn upstream_error(e: anyhow::Error) -> Response {
    (
        StatusCode::BAD_GATEWAY,
        Html(page("Ошибка", &format!("<p class=\"err\">{}</p>", escape_html(&format!("{:#}", e))))),
    )
        .into_response()
}

/// GET /api/orders - последние строки журнала
async fn journal_json(State(app): State<Arc<App>>) -> Response {
    let Some(db) = app.desk.journal() else {
        return (StatusCode::NOT_FOUND, "journal disabled").into_response();
    };
    match recent_orders(db, 50).await {
        Ok(rows) => Json(rows).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", e)).into_response(),
    }
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn page(title: &str, body: &str) -> String {
    format!(
        r#"<!doctype html><html><head><meta charset="utf-8"><title>orderfan: {title}</title>
<style>body{{font-family:sans-serif;margin:2em}} .err{{color:#b00}} td,th{{padding:4px 8px;border-bottom:1px solid #ddd}}</style>
</head><body><h2>{title}</h2>{body}</body></html>"#
    )
}

const ORDER_FORM_HTML: &str = r#"<form method="post" action="/orders">
<p>Акция: <input name="stock_name" required></p>
<p>Сделка: <label><input type="radio" name="transaction_type" value="BUY" checked> BUY</label>
<label><input type="radio" name="transaction_type" value="SELL"> SELL</label></p>
<p>Продукт: <label><input type="radio" name="product_type" value="DELIVERY" checked> DELIVERY</label>
<label><input type="radio" name="product_type" value="INTRADAY"> INTRADAY</label></p>
<p>Биржа: <label><input type="radio" name="exchange" value="NSE" checked> NSE</label>
<label><input type="radio" name="exchange" value="BSE"> BSE</label></p>
<p>Тип: <label><input type="radio" name="order_type" value="MARKET" checked> MARKET</label>
<label><input type="radio" name="order_type" value="LIMIT"> LIMIT</label></p>
<p>Цена (для LIMIT): <input name="price"></p>
<p>Количество: <input name="quantity" required></p>
<fieldset><legend>Счета</legend>
<label><input type="checkbox" onclick="document.querySelectorAll('.acct').forEach(c=>c.checked=this.checked)"> Выбрать все</label><br>
{accounts}
</fieldset>
<p><button type="submit">Отправить</button> <a href="/forecast">Прогноз</a> <a href="/compare">Сравнение</a> <a href="/real_time">Внутри дня</a></p>
</form>"#;

const FORECAST_FORM_HTML: &str = r#"<form method="post" action="/forecast">
<p>Тикер или компания: <input name="symbol" required></p>
<p>Горизонт, календарных дней: <input name="period" value="{period}"></p>
<p><button type="submit">Прогноз</button> <a href="/">Ордер</a></p>
</form>"#;

const REAL_TIME_FORM_HTML: &str = r#"<form method="post" action="/real_time">
<p>Тикер или компания: <input name="symbol" required></p>
<p><button type="submit">Показать</button> <a href="/">Ордер</a></p>
</form>"#;

const COMPARE_FORM_HTML: &str = r#"<form method="post" action="/compare">
<p>Тикеры или компании через запятую: <input name="tickers" size="50" required></p>
<p>Период: <select name="range">{ranges}</select></p>
<p><button type="submit">Сравнить</button> <a href="/">Ордер</a></p>
</form>"#;
