//! The dashboard page and its four event handlers.
//!
//! The page posts the current control values to `/api/events/<name>` and
//! renders whatever panel state comes back. Handlers keep nothing between
//! calls.

use axum::extract::State;
use axum::http::header;
use axum::response::{Html, IntoResponse};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::errors::AppError;
use crate::models::{ChartFigure, CompanyProfile, PanelId, PanelState};
use crate::services::price_service::{self, DateRange};
use crate::services::{chart_service, forecasting_service, indicators};
use crate::state::AppState;

const INDEX_HTML: &str = include_str!("../../assets/index.html");
const STYLE_CSS: &str = include_str!("../../assets/style.css");

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/assets/style.css", get(stylesheet))
}

pub fn events_router() -> Router<AppState> {
    Router::new()
        .route("/submit", post(submit))
        .route("/stock", post(stock))
        .route("/indicators", post(indicators_chart))
        .route("/forecast", post(forecast))
}

#[derive(Debug, Default, Deserialize)]
pub struct SubmitEvent {
    pub n_clicks: Option<u32>,
    pub ticker: Option<String>,
}

/// Shared by the price and indicator panels.
#[derive(Debug, Default, Deserialize)]
pub struct ChartEvent {
    pub n_clicks: Option<u32>,
    pub ticker: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ForecastEvent {
    pub n_clicks: Option<u32>,
    pub ticker: Option<String>,
    pub n_days: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SubmitOutcome {
    pub company: PanelState<CompanyProfile>,
    /// Panels whose trigger counters the page must clear.
    pub reset: Vec<PanelId>,
}

/// The ticker to act on, or `None` when the panel should stay empty.
fn triggered_ticker(n_clicks: Option<u32>, ticker: Option<&str>) -> Result<Option<String>, AppError> {
    if n_clicks.is_none() {
        return Ok(None);
    }
    price_service::normalize_ticker(ticker)
}

fn into_panel<T>(panel: PanelId, result: Result<Option<T>, AppError>) -> PanelState<T> {
    match result {
        Ok(None) => PanelState::NeverTriggered,
        Ok(Some(content)) => PanelState::Triggered { content },
        Err(e) => {
            warn!("{:?} panel failed: {}", panel, e);
            PanelState::from_result(Err(e))
        }
    }
}

async fn load_profile(state: &AppState, event: SubmitEvent) -> Result<Option<CompanyProfile>, AppError> {
    let Some(ticker) = triggered_ticker(event.n_clicks, event.ticker.as_deref())? else {
        return Ok(None);
    };
    let profile = price_service::fetch_profile(state.market_data.as_ref(), &ticker).await?;
    Ok(Some(profile))
}

async fn load_stock(
    state: &AppState,
    event: ChartEvent,
    today: NaiveDate,
) -> Result<Option<ChartFigure>, AppError> {
    let Some(ticker) = triggered_ticker(event.n_clicks, event.ticker.as_deref())? else {
        return Ok(None);
    };
    let range = DateRange::parse(event.start_date.as_deref(), event.end_date.as_deref(), today)?;

    let series = price_service::fetch_prices(state.market_data.as_ref(), &ticker, range).await?;
    Ok(Some(chart_service::price_chart(&series)))
}

async fn load_indicators(
    state: &AppState,
    event: ChartEvent,
    today: NaiveDate,
) -> Result<Option<ChartFigure>, AppError> {
    let Some(ticker) = triggered_ticker(event.n_clicks, event.ticker.as_deref())? else {
        return Ok(None);
    };
    let range = DateRange::parse(event.start_date.as_deref(), event.end_date.as_deref(), today)?;

    let series = price_service::fetch_prices(state.market_data.as_ref(), &ticker, range).await?;
    let ema = indicators::ema_series(&series, state.settings.ema_span)?;
    Ok(Some(chart_service::indicator_chart(&ema)))
}

async fn load_forecast(
    state: &AppState,
    event: ForecastEvent,
    today: NaiveDate,
) -> Result<Option<ChartFigure>, AppError> {
    let Some(ticker) = triggered_ticker(event.n_clicks, event.ticker.as_deref())? else {
        return Ok(None);
    };
    let horizon = forecasting_service::parse_horizon(event.n_days.as_deref())?;

    let series = forecasting_service::forecast(
        state.market_data.as_ref(),
        &ticker,
        horizon,
        state.settings.forecast,
        today,
    )
    .await?;
    Ok(Some(chart_service::forecast_chart(&series)))
}

/// Company header. Any triggered submission also clears the other panels.
pub async fn on_submit(state: &AppState, event: SubmitEvent) -> SubmitOutcome {
    let result = load_profile(state, event).await;

    let reset = if matches!(result, Ok(None)) {
        Vec::new()
    } else {
        vec![PanelId::Stock, PanelId::Indicators, PanelId::Forecast]
    };

    SubmitOutcome {
        company: into_panel(PanelId::Company, result),
        reset,
    }
}

pub async fn on_stock(state: &AppState, event: ChartEvent, today: NaiveDate) -> PanelState<ChartFigure> {
    into_panel(PanelId::Stock, load_stock(state, event, today).await)
}

pub async fn on_indicators(
    state: &AppState,
    event: ChartEvent,
    today: NaiveDate,
) -> PanelState<ChartFigure> {
    into_panel(PanelId::Indicators, load_indicators(state, event, today).await)
}

pub async fn on_forecast(
    state: &AppState,
    event: ForecastEvent,
    today: NaiveDate,
) -> PanelState<ChartFigure> {
    into_panel(PanelId::Forecast, load_forecast(state, event, today).await)
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

async fn submit(State(state): State<AppState>, Json(event): Json<SubmitEvent>) -> Json<SubmitOutcome> {
    info!("POST /api/events/submit - ticker {:?}", event.ticker);
    Json(on_submit(&state, event).await)
}

async fn stock(
    State(state): State<AppState>,
    Json(event): Json<ChartEvent>,
) -> Json<PanelState<ChartFigure>> {
    info!("POST /api/events/stock - ticker {:?}", event.ticker);
    Json(on_stock(&state, event, today()).await)
}

async fn indicators_chart(
    State(state): State<AppState>,
    Json(event): Json<ChartEvent>,
) -> Json<PanelState<ChartFigure>> {
    info!("POST /api/events/indicators - ticker {:?}", event.ticker);
    Json(on_indicators(&state, event, today()).await)
}

async fn forecast(
    State(state): State<AppState>,
    Json(event): Json<ForecastEvent>,
) -> Json<PanelState<ChartFigure>> {
    info!("POST /api/events/forecast - ticker {:?}, days {:?}", event.ticker, event.n_days);
    Json(on_forecast(&state, event, today()).await)
}

/// Embedded asset, or in debug mode the on-disk copy so edits show up on reload.
async fn load_asset(state: &AppState, name: &str, embedded: &'static str) -> String {
    if state.settings.debug {
        let path = state.settings.assets_dir.join(name);
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => return contents,
            Err(e) => warn!("Falling back to embedded {}: {} ({})", name, e, path.display()),
        }
    }
    embedded.to_string()
}

async fn index(State(state): State<AppState>) -> Html<String> {
    let page = load_asset(&state, "index.html", INDEX_HTML).await;
    Html(
        page.replace("{{DEFAULT_TICKER}}", &state.settings.default_ticker)
            .replace("{{MIN_DATE}}", &price_service::history_floor().to_string())
            .replace("{{TODAY}}", &today().to_string()),
    )
}

async fn stylesheet(State(state): State<AppState>) -> impl IntoResponse {
    let css = load_asset(&state, "style.css", STYLE_CSS).await;
    ([(header::CONTENT_TYPE, "text/css; charset=utf-8")], css)
}
