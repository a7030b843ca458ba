use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use tracing::info;

use crate::errors::AppError;
use crate::models::{CompanyProfile, ForecastSeries, IndicatorSeries, PriceSeries};
use crate::services::forecasting_service;
use crate::services::indicators;
use crate::services::price_service::{self, DateRange};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/profile/:ticker", get(get_profile))
        .route("/prices/:ticker", get(get_prices))
        .route("/indicators/:ticker/ema", get(get_ema))
        .route("/forecast/:ticker", get(get_forecast))
}

#[derive(Debug, Deserialize)]
pub struct RangeParams {
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EmaParams {
    pub span: Option<usize>,
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ForecastParams {
    pub days: Option<String>,
}

fn path_ticker(raw: &str) -> Result<String, AppError> {
    price_service::normalize_ticker(Some(raw))?
        .ok_or_else(|| AppError::InvalidInput("ticker is required".into()))
}

fn today() -> chrono::NaiveDate {
    chrono::Local::now().date_naive()
}

/// GET /api/profile/:ticker
async fn get_profile(
    Path(ticker): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<CompanyProfile>, AppError> {
    info!("GET /api/profile/{} - Getting company profile", ticker);
    let ticker = path_ticker(&ticker)?;
    let profile = price_service::fetch_profile(state.market_data.as_ref(), &ticker).await?;
    Ok(Json(profile))
}

/// GET /api/prices/:ticker?start=&end=
async fn get_prices(
    Path(ticker): Path<String>,
    Query(params): Query<RangeParams>,
    State(state): State<AppState>,
) -> Result<Json<PriceSeries>, AppError> {
    info!("GET /api/prices/{} - Getting price history", ticker);
    let ticker = path_ticker(&ticker)?;
    let range = DateRange::parse(params.start.as_deref(), params.end.as_deref(), today())?;
    let series = price_service::fetch_prices(state.market_data.as_ref(), &ticker, range).await?;
    Ok(Json(series))
}

/// GET /api/indicators/:ticker/ema?span=&start=&end=
async fn get_ema(
    Path(ticker): Path<String>,
    Query(params): Query<EmaParams>,
    State(state): State<AppState>,
) -> Result<Json<IndicatorSeries>, AppError> {
    info!("GET /api/indicators/{}/ema - Computing EMA", ticker);
    let ticker = path_ticker(&ticker)?;
    let range = DateRange::parse(params.start.as_deref(), params.end.as_deref(), today())?;
    let span = params.span.unwrap_or(state.settings.ema_span);

    let series = price_service::fetch_prices(state.market_data.as_ref(), &ticker, range).await?;
    Ok(Json(indicators::ema_series(&series, span)?))
}

/// GET /api/forecast/:ticker?days=
async fn get_forecast(
    Path(ticker): Path<String>,
    Query(params): Query<ForecastParams>,
    State(state): State<AppState>,
) -> Result<Json<ForecastSeries>, AppError> {
    info!("GET /api/forecast/{} - Generating forecast", ticker);
    let ticker = path_ticker(&ticker)?;
    let horizon = forecasting_service::parse_horizon(params.days.as_deref())?;

    let forecast = forecasting_service::forecast(
        state.market_data.as_ref(),
        &ticker,
        horizon,
        state.settings.forecast,
        today(),
    )
    .await?;
    Ok(Json(forecast))
}
