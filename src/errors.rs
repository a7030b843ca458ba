use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use thiserror::Error;

use crate::external::market_data::MarketDataError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Rate limited by external provider")]
    RateLimited,
    #[error("Upstream error: {0}")]
    Upstream(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg).into_response(),
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            AppError::RateLimited => {
                let mut headers = HeaderMap::new();
                headers.insert("Retry-After", HeaderValue::from_static("60"));
                (StatusCode::TOO_MANY_REQUESTS, headers, "Rate limited").into_response()
            }
            AppError::Network(msg) | AppError::Upstream(msg) => {
                (StatusCode::BAD_GATEWAY, msg).into_response()
            }
            AppError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
        }
    }
}

impl From<MarketDataError> for AppError {
    fn from(value: MarketDataError) -> Self {
        match value {
            MarketDataError::NotFound(ticker) => {
                AppError::NotFound(format!("no data found for ticker {ticker}"))
            }
            MarketDataError::Network(msg) => AppError::Network(msg),
            MarketDataError::RateLimited => AppError::RateLimited,
            MarketDataError::BadResponse(msg) | MarketDataError::Parse(msg) => {
                AppError::Upstream(msg)
            }
        }
    }
}
