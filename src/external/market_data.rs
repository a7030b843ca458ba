use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::models::{CompanyProfile, PriceRecord};

#[derive(Debug, Error)]
pub enum MarketDataError {
    #[error("no data found for {0}")]
    NotFound(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("bad response: {0}")]
    BadResponse(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("rate limited")]
    RateLimited,
}

/// Upstream source of company metadata and daily prices.
///
/// Implementations make exactly one attempt per call; failures are returned
/// to the caller as-is.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    async fn fetch_profile(&self, ticker: &str) -> Result<CompanyProfile, MarketDataError>;

    /// Daily history between `start` and `end` (both inclusive).
    /// Without `start` the full available history is returned.
    async fn fetch_daily_history(
        &self,
        ticker: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<PriceRecord>, MarketDataError>;
}
