use chrono::NaiveDate;
use tracing::{debug, error, info};

use crate::errors::AppError;
use crate::external::market_data::MarketDataProvider;
use crate::models::{CompanyProfile, PriceSeries};

const MAX_TICKER_LEN: usize = 16;

/// Earliest date the range picker offers.
pub fn history_floor() -> NaiveDate {
    NaiveDate::from_ymd_opt(1995, 8, 5).unwrap_or(NaiveDate::MIN)
}

/// Trims and uppercases a raw ticker. Blank input yields `None`.
pub fn normalize_ticker(raw: Option<&str>) -> Result<Option<String>, AppError> {
    let Some(raw) = raw.map(str::trim).filter(|t| !t.is_empty()) else {
        return Ok(None);
    };

    let valid = raw.len() <= MAX_TICKER_LEN
        && raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '='));
    if !valid {
        return Err(AppError::InvalidInput(format!("'{raw}' is not a valid ticker symbol")));
    }

    Ok(Some(raw.to_ascii_uppercase()))
}

/// Optional inclusive date range. A missing start means full history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    /// Parses picker values (`YYYY-MM-DD`, optionally followed by a time part)
    /// and checks them against `[history_floor(), today]`.
    pub fn parse(start: Option<&str>, end: Option<&str>, today: NaiveDate) -> Result<Self, AppError> {
        let range = Self {
            start: parse_date("start", start)?,
            end: parse_date("end", end)?,
        };
        range.validate(today)?;
        Ok(range)
    }

    pub fn validate(&self, today: NaiveDate) -> Result<(), AppError> {
        let floor = history_floor();
        for date in [self.start, self.end].into_iter().flatten() {
            if date < floor || date > today {
                return Err(AppError::InvalidInput(format!(
                    "date {date} is outside the allowed range {floor} to {today}"
                )));
            }
        }

        if let (Some(start), Some(end)) = (self.start, self.end) {
            if start > end {
                return Err(AppError::InvalidInput(format!(
                    "start date {start} is after end date {end}"
                )));
            }
        }

        Ok(())
    }
}

fn parse_date(label: &str, raw: Option<&str>) -> Result<Option<NaiveDate>, AppError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };

    let date_part = raw.split(['T', ' ']).next().unwrap_or(raw);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .map(Some)
        .map_err(|e| AppError::InvalidInput(format!("invalid {label} date '{raw}': {e}")))
}

pub async fn fetch_profile(
    provider: &dyn MarketDataProvider,
    ticker: &str,
) -> Result<CompanyProfile, AppError> {
    info!("Fetching company profile for {}", ticker);
    provider.fetch_profile(ticker).await.map_err(|e| {
        error!("Failed to fetch profile for {}: {}", ticker, e);
        AppError::from(e)
    })
}

/// Daily prices for `ticker`, ascending by date without duplicate dates.
pub async fn fetch_prices(
    provider: &dyn MarketDataProvider,
    ticker: &str,
    range: DateRange,
) -> Result<PriceSeries, AppError> {
    info!(
        "Fetching prices for {} ({} to {})",
        ticker,
        range.start.map_or_else(|| "max".to_string(), |d| d.to_string()),
        range.end.map_or_else(|| "latest".to_string(), |d| d.to_string()),
    );

    let mut records = provider
        .fetch_daily_history(ticker, range.start, range.end)
        .await
        .map_err(|e| {
            error!("Failed to fetch prices for {}: {}", ticker, e);
            AppError::from(e)
        })?;

    if let Some(end) = range.end {
        records.retain(|r| r.date <= end);
    }

    let series = PriceSeries::new(ticker, records);
    if series.is_empty() {
        return Err(AppError::NotFound(format!("no price data for {ticker} in the requested range")));
    }
    debug!("Loaded {} daily records for {}", series.len(), ticker);

    Ok(series)
}
