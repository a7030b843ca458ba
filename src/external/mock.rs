use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{Duration, NaiveDate};

use crate::external::market_data::{MarketDataError, MarketDataProvider};
use crate::models::{CompanyProfile, PriceRecord};

/// In-memory provider for tests. Unknown tickers are `NotFound`.
#[derive(Default)]
pub struct MockMarketData {
    profiles: HashMap<String, CompanyProfile>,
    history: HashMap<String, Vec<PriceRecord>>,
    offline: bool,
    pub history_calls: AtomicUsize,
}

impl MockMarketData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider whose every call fails as if the upstream were unreachable.
    pub fn offline() -> Self {
        Self {
            offline: true,
            ..Self::default()
        }
    }

    pub fn with_profile(mut self, ticker: &str, name: &str) -> Self {
        self.profiles.insert(
            ticker.to_string(),
            CompanyProfile {
                ticker: ticker.to_string(),
                name: name.to_string(),
                logo_url: Some(format!("https://logo.clearbit.com/{}.com", ticker.to_lowercase())),
                summary: Some(format!("{name} makes things.")),
                website: None,
            },
        );
        self
    }

    pub fn with_history(mut self, ticker: &str, records: Vec<PriceRecord>) -> Self {
        self.history.insert(ticker.to_string(), records);
        self
    }

    /// Consecutive calendar days starting at `start`, one close per value.
    pub fn daily(start: NaiveDate, closes: &[f64]) -> Vec<PriceRecord> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| PriceRecord {
                date: start + Duration::days(i as i64),
                open: close - 0.5,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 1_000 + i as u64,
            })
            .collect()
    }

    fn check_online(&self) -> Result<(), MarketDataError> {
        if self.offline {
            return Err(MarketDataError::Network("connection refused".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl MarketDataProvider for MockMarketData {
    async fn fetch_profile(&self, ticker: &str) -> Result<CompanyProfile, MarketDataError> {
        self.check_online()?;
        self.profiles
            .get(ticker)
            .cloned()
            .ok_or_else(|| MarketDataError::NotFound(ticker.to_string()))
    }

    async fn fetch_daily_history(
        &self,
        ticker: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<PriceRecord>, MarketDataError> {
        self.check_online()?;
        self.history_calls.fetch_add(1, Ordering::SeqCst);

        let records = self
            .history
            .get(ticker)
            .ok_or_else(|| MarketDataError::NotFound(ticker.to_string()))?;

        Ok(records
            .iter()
            .filter(|r| start.map_or(true, |s| r.date >= s) && end.map_or(true, |e| r.date <= e))
            .cloned()
            .collect())
    }
}
