use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use reqwest::StatusCode;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use url::Url;

use crate::external::market_data::{MarketDataError, MarketDataProvider};
use crate::models::{CompanyProfile, PriceRecord};

const USER_AGENT: &str = "Mozilla/5.0 (compatible; Stockino/0.1)";
const LOGO_SERVICE: &str = "https://logo.clearbit.com";

/// Yahoo Finance provider. No API key required.
///
/// Prices come from the v8 chart endpoint. Profiles come from v10
/// quoteSummary, which needs a session cookie plus a crumb token; both are
/// obtained lazily on the first profile request.
pub struct YahooFinanceProvider {
    client: reqwest::Client,
    base_url: Url,
    cookie_url: String,
    crumb: Mutex<Option<String>>,
}

impl YahooFinanceProvider {
    pub fn new(base_url: &str, cookie_url: &str, timeout: Duration) -> Result<Self, MarketDataError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .cookie_store(true)
            .timeout(timeout)
            .build()
            .map_err(|e| MarketDataError::Network(e.to_string()))?;

        let base_url = Url::parse(base_url)
            .map_err(|e| MarketDataError::BadResponse(format!("invalid base url {base_url}: {e}")))?;

        Ok(Self {
            client,
            base_url,
            cookie_url: cookie_url.to_string(),
            crumb: Mutex::new(None),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, MarketDataError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| MarketDataError::BadResponse("base url cannot hold a path".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn crumb(&self) -> Result<String, MarketDataError> {
        let mut slot = self.crumb.lock().await;
        if let Some(crumb) = slot.as_ref() {
            return Ok(crumb.clone());
        }

        // Only the Set-Cookie header matters here; the status is usually 404.
        let cookie_resp = self
            .client
            .get(&self.cookie_url)
            .send()
            .await
            .map_err(network_error)?;
        debug!("Yahoo session cookie request returned {}", cookie_resp.status());

        let resp = self
            .client
            .get(self.endpoint(&["v1", "test", "getcrumb"])?)
            .send()
            .await
            .map_err(network_error)?;

        if resp.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(MarketDataError::RateLimited);
        }
        if !resp.status().is_success() {
            return Err(MarketDataError::BadResponse(format!(
                "crumb request failed with HTTP {}",
                resp.status()
            )));
        }

        let crumb = resp.text().await.map_err(network_error)?.trim().to_string();
        if crumb.is_empty() || crumb.contains('<') {
            return Err(MarketDataError::BadResponse("empty crumb".into()));
        }

        *slot = Some(crumb.clone());
        Ok(crumb)
    }
}

fn network_error(e: reqwest::Error) -> MarketDataError {
    MarketDataError::Network(e.to_string())
}

#[derive(Debug, Deserialize)]
struct YahooError {
    code: Option<String>,
    description: Option<String>,
}

impl YahooError {
    fn is_not_found(&self) -> bool {
        self.code.as_deref() == Some("Not Found")
            || self
                .description
                .as_deref()
                .is_some_and(|d| d.contains("No data found") || d.contains("not found"))
    }

    fn message(&self) -> String {
        self.description
            .clone()
            .or_else(|| self.code.clone())
            .unwrap_or_else(|| "unknown upstream error".to_string())
    }
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<YahooError>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: Option<ChartMeta>,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    gmtoffset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Default, Deserialize)]
struct ChartQuote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteSummaryResponse {
    quote_summary: QuoteSummary,
}

#[derive(Debug, Deserialize)]
struct QuoteSummary {
    result: Option<Vec<QuoteSummaryResult>>,
    error: Option<YahooError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteSummaryResult {
    price: Option<QuotePrice>,
    asset_profile: Option<AssetProfile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuotePrice {
    short_name: Option<String>,
    long_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssetProfile {
    long_business_summary: Option<String>,
    website: Option<String>,
}

/// Turns a chart payload into records. Rows with a missing price are skipped,
/// a missing volume counts as zero.
fn parse_chart(ticker: &str, body: ChartResponse) -> Result<Vec<PriceRecord>, MarketDataError> {
    if let Some(error) = body.chart.error {
        if error.is_not_found() {
            return Err(MarketDataError::NotFound(ticker.to_string()));
        }
        return Err(MarketDataError::BadResponse(error.message()));
    }

    let result = body
        .chart
        .result
        .and_then(|mut r| if r.is_empty() { None } else { Some(r.swap_remove(0)) })
        .ok_or_else(|| MarketDataError::NotFound(ticker.to_string()))?;

    // Yahoo stamps each bar at the session open; shift into exchange time
    // so the calendar date matches the trading day.
    let offset = result.meta.and_then(|m| m.gmtoffset).unwrap_or(0);
    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();

    let mut records = Vec::with_capacity(result.timestamp.len());
    for (i, ts) in result.timestamp.iter().enumerate() {
        let field = |v: &Vec<Option<f64>>| v.get(i).copied().flatten();
        let (Some(open), Some(high), Some(low), Some(close)) = (
            field(&quote.open),
            field(&quote.high),
            field(&quote.low),
            field(&quote.close),
        ) else {
            continue;
        };

        let date = chrono::DateTime::from_timestamp(ts + offset, 0)
            .map(|dt| dt.date_naive())
            .ok_or_else(|| MarketDataError::Parse(format!("bad timestamp {ts}")))?;

        let volume = field(&quote.volume).map(|v| v.max(0.0).round() as u64).unwrap_or(0);

        records.push(PriceRecord {
            date,
            open,
            high,
            low,
            close,
            volume,
        });
    }

    if records.is_empty() {
        return Err(MarketDataError::NotFound(ticker.to_string()));
    }

    Ok(records)
}

fn parse_profile(ticker: &str, body: QuoteSummaryResponse) -> Result<CompanyProfile, MarketDataError> {
    if let Some(error) = body.quote_summary.error {
        if error.is_not_found() {
            return Err(MarketDataError::NotFound(ticker.to_string()));
        }
        return Err(MarketDataError::BadResponse(error.message()));
    }

    let result = body
        .quote_summary
        .result
        .and_then(|mut r| if r.is_empty() { None } else { Some(r.swap_remove(0)) })
        .ok_or_else(|| MarketDataError::NotFound(ticker.to_string()))?;

    let (short_name, long_name) = result
        .price
        .map(|p| (p.short_name, p.long_name))
        .unwrap_or((None, None));
    let (summary, website) = result
        .asset_profile
        .map(|a| (a.long_business_summary, a.website))
        .unwrap_or((None, None));

    let name = short_name
        .or(long_name)
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| ticker.to_string());

    Ok(CompanyProfile {
        ticker: ticker.to_string(),
        name,
        logo_url: website.as_deref().and_then(logo_from_website),
        summary,
        website,
    })
}

/// Logo URL for a company website, keyed by host without a leading `www.`.
fn logo_from_website(website: &str) -> Option<String> {
    let url = Url::parse(website)
        .or_else(|_| Url::parse(&format!("https://{website}")))
        .ok()?;
    let host = url.host_str()?;
    let host = host.strip_prefix("www.").unwrap_or(host);
    if host.is_empty() {
        return None;
    }
    Some(format!("{LOGO_SERVICE}/{host}"))
}

fn unix_start_of(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp()
}

/// Chart query for daily bars. Without a start the whole history is asked
/// for; otherwise `period2` is midnight after `end` so `end` is included.
fn history_query(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    now: i64,
) -> Vec<(&'static str, String)> {
    let mut query = vec![
        ("interval", "1d".to_string()),
        ("includeAdjustedClose", "true".to_string()),
    ];
    match start {
        Some(start) => {
            query.push(("period1", unix_start_of(start).to_string()));
            let period2 = end
                .and_then(|d| d.succ_opt())
                .map(unix_start_of)
                .unwrap_or(now);
            query.push(("period2", period2.to_string()));
        }
        None => query.push(("range", "max".to_string())),
    }
    query
}

fn classify_status(ticker: &str, status: StatusCode) -> Result<(), MarketDataError> {
    match status {
        StatusCode::TOO_MANY_REQUESTS => Err(MarketDataError::RateLimited),
        StatusCode::NOT_FOUND => Err(MarketDataError::NotFound(ticker.to_string())),
        s if s.is_success() => Ok(()),
        s => Err(MarketDataError::BadResponse(format!("HTTP {s}"))),
    }
}

fn rejects_crumb(status: StatusCode) -> bool {
    status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN
}

impl YahooFinanceProvider {
    /// Status check for quoteSummary calls. A rejected crumb is dropped so
    /// the next call negotiates a fresh session.
    async fn check_profile_status(&self, ticker: &str, status: StatusCode) -> Result<(), MarketDataError> {
        if rejects_crumb(status) {
            warn!("Yahoo rejected crumb for {} (HTTP {}), dropping it", ticker, status);
            *self.crumb.lock().await = None;
        }
        classify_status(ticker, status)
    }
}

#[async_trait]
impl MarketDataProvider for YahooFinanceProvider {
    async fn fetch_profile(&self, ticker: &str) -> Result<CompanyProfile, MarketDataError> {
        let crumb = self.crumb().await?;
        let url = self.endpoint(&["v10", "finance", "quoteSummary", ticker])?;

        let resp = self
            .client
            .get(url)
            .query(&[("modules", "price,assetProfile"), ("crumb", crumb.as_str())])
            .send()
            .await
            .map_err(network_error)?;

        self.check_profile_status(ticker, resp.status()).await?;

        let body: QuoteSummaryResponse = resp
            .json()
            .await
            .map_err(|e| MarketDataError::Parse(e.to_string()))?;

        parse_profile(ticker, body)
    }

    async fn fetch_daily_history(
        &self,
        ticker: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<PriceRecord>, MarketDataError> {
        let url = self.endpoint(&["v8", "finance", "chart", ticker])?;

        let query = history_query(start, end, chrono::Utc::now().timestamp());

        let resp = self
            .client
            .get(url)
            .query(&query)
            .send()
            .await
            .map_err(network_error)?;

        classify_status(ticker, resp.status())?;

        let body: ChartResponse = resp
            .json()
            .await
            .map_err(|e| MarketDataError::Parse(e.to_string()))?;

        let mut records = parse_chart(ticker, body)?;
        if let Some(end) = end {
            records.retain(|r| r.date <= end);
        }
        debug!("Fetched {} daily records for {}", records.len(), ticker);

        Ok(records)
    }
}
