use std::fmt::Display;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, bail};

use crate::services::forecasting_service::{ForecastConfig, DEFAULT_LOOKBACK_DAYS, MAX_LOOKBACK_DAYS};
use crate::services::indicators::DEFAULT_EMA_SPAN;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub debug: bool,
    pub assets_dir: PathBuf,
    pub yahoo_base_url: String,
    pub yahoo_cookie_url: String,
    pub http_timeout: Duration,
    pub ema_span: usize,
    pub forecast: ForecastConfig,
    pub default_ticker: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; unset keys take their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let config = Self {
            bind_addr: parse_var(&lookup, "BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 8050)))?,
            debug: parse_var(&lookup, "DASHBOARD_DEBUG", false)?,
            assets_dir: lookup("ASSETS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("assets")),
            yahoo_base_url: lookup("YAHOO_BASE_URL")
                .unwrap_or_else(|| "https://query1.finance.yahoo.com".to_string()),
            yahoo_cookie_url: lookup("YAHOO_COOKIE_URL")
                .unwrap_or_else(|| "https://fc.yahoo.com".to_string()),
            http_timeout: Duration::from_secs(parse_var(&lookup, "HTTP_TIMEOUT_SECS", 20u64)?),
            ema_span: parse_var(&lookup, "EMA_SPAN", DEFAULT_EMA_SPAN)?,
            forecast: ForecastConfig {
                lookback_days: parse_var(&lookup, "FORECAST_LOOKBACK_DAYS", DEFAULT_LOOKBACK_DAYS)?,
            },
            default_ticker: lookup("DEFAULT_TICKER").unwrap_or_else(|| "TSLA".to_string()),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.ema_span == 0 {
            bail!("EMA_SPAN must be at least 1");
        }
        if !(2..=MAX_LOOKBACK_DAYS).contains(&self.forecast.lookback_days) {
            bail!("FORECAST_LOOKBACK_DAYS must be between 2 and {MAX_LOOKBACK_DAYS}");
        }
        if self.http_timeout.is_zero() {
            bail!("HTTP_TIMEOUT_SECS must be positive");
        }
        Ok(())
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("invalid value for {key} ({raw:?}): {e}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> anyhow::Result<AppConfig> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.bind_addr.port(), 8050);
        assert!(!config.debug);
        assert_eq!(config.ema_span, 20);
        assert_eq!(config.forecast.lookback_days, 60);
        assert_eq!(config.default_ticker, "TSLA");
        assert_eq!(config.http_timeout, Duration::from_secs(20));
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("BIND_ADDR", "127.0.0.1:9000"),
            ("DASHBOARD_DEBUG", "true"),
            ("EMA_SPAN", "50"),
            ("FORECAST_LOOKBACK_DAYS", "120"),
        ])
        .unwrap();
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:9000");
        assert!(config.debug);
        assert_eq!(config.ema_span, 50);
        assert_eq!(config.forecast.lookback_days, 120);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(config_from(&[("EMA_SPAN", "twenty")]).is_err());
        assert!(config_from(&[("EMA_SPAN", "0")]).is_err());
        assert!(config_from(&[("FORECAST_LOOKBACK_DAYS", "1")]).is_err());
        assert!(config_from(&[("FORECAST_LOOKBACK_DAYS", "36501")]).is_err());
        assert!(config_from(&[("FORECAST_LOOKBACK_DAYS", "9223372036854775807")]).is_err());
        assert!(config_from(&[("FORECAST_LOOKBACK_DAYS", "36500")]).is_ok());
        assert!(config_from(&[("BIND_ADDR", "localhost")]).is_err());
    }
}
