use std::path::PathBuf;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::external::market_data::MarketDataProvider;
use crate::services::forecasting_service::ForecastConfig;

/// Server context built once at start-up and shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub market_data: Arc<dyn MarketDataProvider>,
    pub settings: Arc<DashboardSettings>,
}

#[derive(Debug, Clone)]
pub struct DashboardSettings {
    pub debug: bool,
    pub assets_dir: PathBuf,
    pub ema_span: usize,
    pub forecast: ForecastConfig,
    pub default_ticker: String,
}

impl AppState {
    pub fn new(market_data: Arc<dyn MarketDataProvider>, config: &AppConfig) -> Self {
        Self {
            market_data,
            settings: Arc::new(DashboardSettings {
                debug: config.debug,
                assets_dir: config.assets_dir.clone(),
                ema_span: config.ema_span,
                forecast: config.forecast,
                default_ticker: config.default_ticker.clone(),
            }),
        }
    }
}
