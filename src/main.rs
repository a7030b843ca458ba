mod app;
mod config;
mod errors;
mod external;
mod logging;
mod models;
mod routes;
mod services;
mod state;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;

use crate::config::AppConfig;
use crate::external::yahoofinance::YahooFinanceProvider;
use crate::logging::LoggingConfig;
use crate::state::AppState;

#[derive(Debug, Parser)]
#[command(name = "stockino", version, about = "Stock dashboard: company info, price charts, EMA and forecasts")]
struct Cli {
    /// Verbose logging, assets re-read from disk on every request, permissive CORS
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = AppConfig::from_env().context("invalid configuration")?;
    config.debug |= cli.debug;

    // Initialize logging FIRST
    logging::init_logging(LoggingConfig::from_env(config.debug))
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {e}"))?;

    let provider = YahooFinanceProvider::new(
        &config.yahoo_base_url,
        &config.yahoo_cookie_url,
        config.http_timeout,
    )
    .context("failed to create Yahoo Finance client")?;
    tracing::info!("📊 Using market data from {}", config.yahoo_base_url);

    let state = AppState::new(Arc::new(provider), &config);
    let app = app::create_app(state);

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!(
        "🚀 Stockino dashboard running at http://{}/ (debug: {})",
        config.bind_addr,
        config.debug
    );
    axum::serve(listener, app).await?;

    Ok(())
}
