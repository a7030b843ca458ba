use chrono::{Datelike, Days, NaiveDate, Weekday};
use linfa::traits::{Fit, Predict};
use linfa::Dataset;
use linfa_svm::Svm;
use ndarray::{Array1, Array2, Axis};
use tracing::{debug, info};

use crate::errors::AppError;
use crate::external::market_data::MarketDataProvider;
use crate::models::{ForecastModel, ForecastPoint, ForecastSeries, SvrParams};
use crate::services::price_service::{self, DateRange};

pub const MAX_HORIZON_DAYS: usize = 365;
pub const DEFAULT_LOOKBACK_DAYS: i64 = 60;
pub const MAX_LOOKBACK_DAYS: i64 = 36_500;

const MIN_HISTORY: usize = 2;
/// Below this many points there is nothing meaningful to hold out.
const MIN_SEARCH_HISTORY: usize = 10;
const VALIDATION_FRACTION: f64 = 0.1;

const C_GRID: [f64; 4] = [1.0, 10.0, 100.0, 1000.0];
const KERNEL_WIDTH_GRID: [f64; 4] = [0.01, 0.1, 1.0, 10.0];
const LOSS_EPS_GRID: [f64; 2] = [0.01, 0.1];

#[derive(Debug, Clone, Copy)]
pub struct ForecastConfig {
    /// Calendar days of history the model is fitted on.
    pub lookback_days: i64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            lookback_days: DEFAULT_LOOKBACK_DAYS,
        }
    }
}

/// Parses the free-text day count from the page.
pub fn parse_horizon(raw: Option<&str>) -> Result<usize, AppError> {
    let raw = raw.map(str::trim).unwrap_or_default();
    if raw.is_empty() {
        return Err(AppError::InvalidInput("enter the number of days to forecast".into()));
    }

    let days: i64 = raw
        .parse()
        .map_err(|_| AppError::InvalidInput(format!("'{raw}' is not a whole number of days")))?;
    let days = usize::try_from(days)
        .map_err(|_| AppError::InvalidInput("number of days must be positive".into()))?;

    validate_horizon(days)?;
    Ok(days)
}

pub fn validate_horizon(horizon: usize) -> Result<(), AppError> {
    if horizon == 0 {
        return Err(AppError::InvalidInput("number of days must be positive".into()));
    }
    if horizon > MAX_HORIZON_DAYS {
        return Err(AppError::InvalidInput(format!(
            "number of days must be at most {MAX_HORIZON_DAYS}"
        )));
    }
    Ok(())
}

/// Fetches recent history for `ticker` and predicts `horizon` business days.
pub async fn forecast(
    provider: &dyn MarketDataProvider,
    ticker: &str,
    horizon: usize,
    config: ForecastConfig,
    today: NaiveDate,
) -> Result<ForecastSeries, AppError> {
    validate_horizon(horizon)?;
    info!("Generating {} day forecast for {}", horizon, ticker);

    let start = u64::try_from(config.lookback_days)
        .ok()
        .and_then(|days| today.checked_sub_days(Days::new(days)))
        .ok_or_else(|| {
            AppError::InvalidInput(format!("lookback of {} days is out of range", config.lookback_days))
        })?;
    let range = DateRange::new(Some(start), Some(today));
    let series = price_service::fetch_prices(provider, ticker, range).await?;

    let last_date = series
        .last_date()
        .ok_or_else(|| AppError::NotFound(format!("no recent prices for {ticker}")))?;
    let closes = series.closes();
    let ticker = ticker.to_string();

    // Grid search is CPU bound; keep it off the async workers.
    tokio::task::spawn_blocking(move || forecast_from_closes(&ticker, &closes, last_date, horizon))
        .await
        .map_err(|e| AppError::Internal(format!("forecast task failed: {e}")))?
}

/// Fits on `closes` (oldest first, last one dated `last_date`) and predicts
/// exactly `horizon` points.
pub fn forecast_from_closes(
    ticker: &str,
    closes: &[f64],
    last_date: NaiveDate,
    horizon: usize,
) -> Result<ForecastSeries, AppError> {
    validate_horizon(horizon)?;

    let fitted = FittedForecaster::fit(closes)?;
    info!("Forecasting {} with {}", ticker, fitted.summary.description());
    let dates = next_business_days(last_date, horizon);

    let points = fitted
        .predict_ahead(horizon)
        .into_iter()
        .zip(dates)
        .map(|((day_index, predicted_close), date)| ForecastPoint {
            day_index,
            date,
            predicted_close,
        })
        .collect();

    Ok(ForecastSeries {
        ticker: ticker.to_string(),
        horizon,
        history_len: closes.len(),
        model: fitted.summary.clone(),
        points,
    })
}

/// The `count` weekdays following `after`. Exchange holidays are not skipped.
pub fn next_business_days(after: NaiveDate, count: usize) -> Vec<NaiveDate> {
    std::iter::successors(after.succ_opt(), |d| d.succ_opt())
        .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
        .take(count)
        .collect()
}

enum Regressor {
    Svr(Svm<f64, f64>),
    Constant(f64),
}

/// Regression of close price on day index.
///
/// The index is scaled to `[0, 1]` over the history and the closes are
/// standardized, so one hyper-parameter grid works for any price level.
pub struct FittedForecaster {
    regressor: Regressor,
    history_len: usize,
    x_scale: f64,
    y_mean: f64,
    y_std: f64,
    pub summary: ForecastModel,
}

impl FittedForecaster {
    pub fn fit(closes: &[f64]) -> Result<Self, AppError> {
        let n = closes.len();
        if n < MIN_HISTORY {
            return Err(AppError::InvalidInput(format!(
                "need at least {MIN_HISTORY} historical prices to forecast, got {n}"
            )));
        }
        if closes.iter().any(|v| !v.is_finite()) {
            return Err(AppError::InvalidInput("price history contains non-finite values".into()));
        }

        let x_scale = (n - 1) as f64;
        let y = Array1::from(closes.to_vec());
        let y_mean = y.mean().unwrap_or(0.0);
        let y_std = y.std(0.0);

        if y_std < 1e-12 {
            return Ok(Self {
                regressor: Regressor::Constant(y_mean),
                history_len: n,
                x_scale,
                y_mean,
                y_std,
                summary: ForecastModel::Constant { value: y_mean },
            });
        }

        let x = features(&(0..n).collect::<Vec<_>>(), x_scale);
        let y = y.mapv(|v| (v - y_mean) / y_std);

        let (params, validation_mae) = search_params(&x, &y);
        debug!("Selected SVR params {:?} (validation MAE {:?})", params, validation_mae);

        let model = fit_svr(&x, &y, params)?;

        Ok(Self {
            regressor: Regressor::Svr(model),
            history_len: n,
            x_scale,
            y_mean,
            y_std,
            summary: ForecastModel::Svr {
                params,
                validation_mae: validation_mae.map(|mae| mae * y_std),
            },
        })
    }

    /// Predicted closes at arbitrary day indices.
    pub fn predict_indices(&self, indices: &[usize]) -> Vec<f64> {
        match &self.regressor {
            Regressor::Constant(value) => vec![*value; indices.len()],
            Regressor::Svr(model) => {
                let x = features(indices, self.x_scale);
                let predicted: Array1<f64> = model.predict(&x);
                predicted.iter().map(|v| v * self.y_std + self.y_mean).collect()
            }
        }
    }

    /// `(day_index, close)` for the `horizon` days after the history.
    pub fn predict_ahead(&self, horizon: usize) -> Vec<(usize, f64)> {
        let indices: Vec<usize> = (self.history_len..self.history_len + horizon).collect();
        let values = self.predict_indices(&indices);
        indices.into_iter().zip(values).collect()
    }
}

fn features(indices: &[usize], x_scale: f64) -> Array2<f64> {
    Array1::from_iter(indices.iter().map(|&i| i as f64 / x_scale)).insert_axis(Axis(1))
}

fn fit_svr(x: &Array2<f64>, y: &Array1<f64>, params: SvrParams) -> Result<Svm<f64, f64>, AppError> {
    let dataset = Dataset::new(x.clone(), y.clone());
    Svm::<f64, f64>::params()
        .c_svr(params.c, Some(params.loss_eps))
        .gaussian_kernel(params.kernel_width)
        .fit(&dataset)
        .map_err(|e| AppError::Internal(format!("SVR fit failed: {e}")))
}

/// Grid search scored by mean absolute error on the chronological tail.
/// Returns the default parameters when the history is too short to split.
fn search_params(x: &Array2<f64>, y: &Array1<f64>) -> (SvrParams, Option<f64>) {
    let n = y.len();
    if n < MIN_SEARCH_HISTORY {
        return (SvrParams::default(), None);
    }

    let holdout = ((n as f64 * VALIDATION_FRACTION).ceil() as usize).max(1);
    let split = n - holdout;
    let (x_train, x_valid) = x.view().split_at(Axis(0), split);
    let (y_train, y_valid) = y.view().split_at(Axis(0), split);
    let x_train = x_train.to_owned();
    let y_train = y_train.to_owned();

    let mut best: Option<(SvrParams, f64)> = None;
    for &c in &C_GRID {
        for &kernel_width in &KERNEL_WIDTH_GRID {
            for &loss_eps in &LOSS_EPS_GRID {
                let params = SvrParams {
                    c,
                    kernel_width,
                    loss_eps,
                };
                let Ok(model) = fit_svr(&x_train, &y_train, params) else {
                    continue;
                };

                let predicted: Array1<f64> = model.predict(&x_valid);
                let mae = (&predicted - &y_valid)
                    .mapv(f64::abs)
                    .mean()
                    .unwrap_or(f64::INFINITY);
                if !mae.is_finite() {
                    continue;
                }

                if best.map_or(true, |(_, best_mae)| mae < best_mae) {
                    best = Some((params, mae));
                }
            }
        }
    }

    match best {
        Some((params, mae)) => (params, Some(mae)),
        None => (SvrParams::default(), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::mock::MockMarketData;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn trending(n: usize) -> Vec<f64> {
        (0..n).map(|i| 100.0 + i as f64 + (i as f64 * 0.7).sin()).collect()
    }

    #[test]
    fn test_parse_horizon() {
        assert_eq!(parse_horizon(Some(" 5 ")).unwrap(), 5);
        assert!(matches!(parse_horizon(Some("0")), Err(AppError::InvalidInput(_))));
        assert!(matches!(parse_horizon(Some("-3")), Err(AppError::InvalidInput(_))));
        assert!(matches!(parse_horizon(Some("five")), Err(AppError::InvalidInput(_))));
        assert!(matches!(parse_horizon(Some("2.5")), Err(AppError::InvalidInput(_))));
        assert!(matches!(parse_horizon(None), Err(AppError::InvalidInput(_))));
        assert!(matches!(parse_horizon(Some("1000")), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_next_business_days_skips_weekends() {
        // 2024-06-07 is a Friday
        let days = next_business_days(day(2024, 6, 7), 3);
        assert_eq!(days, vec![day(2024, 6, 10), day(2024, 6, 11), day(2024, 6, 12)]);
    }

    #[test]
    fn test_forecast_returns_exactly_horizon_points() {
        let closes = trending(40);
        for horizon in [1, 5, 30] {
            let series = forecast_from_closes("TSLA", &closes, day(2024, 6, 7), horizon).unwrap();
            assert_eq!(series.points.len(), horizon);
            assert_eq!(series.points[0].day_index, 40);
            assert_eq!(series.points[horizon - 1].day_index, 40 + horizon - 1);
            assert!(series.points.iter().all(|p| p.predicted_close.is_finite()));
            assert!(series.points.windows(2).all(|w| w[0].date < w[1].date));
        }
    }

    #[test]
    fn test_forecast_zero_horizon_is_invalid() {
        let err = forecast_from_closes("TSLA", &trending(20), day(2024, 6, 7), 0).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[test]
    fn test_forecast_needs_two_points() {
        let err = forecast_from_closes("TSLA", &[101.0], day(2024, 6, 7), 3).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));

        let series = forecast_from_closes("TSLA", &[101.0, 102.0], day(2024, 6, 7), 3).unwrap();
        assert_eq!(series.points.len(), 3);
    }

    #[test]
    fn test_constant_history_projects_constant() {
        let series = forecast_from_closes("FLAT", &[50.0; 15], day(2024, 6, 7), 4).unwrap();
        assert_eq!(series.model, ForecastModel::Constant { value: 50.0 });
        assert!(series.points.iter().all(|p| p.predicted_close == 50.0));
    }

    #[test]
    fn test_in_sample_fit_is_reasonable() {
        let closes = trending(40);
        let fitted = FittedForecaster::fit(&closes).unwrap();
        assert!(matches!(fitted.summary, ForecastModel::Svr { validation_mae: Some(_), .. }));

        let indices: Vec<usize> = (0..closes.len()).collect();
        let predicted = fitted.predict_indices(&indices);
        let mae = predicted
            .iter()
            .zip(&closes)
            .map(|(p, c)| (p - c).abs())
            .sum::<f64>()
            / closes.len() as f64;
        assert!(mae < 5.0, "in-sample MAE too large: {mae}");
    }

    #[test]
    fn test_refit_on_own_output_window() {
        let closes = trending(30);
        let first = FittedForecaster::fit(&closes).unwrap();
        let window: Vec<f64> = first.predict_ahead(closes.len()).into_iter().map(|(_, v)| v).collect();
        assert_eq!(window.len(), closes.len());

        let second = FittedForecaster::fit(&window).unwrap();
        assert_eq!(second.predict_ahead(7).len(), 7);
        let indices: Vec<usize> = (0..window.len()).collect();
        assert_eq!(second.predict_indices(&indices).len(), window.len());
    }

    #[tokio::test]
    async fn test_forecast_uses_lookback_window() {
        let today = day(2024, 6, 30);
        let provider = MockMarketData::new()
            .with_history("TSLA", MockMarketData::daily(day(2024, 1, 1), &trending(182)));

        let series = forecast(&provider, "TSLA", 5, ForecastConfig::default(), today)
            .await
            .unwrap();

        // 2024-05-01 through 2024-06-30
        assert_eq!(series.history_len, 61);
        assert_eq!(series.points.len(), 5);
        assert_eq!(series.points[0].date, day(2024, 7, 1));
    }

    #[tokio::test]
    async fn test_forecast_rejects_unrepresentable_lookback() {
        let provider = MockMarketData::new()
            .with_history("TSLA", MockMarketData::daily(day(2024, 1, 1), &trending(30)));

        for lookback_days in [-1, i64::MAX] {
            let err = forecast(&provider, "TSLA", 5, ForecastConfig { lookback_days }, day(2024, 6, 30))
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::InvalidInput(_)));
        }
        assert_eq!(provider.history_calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_forecast_unknown_ticker() {
        let err = forecast(&MockMarketData::new(), "NOPE", 5, ForecastConfig::default(), day(2024, 6, 30))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
