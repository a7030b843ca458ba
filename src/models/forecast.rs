use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Single predicted close.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastPoint {
    /// Ordinal day index, continuing from the last historical index.
    pub day_index: usize,
    pub date: NaiveDate,
    pub predicted_close: f64,
}

/// Hyper-parameters of the fitted support-vector regression.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SvrParams {
    pub c: f64,
    pub kernel_width: f64,
    pub loss_eps: f64,
}

impl Default for SvrParams {
    fn default() -> Self {
        Self {
            c: 100.0,
            kernel_width: 0.1,
            loss_eps: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ForecastModel {
    /// RBF-kernel SVR over the scaled day index.
    Svr { params: SvrParams, validation_mae: Option<f64> },
    /// Zero-variance history; the constant is carried forward.
    Constant { value: f64 },
}

impl ForecastModel {
    pub fn description(&self) -> &'static str {
        match self {
            ForecastModel::Svr { .. } => "Support-vector regression with a Gaussian kernel",
            ForecastModel::Constant { .. } => "Flat projection of a constant price history",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastSeries {
    pub ticker: String,
    pub horizon: usize,
    pub history_len: usize,
    pub model: ForecastModel,
    pub points: Vec<ForecastPoint>,
}
