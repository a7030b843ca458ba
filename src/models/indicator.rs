use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// EMA of a closing-price series; one point per input record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorSeries {
    pub ticker: String,
    pub span: usize,
    pub points: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    pub fn label(&self) -> String {
        format!("EMA_{}", self.span)
    }
}
