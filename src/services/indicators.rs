use crate::errors::AppError;
use crate::models::{IndicatorPoint, IndicatorSeries, PriceSeries};

pub const DEFAULT_EMA_SPAN: usize = 20;

/// Exponential Moving Average (EMA)
///
/// α = 2 / (span + 1); each value is `α * current + (1 - α) * previous`.
/// Seeded with the first value and returned for every index, so the output
/// is always as long as the input.
pub fn ema(values: &[f64], span: usize) -> Vec<f64> {
    let Some(&first) = values.first() else {
        return Vec::new();
    };

    let alpha = 2.0 / (span as f64 + 1.0);

    values
        .iter()
        .scan(first, move |prev_ema, &v| {
            let next = alpha * v + (1.0 - alpha) * *prev_ema;
            *prev_ema = next;
            Some(next)
        })
        .collect()
}

/// EMA over the closes of `series`, one point per trading day.
pub fn ema_series(series: &PriceSeries, span: usize) -> Result<IndicatorSeries, AppError> {
    if span == 0 {
        return Err(AppError::InvalidInput("EMA span must be at least 1".into()));
    }

    let values = ema(&series.closes(), span);
    let points = series
        .records
        .iter()
        .zip(values)
        .map(|(record, value)| IndicatorPoint {
            date: record.date,
            value,
        })
        .collect();

    Ok(IndicatorSeries {
        ticker: series.ticker.clone(),
        span,
        points,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::mock::MockMarketData;
    use chrono::NaiveDate;

    #[test]
    fn test_ema_constant_series_is_fixed_point() {
        let values = vec![42.5; 30];
        let out = ema(&values, 20);
        assert!(out.iter().all(|&v| (v - 42.5).abs() < 1e-12));
    }

    #[test]
    fn test_ema_length_and_seed() {
        let values: Vec<f64> = (0..25).map(|i| 100.0 + (i as f64).sin() * 5.0).collect();
        let out = ema(&values, 20);

        assert_eq!(out.len(), values.len());
        assert_eq!(out[0], values[0]);
    }

    #[test]
    fn test_ema_known_values() {
        // span 3 -> alpha 0.5
        let out = ema(&[2.0, 4.0, 8.0, 0.0], 3);
        assert_eq!(out, vec![2.0, 3.0, 5.5, 2.75]);
    }

    #[test]
    fn test_ema_span_one_tracks_input() {
        let values = [3.0, 1.0, 4.0, 1.0, 5.0];
        assert_eq!(ema(&values, 1), values.to_vec());
    }

    #[test]
    fn test_ema_empty() {
        assert!(ema(&[], 20).is_empty());
    }

    #[test]
    fn test_ema_series_aligns_dates() {
        let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let series = PriceSeries::new("TSLA", MockMarketData::daily(start, &[10.0, 20.0, 30.0]));

        let indicator = ema_series(&series, DEFAULT_EMA_SPAN).unwrap();
        assert_eq!(indicator.label(), "EMA_20");
        assert_eq!(indicator.points.len(), 3);
        assert_eq!(indicator.points[0].date, start);
        assert_eq!(indicator.points[0].value, 10.0);
        assert!(matches!(ema_series(&series, 0), Err(AppError::InvalidInput(_))));
    }
}
