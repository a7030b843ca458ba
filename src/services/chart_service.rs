use crate::models::{ChartFigure, ForecastSeries, IndicatorSeries, PriceSeries, Trace, TraceMode};

fn figure(title: String, y_label: &str, traces: Vec<Trace>) -> ChartFigure {
    // An all-empty chart has no traces at all
    let traces = traces.into_iter().filter(|t| !t.x.is_empty()).collect();
    ChartFigure {
        title,
        x_label: "Date".to_string(),
        y_label: y_label.to_string(),
        traces,
    }
}

/// Closing and opening prices against date.
pub fn price_chart(series: &PriceSeries) -> ChartFigure {
    let x: Vec<String> = series.records.iter().map(|r| r.date.to_string()).collect();

    let close = Trace {
        name: "Close".to_string(),
        mode: TraceMode::Lines,
        x: x.clone(),
        y: series.records.iter().map(|r| r.close).collect(),
    };
    let open = Trace {
        name: "Open".to_string(),
        mode: TraceMode::Lines,
        x,
        y: series.records.iter().map(|r| r.open).collect(),
    };

    figure(
        "Closing and Opening Price vs Date".to_string(),
        "Price",
        vec![close, open],
    )
}

pub fn indicator_chart(series: &IndicatorSeries) -> ChartFigure {
    let trace = Trace {
        name: series.label(),
        mode: TraceMode::LinesMarkers,
        x: series.points.iter().map(|p| p.date.to_string()).collect(),
        y: series.points.iter().map(|p| p.value).collect(),
    };

    figure(
        "Exponential Moving Average vs Date".to_string(),
        &series.label(),
        vec![trace],
    )
}

pub fn forecast_chart(series: &ForecastSeries) -> ChartFigure {
    let trace = Trace {
        name: "Predicted Close".to_string(),
        mode: TraceMode::LinesMarkers,
        x: series.points.iter().map(|p| p.date.to_string()).collect(),
        y: series.points.iter().map(|p| p.predicted_close).collect(),
    };

    figure(
        format!("Predicted Close Price of next {} days", series.points.len()),
        "Close Price",
        vec![trace],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::mock::MockMarketData;
    use crate::models::{ForecastModel, ForecastPoint};
    use crate::services::indicators::ema_series;
    use chrono::NaiveDate;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
    }

    #[test]
    fn test_price_chart_has_close_and_open() {
        let series = PriceSeries::new("TSLA", MockMarketData::daily(start(), &[10.0, 11.0, 12.0]));
        let chart = price_chart(&series);

        assert_eq!(chart.title, "Closing and Opening Price vs Date");
        assert_eq!(chart.x_label, "Date");
        let names: Vec<&str> = chart.traces.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Close", "Open"]);
        assert_eq!(chart.traces[0].y, vec![10.0, 11.0, 12.0]);
        assert_eq!(chart.traces[1].y, vec![9.5, 10.5, 11.5]);
        assert_eq!(chart.traces[0].x[0], "2024-01-02");
    }

    #[test]
    fn test_indicator_chart_uses_markers() {
        let series = PriceSeries::new("TSLA", MockMarketData::daily(start(), &[10.0, 11.0]));
        let chart = indicator_chart(&ema_series(&series, 20).unwrap());

        assert_eq!(chart.traces.len(), 1);
        assert_eq!(chart.traces[0].name, "EMA_20");
        assert_eq!(chart.traces[0].mode, TraceMode::LinesMarkers);
    }

    #[test]
    fn test_forecast_chart_title_counts_points() {
        let series = ForecastSeries {
            ticker: "TSLA".to_string(),
            horizon: 2,
            history_len: 10,
            model: ForecastModel::Constant { value: 1.0 },
            points: vec![
                ForecastPoint { day_index: 10, date: start(), predicted_close: 1.0 },
                ForecastPoint { day_index: 11, date: start().succ_opt().unwrap(), predicted_close: 1.0 },
            ],
        };

        let chart = forecast_chart(&series);
        assert_eq!(chart.title, "Predicted Close Price of next 2 days");
        assert_eq!(chart.traces[0].x.len(), 2);
    }

    #[test]
    fn test_empty_series_gives_empty_chart() {
        let chart = price_chart(&PriceSeries::new("TSLA", vec![]));
        assert!(chart.traces.is_empty());
        assert_eq!(chart.title, "Closing and Opening Price vs Date");
    }
}
