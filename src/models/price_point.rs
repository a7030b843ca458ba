use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One trading day of one ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// Daily records for a single ticker, ascending by date with no duplicate dates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceSeries {
    pub ticker: String,
    pub records: Vec<PriceRecord>,
}

impl PriceSeries {
    /// Sorts and deduplicates `records`. When a date appears twice the last row wins.
    pub fn new(ticker: impl Into<String>, mut records: Vec<PriceRecord>) -> Self {
        records.sort_by_key(|r| r.date);
        // dedup_by keeps the first of a run, so walk from the back
        records.reverse();
        records.dedup_by_key(|r| r.date);
        records.reverse();

        Self {
            ticker: ticker.into(),
            records,
        }
    }

    pub fn closes(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.close).collect()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.records.last().map(|r| r.date)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(date: &str, close: f64) -> PriceRecord {
        PriceRecord {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            open: close,
            high: close,
            low: close,
            close,
            volume: 100,
        }
    }

    #[test]
    fn test_series_sorted_and_deduplicated() {
        let series = PriceSeries::new(
            "TSLA",
            vec![
                record("2024-01-03", 3.0),
                record("2024-01-02", 2.0),
                record("2024-01-03", 3.5),
                record("2024-01-01", 1.0),
            ],
        );

        let dates: Vec<String> = series.records.iter().map(|r| r.date.to_string()).collect();
        assert_eq!(dates, vec!["2024-01-01", "2024-01-02", "2024-01-03"]);
        // the later duplicate row replaces the earlier one
        assert_eq!(series.closes(), vec![1.0, 2.0, 3.5]);
    }

    #[test]
    fn test_empty_series() {
        let series = PriceSeries::new("TSLA", vec![]);
        assert!(series.is_empty());
        assert_eq!(series.last_date(), None);
    }
}
