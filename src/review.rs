use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::range::DateInterval;

/// Sentiment label attached to a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Negative,
    Neutral,
    Positive,
}

impl Sentiment {
    /// Fixed column order used by the daily table and the chart.
    pub const ALL: [Sentiment; 3] = [Sentiment::Negative, Sentiment::Neutral, Sentiment::Positive];

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
            Sentiment::Positive => "positive",
        }
    }

    /// Loose mapping from a model answer: anything mentioning "pos" or "neg".
    pub fn from_label(label: &str) -> Self {
        let label = label.trim().to_lowercase();
        if label.contains("pos") {
            Sentiment::Positive
        } else if label.contains("neg") {
            Sentiment::Negative
        } else {
            Sentiment::Neutral
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the review table after normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub text: String,
    pub timestamp: Option<NaiveDateTime>,
    pub rating: Option<f64>,
    /// Passthrough columns such as `store_name` or `Yelp URL`.
    #[serde(default)]
    pub extras: BTreeMap<String, String>,
}

impl Review {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            timestamp: None,
            rating: None,
            extras: BTreeMap::new(),
        }
    }

    pub fn with_timestamp(mut self, timestamp: NaiveDateTime) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_rating(mut self, rating: f64) -> Self {
        self.rating = Some(rating);
        self
    }

    /// Calendar day of the review, if it has a timestamp.
    pub fn day(&self) -> Option<NaiveDate> {
        self.timestamp.map(|ts| ts.date())
    }
}

/// All reviews loaded from one source file.
#[derive(Debug, Clone, Default)]
pub struct ReviewDataset {
    pub source: PathBuf,
    pub records: Vec<Review>,
}

impl ReviewDataset {
    pub fn new(source: impl Into<PathBuf>, records: Vec<Review>) -> Self {
        Self {
            source: source.into(),
            records,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Records that carry a usable timestamp.
    pub fn dated(&self) -> impl Iterator<Item = &Review> {
        self.records.iter().filter(|r| r.timestamp.is_some())
    }

    pub fn earliest_timestamp(&self) -> Option<NaiveDateTime> {
        self.dated().filter_map(|r| r.timestamp).min()
    }

    pub fn latest_timestamp(&self) -> Option<NaiveDateTime> {
        self.dated().filter_map(|r| r.timestamp).max()
    }

    /// First and last calendar day present in the data.
    pub fn date_span(&self) -> Option<DateInterval> {
        let start = self.earliest_timestamp()?.date();
        let end = self.latest_timestamp()?.date();
        Some(DateInterval::new(start, end))
    }

    /// Dated records whose day falls inside `interval`, in file order.
    pub fn within(&self, interval: &DateInterval) -> Vec<&Review> {
        self.dated()
            .filter(|r| r.day().is_some_and(|day| interval.contains(day)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_sentiment_from_label() {
        assert_eq!(Sentiment::from_label("Positive."), Sentiment::Positive);
        assert_eq!(Sentiment::from_label(" NEGATIVE"), Sentiment::Negative);
        assert_eq!(Sentiment::from_label("mixed"), Sentiment::Neutral);
    }

    #[test]
    fn test_date_span_ignores_undated_rows() {
        let ds = ReviewDataset::new(
            "mem.csv",
            vec![
                Review::new("a").with_timestamp(at(2022, 6, 3, 9)),
                Review::new("b"),
                Review::new("c").with_timestamp(at(2022, 6, 1, 23)),
            ],
        );
        let span = ds.date_span().unwrap();
        assert_eq!(span.start, NaiveDate::from_ymd_opt(2022, 6, 1).unwrap());
        assert_eq!(span.end, NaiveDate::from_ymd_opt(2022, 6, 3).unwrap());
    }

    #[test]
    fn test_within_includes_whole_end_day() {
        let ds = ReviewDataset::new(
            "mem.csv",
            vec![
                Review::new("morning").with_timestamp(at(2022, 6, 15, 8)),
                Review::new("evening").with_timestamp(at(2022, 6, 15, 22)),
                Review::new("later").with_timestamp(at(2022, 6, 16, 0)),
            ],
        );
        let day = NaiveDate::from_ymd_opt(2022, 6, 15).unwrap();
        let rows = ds.within(&DateInterval::new(day, day));
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_no_span_without_timestamps() {
        let ds = ReviewDataset::new("mem.csv", vec![Review::new("x")]);
        assert!(ds.date_span().is_none());
    }
}
