use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::review::Sentiment;

/// Negative / neutral / positive counts for one day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SentimentCounts {
    pub negative: usize,
    pub neutral: usize,
    pub positive: usize,
}

impl SentimentCounts {
    pub fn get(&self, sentiment: Sentiment) -> usize {
        match sentiment {
            Sentiment::Negative => self.negative,
            Sentiment::Neutral => self.neutral,
            Sentiment::Positive => self.positive,
        }
    }

    fn bump(&mut self, sentiment: Sentiment) {
        match sentiment {
            Sentiment::Negative => self.negative += 1,
            Sentiment::Neutral => self.neutral += 1,
            Sentiment::Positive => self.positive += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.negative + self.neutral + self.positive
    }

    /// Counts in column order: negative, neutral, positive.
    pub fn as_array(&self) -> [usize; 3] {
        Sentiment::ALL.map(|s| self.get(s))
    }
}

/// Per-day sentiment counts, days ascending.
///
/// Only days that actually have reviews appear as keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DailySentimentTable {
    rows: BTreeMap<NaiveDate, SentimentCounts>,
}

impl DailySentimentTable {
    /// Buckets labelled reviews by day.
    pub fn aggregate<I>(labelled: I) -> Self
    where
        I: IntoIterator<Item = (NaiveDate, Sentiment)>,
    {
        let mut rows: BTreeMap<NaiveDate, SentimentCounts> = BTreeMap::new();
        for (day, sentiment) in labelled {
            rows.entry(day).or_default().bump(sentiment);
        }
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn days(&self) -> impl Iterator<Item = &NaiveDate> {
        self.rows.keys()
    }

    pub fn rows(&self) -> impl Iterator<Item = (&NaiveDate, &SentimentCounts)> {
        self.rows.iter()
    }

    pub fn get(&self, day: NaiveDate) -> Option<&SentimentCounts> {
        self.rows.get(&day)
    }

    /// Largest single count in the table; used to size the chart axis.
    pub fn max_count(&self) -> usize {
        self.rows
            .values()
            .flat_map(|c| c.as_array())
            .max()
            .unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.rows.values().map(SentimentCounts::total).sum()
    }
}
