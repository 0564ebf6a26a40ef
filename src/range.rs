//! Turns a user's range phrase into an inclusive day interval.

use std::fmt;

use chrono::{Datelike, Local, NaiveDate, NaiveDateTime, NaiveTime};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::date_phrase::{self, ParsedDate};
use crate::error::ReviewError;

const ALL_TIME: [&str; 5] = ["all", "all time", "full", "entire", "everything"];
const RELATIVE_MARKERS: [&str; 6] = ["last", "yesterday", "today", "this ", "past ", "previous "];

/// Inclusive interval of calendar days. `start <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateInterval {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateInterval {
    /// Builds an interval, swapping the bounds if they arrive reversed.
    pub fn new(a: NaiveDate, b: NaiveDate) -> Self {
        if a <= b {
            Self { start: a, end: b }
        } else {
            Self { start: b, end: a }
        }
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }

    /// Number of calendar days covered, both ends included.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

impl fmt::Display for DateInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

/// True for the literals that mean "the whole dataset".
pub fn is_all_time(phrase: &str) -> bool {
    let s = phrase.trim().to_lowercase();
    ALL_TIME.contains(&s.as_str())
}

/// Whether the phrase reads as relative to some "now".
///
/// This only looks at wording; it decides if an empty first attempt is worth
/// re-anchoring on the dataset.
pub fn is_relative_phrase(phrase: &str) -> bool {
    let s = phrase.trim().to_lowercase();
    RELATIVE_MARKERS.iter().any(|marker| s.contains(marker))
}

/// Splits "a to b" on the standalone word `to`.
fn split_range(phrase: &str) -> Option<(String, String)> {
    let words: Vec<&str> = phrase.split_whitespace().collect();
    let idx = words.iter().position(|w| w.eq_ignore_ascii_case("to"))?;
    Some((words[..idx].join(" "), words[idx + 1..].join(" ")))
}

fn day_of(at: NaiveDateTime) -> NaiveDate {
    at.date()
}

/// Resolves phrases against the wall clock or against a reference moment.
#[derive(Debug, Clone, Copy)]
pub struct DateRangeResolver {
    now: NaiveDateTime,
}

impl Default for DateRangeResolver {
    fn default() -> Self {
        Self::new(Local::now().naive_local())
    }
}

impl DateRangeResolver {
    /// Resolver with a fixed notion of "now".
    pub fn new(now: NaiveDateTime) -> Self {
        Self { now }
    }

    /// Resolves relative to the current moment.
    ///
    /// "a to b" parses both sides independently; a single expression gives the
    /// start and today gives the end.
    pub fn resolve_today(&self, phrase: &str) -> Result<DateInterval, ReviewError> {
        let s = phrase.trim().to_lowercase();
        if s.is_empty() {
            return Err(ReviewError::UnparseableRange(phrase.to_string()));
        }

        if let Some((left, right)) = split_range(&s) {
            return self.resolve_span(phrase, &left, &right);
        }

        let start = self.parse_or_fail(phrase, &s, self.now)?;
        let interval = DateInterval::new(start.date(), day_of(self.now));
        debug!("Resolved '{}' against now ({}) to {}", phrase, self.now, interval);
        Ok(interval)
    }

    /// Resolves relative to `reference`, typically the newest review.
    ///
    /// Ranges written as "a to b" are absolute and go through
    /// [`resolve_today`](Self::resolve_today) unchanged.
    pub fn resolve_relative_to(
        &self,
        phrase: &str,
        reference: NaiveDateTime,
    ) -> Result<DateInterval, ReviewError> {
        let s = phrase.trim().to_lowercase();
        if split_range(&s).is_some() {
            return self.resolve_today(phrase);
        }

        let anchor = day_of(reference).and_time(NaiveTime::MIN);
        let start = self.parse_or_fail(phrase, &s, anchor)?;
        let interval = DateInterval::new(start.date(), anchor.date());
        debug!("Resolved '{}' against {} to {}", phrase, anchor, interval);
        Ok(interval)
    }

    fn resolve_span(&self, phrase: &str, left: &str, right: &str) -> Result<DateInterval, ReviewError> {
        let end = self.parse_or_fail(phrase, right, self.now)?;
        let start = if end.explicit_year {
            // "June 1 to June 15, 2022": the left side takes the right side's year,
            // or the year before when that would put it after the end.
            let year = end.at.year();
            match date_phrase::parse_with_default_year(left, self.now, year) {
                Some(parsed) if !parsed.explicit_year && parsed.date() > end.date() => {
                    date_phrase::parse_with_default_year(left, self.now, year - 1).or(Some(parsed))
                }
                other => other,
            }
        } else {
            date_phrase::parse(left, self.now)
        }
        .ok_or_else(|| ReviewError::UnparseableRange(phrase.to_string()))?;

        let interval = DateInterval::new(start.date(), end.date());
        debug!("Resolved span '{}' to {}", phrase, interval);
        Ok(interval)
    }

    fn parse_or_fail(
        &self,
        phrase: &str,
        expr: &str,
        anchor: NaiveDateTime,
    ) -> Result<ParsedDate, ReviewError> {
        date_phrase::parse(expr, anchor).ok_or_else(|| ReviewError::UnparseableRange(phrase.to_string()))
    }
}
