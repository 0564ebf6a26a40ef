use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

/// Failures that end the current invocation.
#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Could not read {} as a review table: {reason}", path.display())]
    UnreadableTable { path: PathBuf, reason: String },

    #[error("Couldn't find review text column. Found: {found:?}")]
    MissingReviewColumn { found: Vec<String> },

    #[error("Dataset has no valid dates; cannot plot by day.")]
    NoValidDates,

    #[error("Could not parse date range: {0}")]
    UnparseableRange(String),

    #[error(
        "No reviews found between {start} and {end}.\n\
         Available data range: {available_start} to {available_end}.\n\
         Try: --range \"all time\" or a window inside that span."
    )]
    EmptyRange {
        start: NaiveDate,
        end: NaiveDate,
        available_start: NaiveDate,
        available_end: NaiveDate,
    },
}
