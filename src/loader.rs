//! Review table loading.
//!
//! Turns a delimited text export (CSV, TSV, semicolon or pipe separated) or
//! the first worksheet of a spreadsheet workbook into a [`ReviewDataset`].
//! Column names vary between exports, so the text, time and rating columns
//! are located by name heuristics.

use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use calamine::{DataType, Reader, open_workbook_auto};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};
use csv::StringRecord;
use log::{debug, info, warn};
use regex::Regex;

use crate::error::ReviewError;
use crate::review::{Review, ReviewDataset};

static RE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+\.?\d*").expect("valid regex"));
static RE_SPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

const SPREADSHEET_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xlsb", "xls", "ods"];

const DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];

/// Columns copied onto each record untouched when the file has them.
const EXTRA_COLUMNS: [&str; 4] = ["Yelp URL", "reviewer_id", "store_name", "rating_count"];

const DATETIME_FORMATS: [&str; 12] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

const DATE_FORMATS: [&str; 7] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d.%m.%Y",
    "%B %d, %Y",
    "%B %d %Y",
    "%d %B %Y",
];

/// Header lookup: exact candidates in priority order, then a substring scan.
#[derive(Debug, Clone, Copy)]
pub struct ColumnMatcher {
    pub candidates: &'static [&'static str],
    pub contains_any: &'static [&'static str],
    pub excludes: &'static [&'static str],
}

pub const TEXT_COLUMN: ColumnMatcher = ColumnMatcher {
    candidates: &["review text", "review", "text", "review_text"],
    contains_any: &["review"],
    excludes: &["time", "date"],
};

pub const TIME_COLUMN: ColumnMatcher = ColumnMatcher {
    candidates: &["date", "review_time", "time", "timestamp"],
    contains_any: &["date", "time"],
    excludes: &[],
};

pub const RATING_COLUMN: ColumnMatcher = ColumnMatcher {
    candidates: &["rating", "stars", "star rating"],
    contains_any: &["rating", "star"],
    excludes: &["count"],
};

impl ColumnMatcher {
    /// Index of the best matching header, if any. Comparison ignores case.
    pub fn find(&self, headers: &[String]) -> Option<usize> {
        let lowered: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();

        for candidate in self.candidates {
            if let Some(idx) = lowered.iter().position(|h| h == candidate) {
                return Some(idx);
            }
        }

        lowered.iter().position(|h| {
            self.contains_any.iter().any(|needle| h.contains(needle))
                && !self.excludes.iter().any(|needle| h.contains(needle))
        })
    }
}

/// Load a review table from `path`.
pub fn load_reviews(path: &Path) -> Result<ReviewDataset, ReviewError> {
    if !path.exists() {
        return Err(ReviewError::FileNotFound(path.to_path_buf()));
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    let (headers, rows) = if SPREADSHEET_EXTENSIONS.contains(&ext.as_str()) {
        read_workbook(path)?
    } else {
        let bytes = fs::read(path).map_err(|e| unreadable(path, e))?;
        read_delimited(path, &decode(&bytes))?
    };
    build_dataset(path, headers, rows)
}

fn unreadable(path: &Path, reason: impl ToString) -> ReviewError {
    ReviewError::UnreadableTable {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

/// UTF-8 when valid, otherwise each byte is taken as a Latin-1 code point.
fn decode(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => {
            debug!("Decoded review file as UTF-8");
            text.to_string()
        }
        Err(_) => {
            info!("Review file is not valid UTF-8; decoding as ISO-8859-1");
            bytes.iter().map(|&b| b as char).collect()
        }
    }
}

/// Most frequent delimiter on the header line; comma wins ties.
fn sniff_delimiter(contents: &str) -> u8 {
    let header = contents.lines().next().unwrap_or_default();
    let mut best = (b',', header.matches(',').count());
    for delim in &DELIMITERS[1..] {
        let count = header.matches(*delim as char).count();
        if count > best.1 {
            best = (*delim, count);
        }
    }
    best.0
}

fn read_delimited(path: &Path, contents: &str) -> Result<(Vec<String>, Vec<StringRecord>), ReviewError> {
    let delimiter = sniff_delimiter(contents);
    debug!("Using delimiter {:?}", delimiter as char);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(contents.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| unreadable(path, e))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for result in reader.records() {
        match result {
            Ok(r) if r.len() <= headers.len() => rows.push(r),
            Ok(_) => skipped += 1,
            Err(e) => {
                debug!("Skipping malformed row: {}", e);
                skipped += 1;
            }
        }
    }

    if skipped > 0 {
        warn!("Skipped {} malformed rows in {}", skipped, path.display());
    }
    Ok((headers, rows))
}

/// First worksheet of an Excel or OpenDocument workbook; its first row is
/// the header row.
fn read_workbook(path: &Path) -> Result<(Vec<String>, Vec<StringRecord>), ReviewError> {
    let mut workbook = open_workbook_auto(path).map_err(|e| unreadable(path, e))?;
    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| unreadable(path, "workbook has no worksheets"))?;
    let range = workbook
        .worksheet_range(&sheet)
        .ok_or_else(|| unreadable(path, format!("worksheet '{}' is missing", sheet)))?
        .map_err(|e| unreadable(path, e))?;
    debug!("Reading worksheet '{}' ({} rows)", sheet, range.height());

    let mut cells = range.rows().map(|row| row.iter().map(cell_text).collect::<Vec<String>>());
    let headers = cells.next().unwrap_or_default();
    let rows = cells
        .filter(|row| row.iter().any(|c| !c.is_empty()))
        .map(StringRecord::from)
        .collect();
    Ok((headers, rows))
}

fn cell_text(cell: &DataType) -> String {
    match cell {
        DataType::String(s) | DataType::DateTimeIso(s) | DataType::DurationIso(s) => {
            s.trim().to_string()
        }
        DataType::Float(v) | DataType::Duration(v) => v.to_string(),
        DataType::Int(v) => v.to_string(),
        DataType::Bool(b) => b.to_string(),
        DataType::DateTime(serial) => excel_serial_to_datetime(*serial)
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default(),
        DataType::Error(_) | DataType::Empty => String::new(),
    }
}

/// Excel stores date cells as days since 1899-12-30.
fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let days = serial.trunc() as i64;
    let seconds = ((serial - serial.trunc()) * 86_400.0).round() as i64;
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    epoch
        .checked_add_signed(Duration::days(days))?
        .checked_add_signed(Duration::seconds(seconds))
}

fn build_dataset(
    path: &Path,
    headers: Vec<String>,
    rows: Vec<StringRecord>,
) -> Result<ReviewDataset, ReviewError> {
    if headers.iter().all(|h| h.is_empty()) {
        return Err(unreadable(path, "no header row"));
    }

    let text_idx = TEXT_COLUMN
        .find(&headers)
        .ok_or_else(|| ReviewError::MissingReviewColumn {
            found: headers.clone(),
        })?;
    let time_idx = TIME_COLUMN.find(&headers);
    let rating_idx = RATING_COLUMN.find(&headers);
    info!(
        "Columns: text={:?} time={:?} rating={:?}",
        headers[text_idx],
        time_idx.map(|i| &headers[i]),
        rating_idx.map(|i| &headers[i])
    );

    let extras: Vec<(usize, &str)> = EXTRA_COLUMNS
        .iter()
        .filter_map(|name| headers.iter().position(|h| h == name).map(|i| (i, *name)))
        .collect();

    let records: Vec<Review> = rows
        .iter()
        .map(|record| build_review(record, text_idx, time_idx, rating_idx, &extras))
        .collect();

    info!("Loaded {} reviews from {}", records.len(), path.display());
    Ok(ReviewDataset::new(path, records))
}

fn build_review(
    record: &StringRecord,
    text_idx: usize,
    time_idx: Option<usize>,
    rating_idx: Option<usize>,
    extras: &[(usize, &str)],
) -> Review {
    let cell = |idx: usize| record.get(idx).unwrap_or_default();

    let mut review = Review::new(clean_text(cell(text_idx)));
    review.timestamp = time_idx.and_then(|i| parse_timestamp(cell(i)));
    review.rating = rating_idx.and_then(|i| parse_rating(cell(i)));
    for (idx, name) in extras {
        let value = cell(*idx);
        if !value.is_empty() {
            review.extras.insert(name.to_string(), value.to_string());
        }
    }
    review
}

/// Collapses whitespace runs to one space and trims.
pub fn clean_text(raw: &str) -> String {
    RE_SPACE.replace_all(raw, " ").trim().to_string()
}

/// First number in the cell, so `"4 stars"` reads as 4.
pub fn parse_rating(raw: &str) -> Option<f64> {
    RE_NUMBER
        .find(raw)
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

/// Best-effort timestamp parse; unknown shapes yield `None`.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, bytes: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(bytes).unwrap();
        path
    }

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_column_candidates_in_priority_order() {
        let h = headers(&["Text", "Review", "Date"]);
        assert_eq!(TEXT_COLUMN.find(&h), Some(1));
        assert_eq!(TIME_COLUMN.find(&h), Some(2));
    }

    #[test]
    fn test_column_substring_fallback() {
        let h = headers(&["Review Date", "Customer Review Body", "Star Count", "Overall Rating"]);
        assert_eq!(TEXT_COLUMN.find(&h), Some(1));
        assert_eq!(TIME_COLUMN.find(&h), Some(0));
        assert_eq!(RATING_COLUMN.find(&h), Some(3));

        assert_eq!(TEXT_COLUMN.find(&headers(&["body", "when"])), None);
    }

    #[test]
    fn test_rating_and_text_cleaning() {
        assert_eq!(parse_rating("4 stars"), Some(4.0));
        assert_eq!(parse_rating("3.5"), Some(3.5));
        assert_eq!(parse_rating("n/a"), None);
        assert_eq!(clean_text("  great\n\tnoodles   here "), "great noodles here");
    }

    #[test]
    fn test_timestamp_shapes() {
        let noon = NaiveDate::from_ymd_opt(2022, 6, 1).unwrap().and_hms_opt(12, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2022-06-01 12:00:00"), Some(noon));
        assert_eq!(parse_timestamp("2022-06-01T12:00"), Some(noon));
        assert_eq!(parse_timestamp("6/1/2022 12:00 PM"), Some(noon));

        let midnight = NaiveDate::from_ymd_opt(2022, 6, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2022-06-01"), Some(midnight));
        assert_eq!(parse_timestamp("06/01/2022"), Some(midnight));
        assert_eq!(parse_timestamp("01.06.2022"), Some(midnight));
        assert_eq!(parse_timestamp("June 1, 2022"), Some(midnight));
        assert_eq!(parse_timestamp("yesterday-ish"), None);
        assert_eq!(parse_timestamp(""), None);
    }

    #[test]
    fn test_sniffs_semicolons() {
        assert_eq!(sniff_delimiter("review;date;rating\n"), b';');
        assert_eq!(sniff_delimiter("review\tdate\n"), b'\t');
        assert_eq!(sniff_delimiter("review\n"), b',');
    }

    #[test]
    fn test_load_csv_with_extras_and_bad_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "reviews.csv",
            b"Review Text,Date,Rating,store_name\n\
              \"Great  broth, friendly staff\",2022-06-01,5 stars,Downtown\n\
              Too salty,2022-06-02,2,\n\
              extra,2022-06-03,3,Downtown,unexpected\n\
              No date at all,,,Uptown\n",
        );

        let data = load_reviews(&path).unwrap();
        assert_eq!(data.len(), 3);
        assert_eq!(data.records[0].text, "Great broth, friendly staff");
        assert_eq!(data.records[0].rating, Some(5.0));
        assert_eq!(data.records[0].extras.get("store_name").map(String::as_str), Some("Downtown"));
        assert!(data.records[1].extras.is_empty());
        assert_eq!(data.records[2].timestamp, None);
        assert_eq!(data.records[2].rating, None);
    }

    #[test]
    fn test_load_latin1_semicolon_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut bytes = b"review;date\nCaf".to_vec();
        bytes.push(0xE9);
        bytes.extend_from_slice(b" noodles were fine;2021-01-10\n");
        let path = write_file(&dir, "latin1.csv", &bytes);

        let data = load_reviews(&path).unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data.records[0].text, "Café noodles were fine");
        assert!(data.records[0].timestamp.is_some());
    }

    #[test]
    fn test_load_strips_bom() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "bom.csv", b"\xEF\xBB\xBFreview,date\nok,2021-01-01\n");
        let data = load_reviews(&path).unwrap();
        assert_eq!(data.len(), 1);
    }

    #[test]
    fn test_load_xlsx_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "reviews.xlsx", include_bytes!("../tests/fixtures/reviews.xlsx"));

        let data = load_reviews(&path).unwrap();
        assert_eq!(data.len(), 3);
        assert_eq!(data.records[0].text, "Rich broth, friendly staff");
        assert_eq!(data.records[0].rating, Some(5.0));
        assert_eq!(
            data.records[0].timestamp,
            NaiveDate::from_ymd_opt(2022, 6, 1).unwrap().and_hms_opt(12, 0, 0)
        );
        assert_eq!(data.records[1].extras.get("store_name").map(String::as_str), Some("Uptown"));
        assert_eq!(data.records[1].rating, Some(2.0));
        assert_eq!(data.records[2].text, "Decent value");
        assert_eq!(data.records[2].rating, None);
        assert!(data.records[2].extras.is_empty());
    }

    #[test]
    fn test_excel_serial_dates() {
        let noon = NaiveDate::from_ymd_opt(2022, 6, 1).unwrap().and_hms_opt(12, 0, 0);
        assert_eq!(excel_serial_to_datetime(44713.5), noon);
        assert_eq!(cell_text(&DataType::DateTime(44713.5)), "2022-06-01 12:00:00");
        assert_eq!(cell_text(&DataType::Float(5.0)), "5");
        assert_eq!(excel_serial_to_datetime(-1.0), None);
        assert_eq!(excel_serial_to_datetime(f64::NAN), None);
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();

        let missing = dir.path().join("missing.csv");
        assert!(matches!(load_reviews(&missing), Err(ReviewError::FileNotFound(_))));

        let sheet = write_file(&dir, "truncated.xlsx", b"PK\x03\x04");
        assert!(matches!(
            load_reviews(&sheet),
            Err(ReviewError::UnreadableTable { .. })
        ));

        let no_text = write_file(&dir, "numbers.csv", b"id,score\n1,2\n");
        match load_reviews(&no_text) {
            Err(ReviewError::MissingReviewColumn { found }) => {
                assert_eq!(found, vec!["id".to_string(), "score".to_string()]);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
