//! The plotting agent: range phrase in, daily sentiment chart out.

use std::path::{Path, PathBuf};

use anyhow::Result;
use log::{info, warn};

use crate::aggregate::DailySentimentTable;
use crate::chart::{ChartKind, ChartRenderer};
use crate::classifier::SentimentClassifier;
use crate::error::ReviewError;
use crate::range::{self, DateInterval, DateRangeResolver};
use crate::review::{Review, ReviewDataset};
use crate::sentiment;

/// Rows selected for one range phrase.
#[derive(Debug)]
pub struct Window<'a> {
    pub interval: DateInterval,
    pub rows: Vec<&'a Review>,
    /// Set when the first attempt came back empty and the phrase was
    /// re-anchored on the newest review.
    pub retried: bool,
}

/// Resolves `phrase` and filters `dataset` down to the matching rows.
///
/// Relative phrases that select nothing against the wall clock are tried once
/// more against the dataset's latest timestamp.
pub fn select_window<'a>(
    dataset: &'a ReviewDataset,
    resolver: &DateRangeResolver,
    phrase: &str,
) -> Result<Window<'a>, ReviewError> {
    let span = dataset.date_span().ok_or(ReviewError::NoValidDates)?;

    if range::is_all_time(phrase) {
        return Ok(Window {
            interval: span,
            rows: dataset.within(&span),
            retried: false,
        });
    }

    let interval = resolver.resolve_today(phrase)?;
    let rows = dataset.within(&interval);
    if !rows.is_empty() {
        return Ok(Window {
            interval,
            rows,
            retried: false,
        });
    }

    let mut tried = interval;
    if range::is_relative_phrase(phrase) {
        if let Some(latest) = dataset.latest_timestamp() {
            let retry = resolver.resolve_relative_to(phrase, latest)?;
            info!(
                "'{}' matched nothing in {}; retrying against latest review ({})",
                phrase, interval, retry
            );
            let rows = dataset.within(&retry);
            if !rows.is_empty() {
                return Ok(Window {
                    interval: retry,
                    rows,
                    retried: true,
                });
            }
            tried = retry;
        }
    }

    Err(ReviewError::EmptyRange {
        start: tried.start,
        end: tried.end,
        available_start: span.start,
        available_end: span.end,
    })
}

/// What a plot run produced.
#[derive(Debug, Clone)]
pub struct TrendReport {
    pub output: PathBuf,
    pub interval: DateInterval,
    pub table: DailySentimentTable,
    pub retried: bool,
}

/// Agent that charts daily sentiment over a date range.
pub struct TrendAgent<R: ChartRenderer> {
    dataset: ReviewDataset,
    classifier: SentimentClassifier,
    resolver: DateRangeResolver,
    renderer: R,
    brand: String,
}

impl<R: ChartRenderer> TrendAgent<R> {
    pub fn new(
        dataset: ReviewDataset,
        classifier: SentimentClassifier,
        resolver: DateRangeResolver,
        renderer: R,
        brand: impl Into<String>,
    ) -> Self {
        Self {
            dataset,
            classifier,
            resolver,
            renderer,
            brand: brand.into(),
        }
    }

    /// Selects, labels, aggregates and renders. The image is written last.
    pub async fn run(&mut self, phrase: &str, out: &Path, kind: ChartKind) -> Result<TrendReport> {
        let window = select_window(&self.dataset, &self.resolver, phrase)?;
        if window.retried {
            warn!(
                "No reviews near today for '{}'; showing {} instead",
                phrase, window.interval
            );
        }

        let labels = sentiment::assign_sentiments(&window.rows, &mut self.classifier).await;
        let table = DailySentimentTable::aggregate(
            window
                .rows
                .iter()
                .zip(labels)
                .filter_map(|(row, label)| row.day().map(|day| (day, label))),
        );
        info!(
            "Aggregated {} reviews over {} days",
            table.total(),
            table.len()
        );

        let title = format!(
            "{} Sentiment by Day ({} to {})",
            self.brand, window.interval.start, window.interval.end
        );
        self.renderer.render(&table, kind, &title, out)?;

        Ok(TrendReport {
            output: out.to_path_buf(),
            interval: window.interval,
            table,
            retried: window.retried,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use chrono::{NaiveDate, NaiveDateTime};

    use crate::chart::PlottersRenderer;
    use crate::classifier::{BinaryPrediction, BinarySentimentModel, Polarity};
    use crate::review::Sentiment;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        day(y, m, d).and_hms_opt(h, 0, 0).unwrap()
    }

    fn far_future() -> DateRangeResolver {
        DateRangeResolver::new(at(2031, 5, 4, 9))
    }

    struct CountingModel(Arc<AtomicUsize>);

    impl BinarySentimentModel for CountingModel {
        fn name(&self) -> &str {
            "counting"
        }

        fn predict(&self, _text: &str) -> BinaryPrediction {
            self.0.fetch_add(1, Ordering::SeqCst);
            BinaryPrediction {
                label: Polarity::Positive,
                confidence: 0.9,
            }
        }
    }

    fn classifier() -> (SentimentClassifier, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let model = CountingModel(calls.clone());
        (SentimentClassifier::new(None, Box::new(model)), calls)
    }

    #[derive(Clone, Default)]
    struct RecordingRenderer {
        titles: Arc<Mutex<Vec<String>>>,
    }

    impl ChartRenderer for RecordingRenderer {
        fn render(
            &self,
            _table: &DailySentimentTable,
            _kind: ChartKind,
            title: &str,
            _out: &Path,
        ) -> Result<()> {
            self.titles.lock().unwrap().push(title.to_string());
            Ok(())
        }
    }

    /// Two rated reviews a day, 2022-06-01 through 2022-06-15, plus noise
    /// outside the window.
    fn june_dataset() -> ReviewDataset {
        let mut records = Vec::new();
        for d in 1..=15 {
            records.push(Review::new("great").with_timestamp(at(2022, 6, d, 12)).with_rating(5.0));
            records.push(Review::new("awful").with_timestamp(at(2022, 6, d, 23)).with_rating(1.0));
        }
        records.push(Review::new("early").with_timestamp(at(2022, 5, 31, 22)).with_rating(3.0));
        records.push(Review::new("late").with_timestamp(at(2022, 6, 16, 1)).with_rating(3.0));
        records.push(Review::new("undated").with_rating(4.0));
        ReviewDataset::new("june.csv", records)
    }

    /// One unrated review a day from 2020-12-28 to 2021-01-10.
    fn stale_dataset() -> ReviewDataset {
        let mut records = Vec::new();
        let mut d = day(2020, 12, 28);
        while d <= day(2021, 1, 10) {
            records.push(Review::new("noodles").with_timestamp(d.and_hms_opt(18, 30, 0).unwrap()));
            d = d.succ_opt().unwrap();
        }
        ReviewDataset::new("stale.csv", records)
    }

    #[tokio::test]
    async fn test_absolute_range_with_ratings() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("plots/june.png");
        let (classifier, calls) = classifier();
        let mut agent = TrendAgent::new(
            june_dataset(),
            classifier,
            far_future(),
            PlottersRenderer::new(800, 400),
            "SteamNoodles",
        );

        let report = agent
            .run("June 1 to June 15, 2022", &out, ChartKind::Line)
            .await
            .unwrap();

        assert_eq!(report.interval, DateInterval::new(day(2022, 6, 1), day(2022, 6, 15)));
        assert!(!report.retried);
        assert_eq!(report.table.len(), 15);
        assert_eq!(report.table.total(), 30);
        for (_, counts) in report.table.rows() {
            assert_eq!(counts.as_array(), [1, 0, 1]);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(out.exists());
    }

    #[tokio::test]
    async fn test_relative_range_retries_on_stale_data() {
        let (classifier, calls) = classifier();
        let renderer = RecordingRenderer::default();
        let mut agent = TrendAgent::new(
            stale_dataset(),
            classifier,
            far_future(),
            renderer.clone(),
            "SteamNoodles",
        );

        let report = agent
            .run("last 7 days", Path::new("unused.png"), ChartKind::Bar)
            .await
            .unwrap();

        assert!(report.retried);
        assert_eq!(report.interval, DateInterval::new(day(2021, 1, 3), day(2021, 1, 10)));
        let days: Vec<NaiveDate> = report.table.days().copied().collect();
        assert_eq!(days.first(), Some(&day(2021, 1, 3)));
        assert_eq!(days.last(), Some(&day(2021, 1, 10)));
        assert_eq!(days.len(), 8);
        assert_eq!(calls.load(Ordering::SeqCst), 8);
        assert_eq!(
            report.table.get(day(2021, 1, 5)).map(|c| c.get(Sentiment::Positive)),
            Some(1)
        );
        assert_eq!(
            renderer.titles.lock().unwrap().as_slice(),
            ["SteamNoodles Sentiment by Day (2021-01-03 to 2021-01-10)".to_string()]
        );
    }

    #[test]
    fn test_all_time_uses_dataset_span() {
        let data = june_dataset();
        let window = select_window(&data, &far_future(), "All Time").unwrap();
        assert_eq!(window.interval, DateInterval::new(day(2022, 5, 31), day(2022, 6, 16)));
        assert_eq!(window.rows.len(), 32);
    }

    #[test]
    fn test_absolute_miss_is_not_retried() {
        let data = stale_dataset();
        let err = select_window(&data, &far_future(), "2030-01-01 to 2030-02-01").unwrap_err();
        match err {
            ReviewError::EmptyRange {
                start,
                end,
                available_start,
                available_end,
            } => {
                assert_eq!((start, end), (day(2030, 1, 1), day(2030, 2, 1)));
                assert_eq!((available_start, available_end), (day(2020, 12, 28), day(2021, 1, 10)));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_no_dates_and_bad_phrases() {
        let undated = ReviewDataset::new("x.csv", vec![Review::new("no time")]);
        assert!(matches!(
            select_window(&undated, &far_future(), "last week"),
            Err(ReviewError::NoValidDates)
        ));

        let data = stale_dataset();
        assert!(matches!(
            select_window(&data, &far_future(), "whenever"),
            Err(ReviewError::UnparseableRange(_))
        ));
    }
}
