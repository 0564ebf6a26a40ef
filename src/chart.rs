use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use chrono::NaiveDate;
use clap::ValueEnum;
use log::info;
use plotters::coord::Shift;
use plotters::prelude::*;
use serde::{Deserialize, Serialize};

use crate::aggregate::DailySentimentTable;
use crate::review::Sentiment;

const NEUTRAL_GREY: RGBColor = RGBColor(140, 140, 140);
const POSITIVE_GREEN: RGBColor = RGBColor(46, 160, 67);
const NEGATIVE_RED: RGBColor = RGBColor(214, 39, 40);
const GRID_GREY: RGBColor = RGBColor(225, 225, 225);

const MAX_GRID_LINES: usize = 10;

/// Chart style for the daily table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    #[default]
    Line,
    Bar,
}

/// Draws a daily sentiment table to an image file.
pub trait ChartRenderer {
    fn render(
        &self,
        table: &DailySentimentTable,
        kind: ChartKind,
        title: &str,
        out: &Path,
    ) -> Result<()>;
}

/// Renderer backed by plotters: SVG for `.svg` paths, bitmap otherwise.
///
/// No font rasterizer is linked, so bitmap charts are drawn without text:
/// axes, count gridlines, day ticks and a marker shape per sentiment
/// (triangle negative, cross neutral, circle positive). SVG output also gets
/// the title, axis labels and legend.
pub struct PlottersRenderer {
    width: u32,
    height: u32,
}

impl PlottersRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl ChartRenderer for PlottersRenderer {
    fn render(
        &self,
        table: &DailySentimentTable,
        kind: ChartKind,
        title: &str,
        out: &Path,
    ) -> Result<()> {
        if table.is_empty() {
            bail!("Nothing to plot: the daily table is empty");
        }

        if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create output directory {}", parent.display()))?;
        }

        let size = (self.width, self.height);
        let is_svg = out
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("svg"));
        if is_svg {
            draw(SVGBackend::new(out, size).into_drawing_area(), table, kind, Some(title))?;
        } else {
            draw(BitMapBackend::new(out, size).into_drawing_area(), table, kind, None)?;
        }

        info!("Chart written to {}", out.display());
        Ok(())
    }
}

fn series_color(sentiment: Sentiment) -> RGBColor {
    match sentiment {
        Sentiment::Negative => NEGATIVE_RED,
        Sentiment::Neutral => NEUTRAL_GREY,
        Sentiment::Positive => POSITIVE_GREEN,
    }
}

/// Smallest 1-2-5 step that keeps the horizontal gridlines at or under
/// [`MAX_GRID_LINES`].
fn grid_step(max_count: usize) -> usize {
    let mut magnitude = 1;
    loop {
        for step in [magnitude, magnitude * 2, magnitude * 5] {
            if max_count / step <= MAX_GRID_LINES {
                return step;
            }
        }
        magnitude *= 10;
    }
}

fn draw<DB>(
    root: DrawingArea<DB, Shift>,
    table: &DailySentimentTable,
    kind: ChartKind,
    title: Option<&str>,
) -> Result<()>
where
    DB: DrawingBackend,
{
    let plot_err = |e: DrawingAreaErrorKind<DB::ErrorType>| anyhow!("Chart drawing failed: {}", e);

    let days: Vec<NaiveDate> = table.days().copied().collect();
    let n = days.len();
    let y_max = (table.max_count() + 1) as f64;

    root.fill(&WHITE).map_err(plot_err)?;
    let mut builder = ChartBuilder::on(&root);
    builder.margin(12);
    if let Some(title) = title {
        builder
            .caption(title, ("sans-serif", 22))
            .x_label_area_size(40)
            .y_label_area_size(48);
    }
    let mut chart = builder
        .build_cartesian_2d(-0.5f64..(n as f64 - 0.5), 0f64..y_max)
        .map_err(plot_err)?;

    let day_label = |x: &f64| -> String {
        let idx = x.round();
        if (x - idx).abs() > 1e-6 || idx < 0.0 {
            return String::new();
        }
        days.get(idx as usize)
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default()
    };

    if title.is_some() {
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(n.min(12))
            .x_label_formatter(&day_label)
            .x_desc("Day")
            .y_desc("Review Count")
            .draw()
            .map_err(plot_err)?;
    } else {
        let x_end = n as f64 - 0.5;
        let step = grid_step(table.max_count());
        chart
            .draw_series((step..=table.max_count()).step_by(step).map(|y| {
                PathElement::new(vec![(-0.5, y as f64), (x_end, y as f64)], GRID_GREY)
            }))
            .map_err(plot_err)?;

        let tick = y_max / 50.0;
        chart
            .draw_series((0..n).map(|i| {
                PathElement::new(vec![(i as f64, 0.0), (i as f64, tick)], BLACK)
            }))
            .map_err(plot_err)?;
        chart
            .draw_series(std::iter::once(PathElement::new(
                vec![(-0.5, y_max), (-0.5, 0.0), (x_end, 0.0)],
                BLACK.stroke_width(2),
            )))
            .map_err(plot_err)?;
    }

    let bar_width = 0.8 / Sentiment::ALL.len() as f64;
    for (slot, sentiment) in Sentiment::ALL.into_iter().enumerate() {
        let color = series_color(sentiment);
        let counts: Vec<f64> = table
            .rows()
            .map(|(_, c)| c.get(sentiment) as f64)
            .collect();

        match kind {
            ChartKind::Line => {
                chart
                    .draw_series(LineSeries::new(
                        counts.iter().enumerate().map(|(i, c)| (i as f64, *c)),
                        color.stroke_width(2),
                    ))
                    .map_err(plot_err)?
                    .label(sentiment.as_str())
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));

                let points = counts.iter().enumerate().map(|(i, c)| (i as f64, *c));
                match sentiment {
                    Sentiment::Negative => {
                        chart
                            .draw_series(points.map(|p| TriangleMarker::new(p, 5, color.filled())))
                            .map_err(plot_err)?;
                    }
                    Sentiment::Neutral => {
                        chart
                            .draw_series(points.map(|p| Cross::new(p, 4, color.stroke_width(2))))
                            .map_err(plot_err)?;
                    }
                    Sentiment::Positive => {
                        chart
                            .draw_series(points.map(|p| Circle::new(p, 4, color.filled())))
                            .map_err(plot_err)?;
                    }
                }
            }
            ChartKind::Bar => {
                let offset = -0.4 + slot as f64 * bar_width;
                chart
                    .draw_series(counts.iter().enumerate().map(|(i, c)| {
                        let x0 = i as f64 + offset;
                        Rectangle::new([(x0, 0.0), (x0 + bar_width, *c)], color.filled())
                    }))
                    .map_err(plot_err)?
                    .label(sentiment.as_str())
                    .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
            }
        }
    }

    if title.is_some() {
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .map_err(plot_err)?;
    }

    root.present().map_err(plot_err)?;
    Ok(())
}
