use std::io::{self, IsTerminal};

use colored::*;

use crate::reply::ReplyOutcome;
use crate::review::Sentiment;
use crate::trend::TrendReport;

/// Writes command results to stdout.
///
/// Line layout is fixed; colour is only added on an interactive terminal.
pub struct UIHandler {
    pub colorful: bool,
}

impl UIHandler {
    pub fn new(colorful: bool) -> Self {
        let colorful = colorful && io::stdout().is_terminal();
        if !colorful {
            colored::control::set_override(false);
        }
        Self { colorful }
    }

    fn paint_sentiment(&self, sentiment: Sentiment) -> ColoredString {
        let label = sentiment.as_str();
        if !self.colorful {
            return label.normal();
        }
        match sentiment {
            Sentiment::Positive => label.green().bold(),
            Sentiment::Negative => label.red().bold(),
            Sentiment::Neutral => label.bright_black().bold(),
        }
    }

    pub fn print_reply(&self, outcome: &ReplyOutcome) {
        println!("Sentiment: {}", self.paint_sentiment(outcome.sentiment));
        println!("Auto-reply:");
        println!("{}", outcome.reply);
    }

    pub fn print_plot_saved(&self, report: &TrendReport) {
        if let Some(note) = retry_note(report) {
            eprintln!("{} {}", "note:".yellow().bold(), note.dimmed());
        }
        println!("Plot saved to: {}", report.output.display());
    }
}

/// Tells the user when the window was re-anchored on the newest review.
fn retry_note(report: &TrendReport) -> Option<String> {
    report
        .retried
        .then(|| format!("showing {} (re-anchored on the latest review)", report.interval))
}
