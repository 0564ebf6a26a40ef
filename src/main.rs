use std::path::PathBuf;

use clap::{Parser, Subcommand};
use dotenv::dotenv;
use log::info;

mod aggregate;
mod chart;
mod classifier;
mod config;
mod date_phrase;
mod error;
mod lexicon;
mod llm;
mod loader;
mod logger;
mod providers;
mod range;
mod reply;
mod review;
mod sentiment;
mod trend;
mod ui;

use chart::{ChartKind, PlottersRenderer};
use classifier::SentimentClassifier;
use config::Config;
use range::DateRangeResolver;
use reply::ReplyAgent;
use trend::TrendAgent;

#[derive(Parser)]
#[command(name = "steamnoodles", version, about = "Review sentiment agents for SteamNoodles")]
struct Args {
    /// Plain output: no colours or progress bars
    #[arg(long, global = true)]
    headless: bool,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to a TOML config file
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Classify one review and draft a reply
    Reply {
        /// Review text
        #[arg(long)]
        text: String,
    },
    /// Chart daily sentiment over a date range
    Plot {
        /// Review table (CSV, TSV, semicolon or pipe separated)
        #[arg(long)]
        csv: PathBuf,

        /// Date range, e.g. "last 7 days", "June 1 to June 15, 2022", "all time"
        #[arg(long)]
        range: String,

        /// Chart style
        #[arg(long, value_enum)]
        kind: Option<ChartKind>,

        /// Output image; `.svg` for vector output, anything else for PNG
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let args = Args::parse();
    logger::init(args.verbose);

    let mut config = Config::load(&args.config)?;
    config.merge_with_args(args.headless);
    let ui = ui::UIHandler::new(config.ui.colorful);

    let classifier = SentimentClassifier::from_config(&config);

    match args.command {
        Command::Reply { text } => {
            let mut agent = ReplyAgent::new(classifier, config.brand.clone());
            let outcome = agent.run(&text).await;
            ui.print_reply(&outcome);
        }
        Command::Plot {
            csv,
            range,
            kind,
            out,
        } => {
            let dataset = loader::load_reviews(&csv)?;
            info!("{} reviews loaded", dataset.len());

            let renderer = PlottersRenderer::new(config.plot.width, config.plot.height);
            let kind = kind.unwrap_or(config.plot.default_kind);
            let out = out.unwrap_or_else(|| PathBuf::from(shellexpand::tilde(&config.plot.default_out).as_ref()));

            let mut agent = TrendAgent::new(
                dataset,
                classifier,
                DateRangeResolver::default(),
                renderer,
                config.brand.clone(),
            );
            let report = agent.run(&range, &out, kind).await?;
            ui.print_plot_saved(&report);
        }
    }

    Ok(())
}
