// Command line: subcommands for saving seasons, merging and plotting.

use std::path::PathBuf;

use chrono::{Datelike, Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use hoopstats_core::StatCategory;

use crate::config::Config;
use crate::fetch::PageSource;
use crate::pipeline::{self, BatchReport, PipelineError};

#[derive(Debug, Parser)]
#[command(name = "hoopstats", version, about = "Download and analyse NBA season player stats")]
pub struct Cli {
    /// Export root; overrides `[output] directory` from the config file.
    #[arg(long, global = true)]
    pub output_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Save one category for every season in a range.
    Save(SaveArgs),
    /// Save all five categories for every season in a range.
    SaveAll(RangeArgs),
    /// Join two categories of one season on (Player, Age) and save the result.
    Merge(PairArgs),
    /// Plot the correlations between the columns of two joined categories.
    Heatmap(HeatmapArgs),
}

#[derive(Debug, Args)]
pub struct SaveArgs {
    /// totals, per_game, per_minute, per_poss or advanced.
    pub category: StatCategory,
    #[command(flatten)]
    pub range: RangeArgs,
}

#[derive(Debug, Args)]
pub struct RangeArgs {
    pub low: i32,
    /// Defaults to the current season.
    pub high: Option<i32>,
}

#[derive(Debug, Args)]
pub struct PairArgs {
    pub year: i32,
    #[arg(long)]
    pub first: Option<StatCategory>,
    #[arg(long)]
    pub second: Option<StatCategory>,
}

#[derive(Debug, Args)]
pub struct HeatmapArgs {
    #[command(flatten)]
    pub pair: PairArgs,
    #[arg(long)]
    pub title: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("every requested season of {category} failed")]
    BatchFailed { category: StatCategory },

    #[error("no season of any category could be saved")]
    NothingSaved,

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

/// Season that ends in the calendar year after `today` once October starts.
pub fn current_season(today: NaiveDate) -> i32 {
    if today.month() >= 10 {
        today.year() + 1
    } else {
        today.year()
    }
}

impl RangeArgs {
    fn bounds(&self) -> (i32, i32) {
        let high = self
            .high
            .unwrap_or_else(|| current_season(Local::now().date_naive()));
        (self.low, high)
    }
}

impl PairArgs {
    fn categories(&self, config: &Config) -> (StatCategory, StatCategory) {
        (
            self.first.unwrap_or(config.heatmap.first),
            self.second.unwrap_or(config.heatmap.second),
        )
    }
}

fn print_report(report: &BatchReport) {
    for outcome in &report.outcomes {
        match &outcome.result {
            Ok(path) => println!("{} {}: saved {}", report.category, outcome.year, path.display()),
            Err(e) => println!("{} {}: FAILED ({e})", report.category, outcome.year),
        }
    }
}

fn check(report: &BatchReport) -> Result<(), CliError> {
    if report.all_failed() {
        Err(CliError::BatchFailed {
            category: report.category,
        })
    } else {
        Ok(())
    }
}

/// Execute `command` against `source`, printing one line per result.
pub async fn run(command: &Command, config: &Config, source: &dyn PageSource) -> Result<(), CliError> {
    match command {
        Command::Save(args) => {
            let (low, high) = args.range.bounds();
            let report = pipeline::save_range(source, config, args.category, low, high).await;
            print_report(&report);
            check(&report)
        }
        Command::SaveAll(range) => {
            let (low, high) = range.bounds();
            let reports = pipeline::save_all_categories(source, config, low, high).await;
            reports.iter().for_each(print_report);
            if reports.iter().all(BatchReport::all_failed) {
                return Err(CliError::NothingSaved);
            }
            Ok(())
        }
        Command::Merge(pair) => {
            let (a, b) = pair.categories(config);
            let path = pipeline::save_merged(source, config, pair.year, a, b).await?;
            println!("saved {}", path.display());
            Ok(())
        }
        Command::Heatmap(args) => {
            let (a, b) = args.pair.categories(config);
            let path =
                pipeline::save_heatmap(source, config, args.pair.year, a, b, args.title.as_deref())
                    .await?;
            println!("saved {}", path.display());
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
