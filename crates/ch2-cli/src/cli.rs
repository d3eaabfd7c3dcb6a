//! Command-line argument definitions.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use ch2_core::MeasureOrder;

/// Statistics ingestion and ranking.
///
/// Imports statistics from files that changed since they were last read,
/// records diary entries, and ranks values within scheduled intervals.
#[derive(Debug, Parser)]
#[command(name = "ch2", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List files that changed since they were last scanned, marking them scanned.
    Scan {
        /// Reprocess files even if they are unchanged.
        #[arg(long)]
        force: bool,

        /// Files to check.
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Import statistics from JSON-lines files that changed since they were last read.
    Import {
        /// Reimport files even if they are unchanged.
        #[arg(long)]
        force: bool,

        /// Files to import.
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Record diary statistics for a day.
    Diary(DiaryArgs),

    /// Show every statistic recorded on a day.
    Show {
        /// Day to show (YYYY-MM-DD).
        #[arg(long)]
        date: NaiveDate,
    },

    /// Rank a statistic's values within an interval.
    Measure(MeasureArgs),

    /// Show database location and row counts.
    Status,
}

/// Diary fields. Only the fields given are written.
#[derive(Debug, Args)]
pub struct DiaryArgs {
    /// Day of the entry (YYYY-MM-DD).
    #[arg(long)]
    pub date: NaiveDate,

    #[arg(long)]
    pub notes: Option<String>,

    /// Resting heart rate in beats per minute.
    #[arg(long)]
    pub rest_hr: Option<i64>,

    /// Hours slept.
    #[arg(long)]
    pub sleep: Option<f64>,

    #[arg(long)]
    pub mood: Option<i64>,

    #[arg(long)]
    pub weather: Option<String>,

    #[arg(long)]
    pub medication: Option<String>,

    /// Body weight in kilograms.
    #[arg(long)]
    pub weight: Option<f64>,
}

/// Interval and statistic to rank.
#[derive(Debug, Args)]
pub struct MeasureArgs {
    /// Schedule of the interval (e.g. `m` for monthly).
    #[arg(long)]
    pub schedule: String,

    /// First day of the interval (YYYY-MM-DD).
    #[arg(long)]
    pub start: NaiveDate,

    /// Day after the interval ends (YYYY-MM-DD).
    #[arg(long)]
    pub finish: NaiveDate,

    /// Owner of the interval.
    #[arg(long)]
    pub interval_owner: String,

    /// Statistic name to rank.
    #[arg(long)]
    pub name: String,

    /// Owner of the statistic.
    #[arg(long)]
    pub owner: String,

    /// Constraint of the statistic.
    #[arg(long)]
    pub constraint: Option<i64>,

    /// Ranking direction; defaults to the `measures` table in the config.
    #[arg(long, value_parser = parse_order)]
    pub order: Option<MeasureOrder>,
}

fn parse_order(s: &str) -> Result<MeasureOrder, String> {
    s.parse().map_err(|err| format!("{err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_measure_arguments() {
        let cli = Cli::parse_from([
            "ch2",
            "measure",
            "--schedule",
            "m",
            "--start",
            "2018-01-01",
            "--finish",
            "2018-02-01",
            "--interval-owner",
            "summary",
            "--name",
            "Distance",
            "--owner",
            "activity",
            "--order",
            "lower",
        ]);
        let Some(Commands::Measure(args)) = cli.command else {
            panic!("expected measure command");
        };
        assert_eq!(args.start, NaiveDate::from_ymd_opt(2018, 1, 1).unwrap());
        assert_eq!(args.order, Some(MeasureOrder::Lower));
        assert_eq!(args.constraint, None);
    }

    #[test]
    fn rejects_bad_order() {
        let result = Cli::try_parse_from([
            "ch2",
            "measure",
            "--schedule",
            "m",
            "--start",
            "2018-01-01",
            "--finish",
            "2018-02-01",
            "--interval-owner",
            "summary",
            "--name",
            "Distance",
            "--owner",
            "activity",
            "--order",
            "sideways",
        ]);
        assert!(result.is_err());
    }
}
