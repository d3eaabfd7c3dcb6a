//! Measure command: ranks one statistic's values within an interval.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::Local;

use ch2_core::{Owner, Schedule, lookup_or_warn};
use ch2_db::{Database, local_midnight_to_utc};

use crate::{Config, MeasureArgs};

pub fn run<W: Write>(
    writer: &mut W,
    db: &mut Database,
    config: &Config,
    args: &MeasureArgs,
) -> Result<()> {
    if args.finish <= args.start {
        anyhow::bail!("interval finish {} must be after start {}", args.finish, args.start);
    }
    let order = match args.order {
        Some(order) => order,
        None => *lookup_or_warn(&config.measures, args.name.as_str(), "measure order")
            .context("no ranking direction configured; pass --order")?,
    };
    let schedule = Schedule::new(args.schedule.as_str())?;
    let interval_owner = Owner::new(args.interval_owner.as_str())?;
    let owner = Owner::new(args.owner.as_str())?;

    let interval = db.add_interval(&schedule, args.start, args.finish, &interval_owner)?;
    let entries = db.journals_in_range(
        &args.name,
        &owner,
        args.constraint,
        local_midnight_to_utc(args.start),
        local_midnight_to_utc(args.finish),
    )?;
    let measures = db
        .compute_measures(&interval.source, &entries, |a, b| order.compare(a, b))
        .context("failed to store measures")?;

    writeln!(
        writer,
        "{} ({order} is better) in {schedule} interval {} to {}:",
        args.name, args.start, args.finish
    )?;
    if measures.is_empty() {
        writeln!(writer, "  no values")?;
        return Ok(());
    }

    let options = config.format_options();
    let mut rows: Vec<_> = measures.iter().zip(&entries).collect();
    rows.sort_by_key(|(measure, _)| measure.rank);
    for (measure, journal) in rows {
        let value = journal
            .formatted(&options)
            .unwrap_or_else(|| "-".to_string());
        let quartile = measure
            .quartile
            .map_or_else(|| " ".to_string(), |q| format!("Q{q}"));
        writeln!(
            writer,
            "  #{} {:>5.1}% {quartile} {} {value}",
            measure.rank,
            measure.percentile,
            journal.time().with_timezone(&Local).format("%Y-%m-%d"),
        )?;
    }
    Ok(())
}
