//! Show command: prints every statistic recorded on a day.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::NaiveDate;

use ch2_db::Database;

use crate::Config;

pub fn run<W: Write>(writer: &mut W, db: &Database, config: &Config, date: NaiveDate) -> Result<()> {
    let journals = db
        .journals_at_date(date)
        .with_context(|| format!("failed to load statistics for {date}"))?;

    if journals.is_empty() {
        writeln!(writer, "No statistics for {date}.")?;
        return Ok(());
    }

    let options = config.format_options();
    let mut owner = None;
    for journal in &journals {
        let name = &journal.statistic_name;
        if owner != Some(&name.owner) {
            writeln!(writer, "{}:", name.owner)?;
            owner = Some(&name.owner);
        }
        let value = journal
            .formatted(&options)
            .unwrap_or_else(|| "-".to_string());
        let ranks: String = db
            .measures_for_journal(journal.id)?
            .iter()
            .map(|measure| format!(" [#{} {:.0}%]", measure.rank, measure.percentile))
            .collect();
        writeln!(writer, "  {}: {value}{ranks}", name.name)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use ch2_core::{JournalValue, MeasureOrder, Owner, Schedule, SourceKind};
    use ch2_db::{NewStatistic, local_midnight_to_utc};
    use chrono::Duration;
    use insta::assert_snapshot;

    #[test]
    fn groups_day_by_owner() {
        let mut db = Database::open_in_memory().unwrap();
        let date = NaiveDate::from_ymd_opt(2018, 3, 1).unwrap();
        let morning = local_midnight_to_utc(date) + Duration::hours(9);
        let source = db.add_source(SourceKind::Activity, morning).unwrap();
        let activity = Owner::new("activity").unwrap();
        let diary = Owner::new("diary").unwrap();

        let stats = [
            ("Distance", Some("m"), &activity, JournalValue::Integer(Some(42_195))),
            ("Time", Some("s"), &activity, JournalValue::Integer(Some(10_800))),
            ("Notes", None, &diary, JournalValue::Text(None)),
        ];
        for (name, units, owner, value) in stats {
            db.upsert_statistic(&NewStatistic {
                name,
                units,
                summary: None,
                owner,
                constraint: None,
                source: &source,
                value,
            })
            .unwrap();
        }

        let mut output = Vec::new();
        run(&mut output, &db, &Config::default(), date).unwrap();
        assert_snapshot!(String::from_utf8(output).unwrap(), @r"
        activity:
          Distance: 42km
          Time: 3:00:00
        diary:
          Notes: -
        ");
    }

    #[test]
    fn empty_day() {
        let db = Database::open_in_memory().unwrap();
        let date = NaiveDate::from_ymd_opt(2018, 3, 2).unwrap();

        let mut output = Vec::new();
        run(&mut output, &db, &Config::default(), date).unwrap();
        assert_snapshot!(String::from_utf8(output).unwrap(), @"No statistics for 2018-03-02.");
    }

    #[test]
    fn appends_interval_rankings() {
        let mut db = Database::open_in_memory().unwrap();
        let date = NaiveDate::from_ymd_opt(2018, 3, 1).unwrap();
        let midnight = local_midnight_to_utc(date);
        let monitor = Owner::new("monitor").unwrap();
        let mut journals = Vec::new();
        for (hours, hr) in [(9, 150.0), (18, 171.0)] {
            let source = db
                .add_source(SourceKind::Activity, midnight + Duration::hours(hours))
                .unwrap();
            journals.push(
                db.upsert_statistic(&NewStatistic {
                    name: "Max HR",
                    units: Some("bpm"),
                    summary: None,
                    owner: &monitor,
                    constraint: None,
                    source: &source,
                    value: JournalValue::Float(Some(hr)),
                })
                .unwrap(),
            );
        }
        let interval = db
            .add_interval(
                &Schedule::new("d").unwrap(),
                date,
                date.succ_opt().unwrap(),
                &Owner::new("summary").unwrap(),
            )
            .unwrap();
        db.compute_measures(&interval.source, &journals, |a, b| {
            MeasureOrder::Higher.compare(a, b)
        })
        .unwrap();

        let mut output = Vec::new();
        run(&mut output, &db, &Config::default(), date).unwrap();
        assert_snapshot!(String::from_utf8(output).unwrap(), @r"
        monitor:
          Max HR: 150bpm [#2 50%]
          Max HR: 171bpm [#1 100%]
        ");
    }
}
