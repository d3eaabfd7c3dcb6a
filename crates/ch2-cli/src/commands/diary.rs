//! Diary command: records the day's personal statistics.

use std::io::Write;

use anyhow::{Context, Result};

use ch2_core::{JournalValue, Owner, SourceKind};
use ch2_db::{Database, NewStatistic, local_midnight_to_utc};

use crate::{Config, DiaryArgs};

/// Owner of every diary statistic.
pub const DIARY_OWNER: &str = "diary";

struct Field {
    name: &'static str,
    units: Option<&'static str>,
    summary: Option<&'static str>,
    value: JournalValue,
}

fn fields(args: &DiaryArgs) -> Vec<Field> {
    let mut fields = Vec::new();
    let mut push = |name, units, summary, value: Option<JournalValue>| {
        if let Some(value) = value {
            fields.push(Field {
                name,
                units,
                summary,
                value,
            });
        }
    };
    push(
        "Notes",
        None,
        None,
        args.notes.clone().map(|v| JournalValue::Text(Some(v))),
    );
    push(
        "Rest HR",
        Some("bpm"),
        Some("[min],[avg]"),
        args.rest_hr.map(|v| JournalValue::Integer(Some(v))),
    );
    push(
        "Sleep",
        Some("h"),
        Some("[avg]"),
        args.sleep.map(|v| JournalValue::Float(Some(v))),
    );
    push(
        "Mood",
        None,
        Some("[avg]"),
        args.mood.map(|v| JournalValue::Integer(Some(v))),
    );
    push(
        "Weather",
        None,
        None,
        args.weather.clone().map(|v| JournalValue::Text(Some(v))),
    );
    push(
        "Medication",
        None,
        None,
        args.medication.clone().map(|v| JournalValue::Text(Some(v))),
    );
    push(
        "Weight",
        Some("kg"),
        Some("[min],[avg]"),
        args.weight.map(|v| JournalValue::Float(Some(v))),
    );
    fields
}

/// Writes the given fields on the diary source for the day and echoes them.
pub fn run<W: Write>(
    writer: &mut W,
    db: &mut Database,
    config: &Config,
    args: &DiaryArgs,
) -> Result<()> {
    let fields = fields(args);
    if fields.is_empty() {
        writeln!(writer, "Nothing to record for {}.", args.date)?;
        return Ok(());
    }

    let owner = Owner::new(DIARY_OWNER)?;
    let options = config.format_options();
    let tx = db.writer()?;
    let source = tx.ensure_source(SourceKind::Diary, local_midnight_to_utc(args.date))?;
    let mut written = Vec::with_capacity(fields.len());
    for field in fields {
        let journal = tx
            .upsert_statistic(&NewStatistic {
                name: field.name,
                units: field.units,
                summary: field.summary,
                owner: &owner,
                constraint: None,
                source: &source,
                value: field.value,
            })
            .with_context(|| format!("failed to record {}", field.name))?;
        written.push(journal);
    }
    tx.commit()?;

    writeln!(writer, "Diary for {}:", args.date)?;
    for journal in written {
        let value = journal
            .formatted(&options)
            .unwrap_or_else(|| "-".to_string());
        writeln!(writer, "  {}: {value}", journal.statistic_name.name)?;
    }
    Ok(())
}
