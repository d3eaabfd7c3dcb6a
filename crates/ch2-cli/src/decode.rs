//! JSON-lines decoder for statistic files.
//!
//! Each non-blank line is one statistic:
//!
//! ```json
//! {"name": "HR", "units": "bpm", "owner": "monitor", "time": "2018-03-01T10:00:00Z", "kind": "float", "value": 150.4}
//! ```
//!
//! `units`, `summary`, `constraint` and `value` are optional. Every line with
//! the same `time` is attached to the same activity source.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use ch2_core::{JournalValue, Owner, SourceKind, StatisticJournalType};
use ch2_db::{Database, NewStatistic};

/// One decoded line.
#[derive(Debug, Clone, Deserialize)]
pub struct StatisticLine {
    pub name: String,
    pub units: Option<String>,
    pub summary: Option<String>,
    pub owner: String,
    pub constraint: Option<i64>,
    pub time: DateTime<Utc>,
    pub kind: StatisticJournalType,
    #[serde(default)]
    pub value: serde_json::Value,
}

/// Decodes every line of a file without touching the database.
pub fn decode_file(path: &Path) -> Result<Vec<StatisticLine>> {
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let mut lines = Vec::new();
    for (number, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let decoded: StatisticLine = serde_json::from_str(line)
            .with_context(|| format!("{}:{}: invalid statistic", path.display(), number + 1))?;
        lines.push(decoded);
    }
    Ok(lines)
}

/// Decodes a file and upserts every statistic in one transaction.
///
/// Returns the number of statistics written. Nothing is written if any line
/// fails to decode or store.
pub fn import_file(db: &mut Database, path: &Path) -> Result<usize> {
    let lines = decode_file(path)?;

    let writer = db.writer()?;
    for line in &lines {
        let owner = Owner::new(line.owner.as_str())?;
        let value = JournalValue::from_json(line.kind, &line.value)
            .with_context(|| format!("invalid value for {}", line.name))?;
        let source = writer.ensure_source(SourceKind::Activity, line.time)?;
        writer.upsert_statistic(&NewStatistic {
            name: &line.name,
            units: line.units.as_deref(),
            summary: line.summary.as_deref(),
            owner: &owner,
            constraint: line.constraint,
            source: &source,
            value,
        })?;
    }
    writer.commit()?;

    tracing::debug!(path = ?path, count = lines.len(), "imported statistics");
    Ok(lines.len())
}
