//! Statistic names and typed journal entries.

use chrono::{DateTime, Days, NaiveDate, Utc};
use rusqlite::{Connection, Params, params};

use ch2_core::{FormatOptions, JournalValue, Owner, Schedule, StatisticJournalType, format_value};

use crate::{
    Database, DbError, SourceRecord, Writer, at_most_one, format_date, format_timestamp,
    local_midnight_to_utc,
};

/// Canonical identity of a named statistic.
///
/// `(name, owner, constraint)` is unique. `units` and `summary` are
/// presentation metadata and may be corrected by later registrations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatisticName {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub units: Option<String>,
    /// How repeated values combine, e.g. `[max]`; several may be listed.
    pub summary: Option<String>,
    pub owner: Owner,
    pub constraint: Option<i64>,
}

/// One typed value, anchored to one source.
#[derive(Debug, Clone, PartialEq)]
pub struct StatisticJournal {
    pub id: i64,
    pub statistic_name: StatisticName,
    pub source: SourceRecord,
    pub value: JournalValue,
}

impl StatisticJournal {
    /// The discriminator the entry was created with.
    pub const fn kind(&self) -> StatisticJournalType {
        self.value.kind()
    }

    /// Logical timestamp of the entry.
    pub const fn time(&self) -> DateTime<Utc> {
        self.source.time
    }

    /// Renders the value with its units. `None` means no value was recorded.
    pub fn formatted(&self, options: &FormatOptions) -> Option<String> {
        format_value(
            &self.value,
            self.statistic_name.units.as_deref(),
            options,
        )
    }
}

/// A value emitted by a decoder, ready to be stored.
#[derive(Debug, Clone)]
pub struct NewStatistic<'a> {
    pub name: &'a str,
    pub units: Option<&'a str>,
    pub summary: Option<&'a str>,
    pub owner: &'a Owner,
    pub constraint: Option<i64>,
    pub source: &'a SourceRecord,
    pub value: JournalValue,
}

#[derive(Debug)]
struct NameRow {
    id: i64,
    name: String,
    description: Option<String>,
    units: Option<String>,
    summary: Option<String>,
    owner: String,
    constraint: Option<i64>,
}

impl TryFrom<NameRow> for StatisticName {
    type Error = DbError;

    fn try_from(row: NameRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            name: row.name,
            description: row.description,
            units: row.units,
            summary: row.summary,
            owner: Owner::new(row.owner)?,
            constraint: row.constraint,
        })
    }
}

#[derive(Debug)]
struct JournalRow {
    id: i64,
    kind: i64,
    name: NameRow,
    source_id: i64,
    source_kind: String,
    source_time: String,
    integer: Option<i64>,
    float: Option<f64>,
    text: Option<String>,
}

impl TryFrom<JournalRow> for StatisticJournal {
    type Error = DbError;

    fn try_from(row: JournalRow) -> Result<Self, Self::Error> {
        let value = match StatisticJournalType::from_code(row.kind)? {
            StatisticJournalType::Integer => JournalValue::Integer(row.integer),
            StatisticJournalType::Float => JournalValue::Float(row.float),
            StatisticJournalType::Text => JournalValue::Text(row.text),
            StatisticJournalType::Statistic => return Err(ch2_core::ValueError::Untyped.into()),
        };
        Ok(Self {
            id: row.id,
            statistic_name: row.name.try_into()?,
            source: SourceRecord {
                id: row.source_id,
                kind: row.source_kind.parse()?,
                time: crate::parse_timestamp(&row.source_time)?,
            },
            value,
        })
    }
}

const NAME_COLUMNS: &str = r#"id, name, description, units, summary, owner, "constraint""#;

const JOURNAL_SELECT: &str = r#"
    SELECT j.id, j.type,
           n.id, n.name, n.description, n.units, n.summary, n.owner, n."constraint",
           s.id, s.type, s.time,
           ji.value, jf.value, jt.value
    FROM statistic_journal j
    JOIN statistic_name n ON n.id = j.statistic_name_id
    JOIN source s ON s.id = j.source_id
    LEFT JOIN statistic_journal_integer ji ON ji.id = j.id
    LEFT JOIN statistic_journal_float jf ON jf.id = j.id
    LEFT JOIN statistic_journal_text jt ON jt.id = j.id
"#;

fn name_row(row: &rusqlite::Row<'_>, offset: usize) -> rusqlite::Result<NameRow> {
    Ok(NameRow {
        id: row.get(offset)?,
        name: row.get(offset + 1)?,
        description: row.get(offset + 2)?,
        units: row.get(offset + 3)?,
        summary: row.get(offset + 4)?,
        owner: row.get(offset + 5)?,
        constraint: row.get(offset + 6)?,
    })
}

fn query_journals<P: Params>(
    conn: &Connection,
    filter: &str,
    params: P,
) -> Result<Vec<StatisticJournal>, DbError> {
    let mut stmt = conn.prepare(&format!("{JOURNAL_SELECT} {filter}"))?;
    let rows = stmt.query_map(params, |row| {
        Ok(JournalRow {
            id: row.get(0)?,
            kind: row.get(1)?,
            name: name_row(row, 2)?,
            source_id: row.get(9)?,
            source_kind: row.get(10)?,
            source_time: row.get(11)?,
            integer: row.get(12)?,
            float: row.get(13)?,
            text: row.get(14)?,
        })
    })?;
    let mut journals = Vec::new();
    for row in rows {
        journals.push(row?.try_into()?);
    }
    Ok(journals)
}

fn find_name(
    conn: &Connection,
    name: &str,
    owner: &Owner,
    constraint: Option<i64>,
) -> Result<Option<StatisticName>, DbError> {
    let mut stmt = conn.prepare(&format!(
        r#"SELECT {NAME_COLUMNS} FROM statistic_name WHERE name = ? AND owner = ? AND "constraint" IS ?"#
    ))?;
    let rows = stmt.query_map(params![name, owner.as_str(), constraint], |row| {
        name_row(row, 0)
    })?;
    let mut names = Vec::new();
    for row in rows {
        names.push(StatisticName::try_from(row?)?);
    }
    at_most_one(names, "statistic name")
}

pub(crate) fn resolve_or_create_name(
    conn: &Connection,
    name: &str,
    units: Option<&str>,
    summary: Option<&str>,
    owner: &Owner,
    constraint: Option<i64>,
) -> Result<StatisticName, DbError> {
    let Some(mut existing) = find_name(conn, name, owner, constraint)? else {
        conn.execute(
            r#"
            INSERT INTO statistic_name (name, units, summary, owner, "constraint")
            VALUES (?, ?, ?, ?, ?)
            "#,
            params![name, units, summary, owner.as_str(), constraint],
        )?;
        return Ok(StatisticName {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
            description: None,
            units: units.map(str::to_string),
            summary: summary.map(str::to_string),
            owner: owner.clone(),
            constraint,
        });
    };

    if existing.units.as_deref() != units {
        tracing::warn!(
            name,
            old = ?existing.units,
            new = ?units,
            "changing units on statistic name"
        );
        conn.execute(
            "UPDATE statistic_name SET units = ? WHERE id = ?",
            params![units, existing.id],
        )?;
        existing.units = units.map(str::to_string);
    }
    if existing.summary.as_deref() != summary {
        tracing::warn!(
            name,
            old = ?existing.summary,
            new = ?summary,
            "changing summary on statistic name"
        );
        conn.execute(
            "UPDATE statistic_name SET summary = ? WHERE id = ?",
            params![summary, existing.id],
        )?;
        existing.summary = summary.map(str::to_string);
    }
    Ok(existing)
}

/// Writes the value into the table for its type. Exhaustive over the variants.
fn store_value(conn: &Connection, journal_id: i64, value: &JournalValue) -> Result<(), DbError> {
    match value {
        JournalValue::Integer(v) => conn.execute(
            "
            INSERT INTO statistic_journal_integer (id, value) VALUES (?, ?)
            ON CONFLICT(id) DO UPDATE SET value = excluded.value
            ",
            params![journal_id, v],
        )?,
        JournalValue::Float(v) => conn.execute(
            "
            INSERT INTO statistic_journal_float (id, value) VALUES (?, ?)
            ON CONFLICT(id) DO UPDATE SET value = excluded.value
            ",
            params![journal_id, v],
        )?,
        JournalValue::Text(v) => conn.execute(
            "
            INSERT INTO statistic_journal_text (id, value) VALUES (?, ?)
            ON CONFLICT(id) DO UPDATE SET value = excluded.value
            ",
            params![journal_id, v],
        )?,
    };
    Ok(())
}

pub(crate) fn upsert(conn: &Connection, new: &NewStatistic<'_>) -> Result<StatisticJournal, DbError> {
    let statistic_name = resolve_or_create_name(
        conn,
        new.name,
        new.units,
        new.summary,
        new.owner,
        new.constraint,
    )?;

    let mut stmt = conn.prepare(
        "
        SELECT j.id, j.type
        FROM statistic_journal j
        JOIN source s ON s.id = j.source_id
        WHERE j.statistic_name_id = ? AND s.time = ?
        ",
    )?;
    let rows = stmt.query_map(
        params![statistic_name.id, format_timestamp(new.source.time)],
        |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
    )?;
    let mut existing = Vec::new();
    for row in rows {
        existing.push(row?);
    }

    let requested = new.value.kind();
    let journal_id = match at_most_one(existing, "statistic journal")? {
        None => {
            conn.execute(
                "
                INSERT INTO statistic_journal (type, statistic_name_id, source_id)
                VALUES (?, ?, ?)
                ",
                params![requested.code(), statistic_name.id, new.source.id],
            )?;
            let journal_id = conn.last_insert_rowid();
            store_value(conn, journal_id, &new.value)?;
            journal_id
        }
        Some((journal_id, code)) => {
            let stored = StatisticJournalType::from_code(code)?;
            if stored != requested {
                return Err(DbError::InconsistentType {
                    name: statistic_name.name,
                    stored,
                    requested,
                });
            }
            store_value(conn, journal_id, &new.value)?;
            journal_id
        }
    };

    at_most_one(
        query_journals(conn, "WHERE j.id = ?", [journal_id])?,
        "statistic journal",
    )?
    .ok_or(DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
}

impl Database {
    /// Finds the statistic name for `(name, owner, constraint)`, creating it if absent.
    ///
    /// Differing `units` or `summary` are updated in place with a warning.
    pub fn resolve_or_create_name(
        &mut self,
        name: &str,
        units: Option<&str>,
        summary: Option<&str>,
        owner: &Owner,
        constraint: Option<i64>,
    ) -> Result<StatisticName, DbError> {
        let tx = self.conn.transaction()?;
        let statistic_name = resolve_or_create_name(&tx, name, units, summary, owner, constraint)?;
        tx.commit()?;
        Ok(statistic_name)
    }

    /// Creates or updates the journal entry for this name at the source's time.
    ///
    /// Fails with [`DbError::InconsistentType`] if an entry already exists with
    /// a different discriminator; nothing is written in that case.
    pub fn upsert_statistic(
        &mut self,
        new: &NewStatistic<'_>,
    ) -> Result<StatisticJournal, DbError> {
        let tx = self.conn.transaction()?;
        let journal = upsert(&tx, new)?;
        tx.commit()?;
        Ok(journal)
    }

    /// The entry whose source time falls within the given local calendar day.
    pub fn at_date(
        &self,
        date: NaiveDate,
        name: &str,
        owner: &Owner,
        constraint: Option<i64>,
    ) -> Result<Option<StatisticJournal>, DbError> {
        let (start, finish) = day_bounds(date);
        let journals = query_journals(
            &self.conn,
            r#"
            WHERE n.name = ? AND n.owner = ? AND n."constraint" IS ?
              AND s.time >= ? AND s.time < ?
            "#,
            params![
                name,
                owner.as_str(),
                constraint,
                format_timestamp(start),
                format_timestamp(finish)
            ],
        )?;
        at_most_one(journals, "statistic journal")
    }

    /// The entry at exactly the given instant.
    pub fn at_time(
        &self,
        time: DateTime<Utc>,
        name: &str,
        owner: &Owner,
        constraint: Option<i64>,
    ) -> Result<Option<StatisticJournal>, DbError> {
        let journals = query_journals(
            &self.conn,
            r#"WHERE n.name = ? AND n.owner = ? AND n."constraint" IS ? AND s.time = ?"#,
            params![name, owner.as_str(), constraint, format_timestamp(time)],
        )?;
        at_most_one(journals, "statistic journal")
    }

    /// All entries owned by the interval `(schedule, start, interval_owner)`.
    pub fn at_interval(
        &self,
        start: NaiveDate,
        schedule: &Schedule,
        statistic_owner: &Owner,
        statistic_constraint: Option<i64>,
        interval_owner: &Owner,
    ) -> Result<Vec<StatisticJournal>, DbError> {
        query_journals(
            &self.conn,
            r#"
            JOIN interval i ON i.id = j.source_id
            WHERE i.schedule = ? AND i.start = ? AND i.owner = ?
              AND n.owner = ? AND n."constraint" IS ?
            ORDER BY n.name ASC, j.id ASC
            "#,
            params![
                schedule.as_str(),
                format_date(start),
                interval_owner.as_str(),
                statistic_owner.as_str(),
                statistic_constraint
            ],
        )
    }

    /// Entries for one statistic with source time in `[start, finish)`,
    /// in time order, then insertion order.
    pub fn journals_in_range(
        &self,
        name: &str,
        owner: &Owner,
        constraint: Option<i64>,
        start: DateTime<Utc>,
        finish: DateTime<Utc>,
    ) -> Result<Vec<StatisticJournal>, DbError> {
        if finish <= start {
            return Ok(Vec::new());
        }
        query_journals(
            &self.conn,
            r#"
            WHERE n.name = ? AND n.owner = ? AND n."constraint" IS ?
              AND s.time >= ? AND s.time < ?
            ORDER BY s.time ASC, j.id ASC
            "#,
            params![
                name,
                owner.as_str(),
                constraint,
                format_timestamp(start),
                format_timestamp(finish)
            ],
        )
    }

    /// Every entry in the given local calendar day.
    pub fn journals_at_date(&self, date: NaiveDate) -> Result<Vec<StatisticJournal>, DbError> {
        let (start, finish) = day_bounds(date);
        query_journals(
            &self.conn,
            "
            WHERE s.time >= ? AND s.time < ?
            ORDER BY n.owner ASC, n.name ASC, s.time ASC, j.id ASC
            ",
            params![format_timestamp(start), format_timestamp(finish)],
        )
    }

    /// Lists statistic names ordered by owner then name.
    pub fn statistic_names(&self) -> Result<Vec<StatisticName>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {NAME_COLUMNS} FROM statistic_name ORDER BY owner ASC, name ASC, id ASC"
        ))?;
        let rows = stmt.query_map([], |row| name_row(row, 0))?;
        let mut names = Vec::new();
        for row in rows {
            names.push(row?.try_into()?);
        }
        Ok(names)
    }
}

impl Writer<'_> {
    pub fn resolve_or_create_name(
        &self,
        name: &str,
        units: Option<&str>,
        summary: Option<&str>,
        owner: &Owner,
        constraint: Option<i64>,
    ) -> Result<StatisticName, DbError> {
        resolve_or_create_name(&self.tx, name, units, summary, owner, constraint)
    }

    pub fn upsert_statistic(&self, new: &NewStatistic<'_>) -> Result<StatisticJournal, DbError> {
        upsert(&self.tx, new)
    }
}

fn day_bounds(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let next = date.checked_add_days(Days::new(1)).unwrap_or(NaiveDate::MAX);
    (local_midnight_to_utc(date), local_midnight_to_utc(next))
}
