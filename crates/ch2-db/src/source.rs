//! Sources: records that own statistic journals and give them a time.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, params};

use ch2_core::{Owner, Schedule, SourceKind};

use crate::{
    Database, DbError, Writer, format_date, format_timestamp, local_midnight_to_utc, parse_date,
    parse_timestamp,
};

/// A stored source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRecord {
    pub id: i64,
    pub kind: SourceKind,
    pub time: DateTime<Utc>,
}

/// An interval source: a span of dates tied to a schedule and an owner.
///
/// The source time is local midnight at `start`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntervalRecord {
    pub source: SourceRecord,
    pub schedule: Schedule,
    pub start: NaiveDate,
    pub finish: NaiveDate,
    pub owner: Owner,
}

#[derive(Debug)]
struct SourceRow {
    id: i64,
    kind: String,
    time: String,
}

impl TryFrom<SourceRow> for SourceRecord {
    type Error = DbError;

    fn try_from(row: SourceRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            kind: row.kind.parse()?,
            time: parse_timestamp(&row.time)?,
        })
    }
}

pub(crate) fn insert_source(
    conn: &Connection,
    kind: SourceKind,
    time: DateTime<Utc>,
) -> Result<SourceRecord, DbError> {
    conn.execute(
        "INSERT INTO source (type, time) VALUES (?, ?)",
        params![kind.as_str(), format_timestamp(time)],
    )?;
    get_source(conn, conn.last_insert_rowid())?
        .ok_or(DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
}

pub(crate) fn ensure_source(
    conn: &Connection,
    kind: SourceKind,
    time: DateTime<Utc>,
) -> Result<SourceRecord, DbError> {
    let row = conn
        .query_row(
            "SELECT id, type, time FROM source WHERE type = ? AND time = ? ORDER BY id ASC LIMIT 1",
            params![kind.as_str(), format_timestamp(time)],
            |row| {
                Ok(SourceRow {
                    id: row.get(0)?,
                    kind: row.get(1)?,
                    time: row.get(2)?,
                })
            },
        )
        .optional()?;
    match row {
        Some(row) => row.try_into(),
        None => insert_source(conn, kind, time),
    }
}

pub(crate) fn get_source(conn: &Connection, id: i64) -> Result<Option<SourceRecord>, DbError> {
    conn.query_row(
        "SELECT id, type, time FROM source WHERE id = ?",
        [id],
        |row| {
            Ok(SourceRow {
                id: row.get(0)?,
                kind: row.get(1)?,
                time: row.get(2)?,
            })
        },
    )
    .optional()?
    .map(SourceRecord::try_from)
    .transpose()
}

fn find_interval(
    conn: &Connection,
    schedule: &Schedule,
    start: NaiveDate,
    owner: &Owner,
) -> Result<Option<IntervalRecord>, DbError> {
    let row = conn
        .query_row(
            "
            SELECT s.id, s.type, s.time, i.finish
            FROM interval i
            JOIN source s ON s.id = i.id
            WHERE i.schedule = ? AND i.start = ? AND i.owner = ?
            ",
            params![schedule.as_str(), format_date(start), owner.as_str()],
            |row| {
                Ok((
                    SourceRow {
                        id: row.get(0)?,
                        kind: row.get(1)?,
                        time: row.get(2)?,
                    },
                    row.get::<_, String>(3)?,
                ))
            },
        )
        .optional()?;
    let Some((source, finish)) = row else {
        return Ok(None);
    };
    Ok(Some(IntervalRecord {
        source: source.try_into()?,
        schedule: schedule.clone(),
        start,
        finish: parse_date(&finish)?,
        owner: owner.clone(),
    }))
}

impl Database {
    /// Adds a new source at the given time.
    pub fn add_source(
        &mut self,
        kind: SourceKind,
        time: DateTime<Utc>,
    ) -> Result<SourceRecord, DbError> {
        insert_source(&self.conn, kind, time)
    }

    /// Returns the earliest source of this kind at exactly this time, creating it if needed.
    pub fn ensure_source(
        &mut self,
        kind: SourceKind,
        time: DateTime<Utc>,
    ) -> Result<SourceRecord, DbError> {
        ensure_source(&self.conn, kind, time)
    }

    /// Looks up a source by ID.
    pub fn source(&self, id: i64) -> Result<Option<SourceRecord>, DbError> {
        get_source(&self.conn, id)
    }

    /// Deletes a source and everything it owns: its journals, their typed values,
    /// measures ranking those journals, and measures the source itself produced.
    ///
    /// Returns `false` if no such source existed.
    pub fn delete_source(&mut self, id: i64) -> Result<bool, DbError> {
        let deleted = self.conn.execute("DELETE FROM source WHERE id = ?", [id])?;
        Ok(deleted > 0)
    }

    /// Returns the interval identified by `(schedule, start, owner)`, creating it if needed.
    ///
    /// An existing interval with a different finish date is corrected in place.
    pub fn add_interval(
        &mut self,
        schedule: &Schedule,
        start: NaiveDate,
        finish: NaiveDate,
        owner: &Owner,
    ) -> Result<IntervalRecord, DbError> {
        let tx = self.conn.transaction()?;
        let interval = if let Some(mut existing) = find_interval(&tx, schedule, start, owner)? {
            if existing.finish != finish {
                tracing::warn!(
                    %schedule,
                    %start,
                    old = %existing.finish,
                    new = %finish,
                    "changing interval finish"
                );
                tx.execute(
                    "UPDATE interval SET finish = ? WHERE id = ?",
                    params![format_date(finish), existing.source.id],
                )?;
                existing.finish = finish;
            }
            existing
        } else {
            let source = insert_source(&tx, SourceKind::Interval, local_midnight_to_utc(start))?;
            tx.execute(
                "
                INSERT INTO interval (id, schedule, start, finish, owner)
                VALUES (?, ?, ?, ?, ?)
                ",
                params![
                    source.id,
                    schedule.as_str(),
                    format_date(start),
                    format_date(finish),
                    owner.as_str(),
                ],
            )?;
            IntervalRecord {
                source,
                schedule: schedule.clone(),
                start,
                finish,
                owner: owner.clone(),
            }
        };
        tx.commit()?;
        Ok(interval)
    }

    /// Looks up an interval by its identity.
    pub fn find_interval(
        &self,
        schedule: &Schedule,
        start: NaiveDate,
        owner: &Owner,
    ) -> Result<Option<IntervalRecord>, DbError> {
        find_interval(&self.conn, schedule, start, owner)
    }
}

impl Writer<'_> {
    pub fn add_source(
        &self,
        kind: SourceKind,
        time: DateTime<Utc>,
    ) -> Result<SourceRecord, DbError> {
        insert_source(&self.tx, kind, time)
    }

    pub fn ensure_source(
        &self,
        kind: SourceKind,
        time: DateTime<Utc>,
    ) -> Result<SourceRecord, DbError> {
        ensure_source(&self.tx, kind, time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn time(s: &str) -> DateTime<Utc> {
        parse_timestamp(s).unwrap()
    }

    #[test]
    fn ensure_source_reuses_matching_instant() {
        let mut db = Database::open_in_memory().unwrap();
        let a = db
            .ensure_source(SourceKind::Activity, time("2018-03-01T10:00:00Z"))
            .unwrap();
        let b = db
            .ensure_source(SourceKind::Activity, time("2018-03-01T10:00:00Z"))
            .unwrap();
        let c = db
            .ensure_source(SourceKind::Diary, time("2018-03-01T10:00:00Z"))
            .unwrap();
        assert_eq!(a, b);
        assert_ne!(a.id, c.id);
        assert_eq!(db.counts().unwrap().sources, 2);
    }

    #[test]
    fn add_interval_is_get_or_create() {
        let mut db = Database::open_in_memory().unwrap();
        let schedule = Schedule::new("m").unwrap();
        let owner = Owner::new("summary").unwrap();
        let start = NaiveDate::from_ymd_opt(2018, 1, 1).unwrap();
        let finish = NaiveDate::from_ymd_opt(2018, 2, 1).unwrap();

        let first = db.add_interval(&schedule, start, finish, &owner).unwrap();
        assert_eq!(first.source.kind, SourceKind::Interval);
        assert_eq!(first.source.time, local_midnight_to_utc(start));

        let later_finish = NaiveDate::from_ymd_opt(2018, 2, 2).unwrap();
        let second = db
            .add_interval(&schedule, start, later_finish, &owner)
            .unwrap();
        assert_eq!(second.source.id, first.source.id);

        let found = db.find_interval(&schedule, start, &owner).unwrap().unwrap();
        assert_eq!(found.finish, later_finish);
        assert_eq!(db.counts().unwrap().sources, 1);
    }

    #[test]
    fn find_interval_misses_other_owner() {
        let mut db = Database::open_in_memory().unwrap();
        let schedule = Schedule::new("m").unwrap();
        let start = NaiveDate::from_ymd_opt(2018, 1, 1).unwrap();
        let finish = NaiveDate::from_ymd_opt(2018, 2, 1).unwrap();
        db.add_interval(&schedule, start, finish, &Owner::new("summary").unwrap())
            .unwrap();

        let other = Owner::new("other").unwrap();
        assert!(db.find_interval(&schedule, start, &other).unwrap().is_none());
    }

    #[test]
    fn delete_source_reports_missing() {
        let mut db = Database::open_in_memory().unwrap();
        let source = db
            .add_source(SourceKind::Monitor, time("2018-03-01T00:00:00Z"))
            .unwrap();
        assert!(db.delete_source(source.id).unwrap());
        assert!(!db.delete_source(source.id).unwrap());
        assert!(db.source(source.id).unwrap().is_none());
    }
}
