//! Storage layer for ch2 statistics.
//!
//! Provides persistence for file scans, sources, statistic names, typed
//! statistic journals and interval measures using `rusqlite`.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! One `Database` drives one scan-and-ingest pass. Callers that hash or decode files
//! in parallel must still funnel writes through a single `Database`: concurrent
//! upserts for the same `(statistic_name, source)` pair are not safe.
//!
//! # Transactions
//!
//! Single-operation methods on [`Database`] commit on return. To group several
//! writes into one unit of work (e.g. every value decoded from one file), open a
//! [`Writer`] with [`Database::writer`] and call [`Writer::commit`]. Dropping a
//! `Writer` without committing rolls the work back.
//!
//! # Schema
//!
//! ## Timestamp Format
//!
//! Timestamps are stored as TEXT in RFC 3339 format with millisecond precision
//! (e.g., `2024-01-15T10:30:00.000Z`), so lexicographic order matches chronological
//! order. Dates (interval bounds) are stored as `YYYY-MM-DD`.
//!
//! ## Typed Values
//!
//! `statistic_journal` holds the envelope and an integer discriminator in `type`.
//! The value itself lives in one of `statistic_journal_integer`,
//! `statistic_journal_float` or `statistic_journal_text`, keyed by the journal id.

mod file_scan;
mod measure;
mod source;
mod statistic;
#[cfg(test)]
mod test_logs;

use chrono::{DateTime, LocalResult, NaiveDate, NaiveTime, SecondsFormat, TimeZone, Utc};
use rusqlite::{Connection, Transaction};
use std::path::{Path, PathBuf};
use thiserror::Error;

use ch2_core::{StatisticJournalType, ValueError};

pub use file_scan::{FileScanRecord, ModifiedFiles, ScanSummary};
pub use measure::StatisticMeasure;
pub use source::{IntervalRecord, SourceRecord};
pub use statistic::{NewStatistic, StatisticJournal, StatisticName};

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Failed to read or stat a scanned file.
    #[error("io error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// A journal entry already exists with a different discriminator.
    #[error("inconsistent statistic journal type for {name} ({stored} != {requested})")]
    InconsistentType {
        name: String,
        stored: StatisticJournalType,
        requested: StatisticJournalType,
    },
    /// A single-row lookup matched more than one row.
    #[error("ambiguous lookup: more than one {what}")]
    Ambiguous { what: &'static str },
    /// No file scan row holds a hash that was just written.
    #[error("no file scan found for content hash {hash}")]
    MissingHashChampion { hash: String },
    /// Measures can only be owned by interval sources.
    #[error("source {source_id} is not an interval")]
    NotAnInterval { source_id: i64 },
    /// Failed to parse a stored timestamp or date.
    #[error("invalid timestamp: {value}")]
    TimestampParse {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
    /// A stored value failed validation.
    #[error(transparent)]
    Value(#[from] ValueError),
}

/// Row counts per table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableCounts {
    pub file_scans: i64,
    pub sources: i64,
    pub statistic_names: i64,
    pub statistic_journals: i64,
    pub statistic_measures: i64,
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.conn.execute_batch(
            r#"
            -- Anything that owns statistics: activity imports, diary days, intervals
            CREATE TABLE IF NOT EXISTS source (
                id INTEGER PRIMARY KEY,
                type TEXT NOT NULL,
                time TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_source_time ON source(time);

            CREATE TABLE IF NOT EXISTS interval (
                id INTEGER PRIMARY KEY,
                schedule TEXT NOT NULL,
                start TEXT NOT NULL,
                finish TEXT NOT NULL,
                owner TEXT NOT NULL,
                UNIQUE (schedule, start, owner),
                FOREIGN KEY (id) REFERENCES source(id) ON DELETE CASCADE
            );

            -- last_scan: time of last successful processing, or the epoch for never
            CREATE TABLE IF NOT EXISTS file_scan (
                id INTEGER PRIMARY KEY,
                path TEXT NOT NULL UNIQUE,
                content_hash TEXT NOT NULL,
                last_scan TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_file_scan_hash ON file_scan(content_hash);

            CREATE TABLE IF NOT EXISTS statistic_name (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT,
                units TEXT,
                summary TEXT,
                owner TEXT NOT NULL,
                "constraint" INTEGER,
                UNIQUE (name, owner, "constraint")
            );

            -- UNIQUE above lets NULL constraints repeat; this index does not
            CREATE UNIQUE INDEX IF NOT EXISTS idx_statistic_name_identity
                ON statistic_name(name, owner, IFNULL("constraint", ''));

            CREATE TABLE IF NOT EXISTS statistic_journal (
                id INTEGER PRIMARY KEY,
                type INTEGER NOT NULL,
                statistic_name_id INTEGER NOT NULL,
                source_id INTEGER NOT NULL,
                UNIQUE (statistic_name_id, source_id),
                FOREIGN KEY (statistic_name_id) REFERENCES statistic_name(id) ON DELETE CASCADE,
                FOREIGN KEY (source_id) REFERENCES source(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_statistic_journal_source ON statistic_journal(source_id);

            CREATE TABLE IF NOT EXISTS statistic_journal_integer (
                id INTEGER PRIMARY KEY,
                value INTEGER,
                FOREIGN KEY (id) REFERENCES statistic_journal(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS statistic_journal_float (
                id INTEGER PRIMARY KEY,
                value REAL,
                FOREIGN KEY (id) REFERENCES statistic_journal(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS statistic_journal_text (
                id INTEGER PRIMARY KEY,
                value TEXT,
                FOREIGN KEY (id) REFERENCES statistic_journal(id) ON DELETE CASCADE
            );

            -- source_id must be an interval
            CREATE TABLE IF NOT EXISTS statistic_measure (
                id INTEGER PRIMARY KEY,
                statistic_journal_id INTEGER NOT NULL,
                source_id INTEGER NOT NULL,
                rank INTEGER NOT NULL,
                percentile REAL NOT NULL,
                quartile INTEGER,
                FOREIGN KEY (statistic_journal_id) REFERENCES statistic_journal(id) ON DELETE CASCADE,
                FOREIGN KEY (source_id) REFERENCES source(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_statistic_measure_source ON statistic_measure(source_id);
            CREATE INDEX IF NOT EXISTS idx_statistic_measure_journal ON statistic_measure(statistic_journal_id);
            "#,
        )?;
        Ok(())
    }

    /// Starts a unit of work. See [`Writer`].
    pub fn writer(&mut self) -> Result<Writer<'_>, DbError> {
        Ok(Writer {
            tx: self.conn.transaction()?,
        })
    }

    /// Counts rows in the main tables.
    pub fn counts(&self) -> Result<TableCounts, DbError> {
        let count = |table: &str| -> Result<i64, DbError> {
            Ok(self
                .conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                    row.get(0)
                })?)
        };
        Ok(TableCounts {
            file_scans: count("file_scan")?,
            sources: count("source")?,
            statistic_names: count("statistic_name")?,
            statistic_journals: count("statistic_journal")?,
            statistic_measures: count("statistic_measure")?,
        })
    }
}

/// An open transaction for grouped writes.
///
/// Nothing is visible to other connections until [`Writer::commit`]; dropping
/// the writer rolls back.
pub struct Writer<'a> {
    tx: Transaction<'a>,
}

impl Writer<'_> {
    /// Commits all writes made through this writer.
    pub fn commit(self) -> Result<(), DbError> {
        self.tx.commit()?;
        Ok(())
    }
}

/// The "never scanned" sentinel.
pub const ZERO: DateTime<Utc> = DateTime::<Utc>::UNIX_EPOCH;

pub(crate) fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn parse_timestamp(timestamp: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|source| DbError::TimestampParse {
            value: timestamp.to_string(),
            source,
        })
}

pub(crate) fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub(crate) fn parse_date(date: &str) -> Result<NaiveDate, DbError> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|source| DbError::TimestampParse {
        value: date.to_string(),
        source,
    })
}

/// Drops sub-millisecond precision so a value survives a storage round trip.
pub fn truncate_to_millis(timestamp: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(timestamp.timestamp_millis()).unwrap_or(timestamp)
}

/// Converts a local date at midnight to UTC.
/// Handles DST ambiguity by picking the earlier time.
pub fn local_midnight_to_utc(local_date: NaiveDate) -> DateTime<Utc> {
    let midnight = local_date.and_time(NaiveTime::MIN);
    match chrono::Local.from_local_datetime(&midnight) {
        // Single or ambiguous (DST fall-back): use the earlier time
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.with_timezone(&Utc),
        LocalResult::None => {
            // DST spring-forward gap at midnight; 1am local exists
            let one_am = midnight + chrono::Duration::hours(1);
            chrono::Local
                .from_local_datetime(&one_am)
                .earliest()
                .map_or_else(|| midnight.and_utc(), |dt| dt.with_timezone(&Utc))
        }
    }
}

/// Keeps at most one row, failing if the filter matched several.
pub(crate) fn at_most_one<T>(mut rows: Vec<T>, what: &'static str) -> Result<Option<T>, DbError> {
    if rows.len() > 1 {
        return Err(DbError::Ambiguous { what });
    }
    Ok(rows.pop())
}
