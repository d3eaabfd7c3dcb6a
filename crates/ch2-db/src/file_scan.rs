//! Tracks which files have been ingested, keyed by path and content hash.
//!
//! A file is processed when its modification time is newer than the last
//! successful scan of *any* path holding the same bytes. Renamed or copied
//! files are therefore not ingested twice, while a file whose content changed
//! under the same path always is.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};

use ch2_core::content_hash;

use crate::{Database, DbError, ZERO, format_timestamp, parse_timestamp, truncate_to_millis};

/// A stored file scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileScanRecord {
    pub path: String,
    pub content_hash: String,
    /// [`ZERO`] until the file has been successfully processed.
    pub last_scan: DateTime<Utc>,
}

/// Outcome of [`Database::for_modified_files`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub processed: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// What is on disk right now.
#[derive(Debug)]
struct Probe {
    content_hash: String,
    last_modified: DateTime<Utc>,
}

fn probe(path: &Path) -> Result<Probe, DbError> {
    let io_error = |source: std::io::Error| DbError::Io {
        path: path.to_path_buf(),
        source,
    };
    let content_hash = content_hash(path).map_err(io_error)?;
    let modified = fs::metadata(path)
        .and_then(|metadata| metadata.modified())
        .map_err(io_error)?;
    Ok(Probe {
        content_hash,
        last_modified: truncate_to_millis(DateTime::<Utc>::from(modified)),
    })
}

fn path_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Records the probe against the stored scan state and decides whether the
/// file needs processing. Does not mark anything as scanned.
fn observe(conn: &Connection, path: &Path, probe: &Probe, force: bool) -> Result<bool, DbError> {
    let key = path_key(path);
    let stored: Option<String> = conn
        .query_row(
            "SELECT content_hash FROM file_scan WHERE path = ?",
            [&key],
            |row| row.get(0),
        )
        .optional()?;

    match stored {
        Some(hash) if hash != probe.content_hash => {
            tracing::warn!(path = ?path, "file appears to have changed since last read");
            conn.execute(
                "UPDATE file_scan SET content_hash = ?, last_scan = ? WHERE path = ?",
                params![probe.content_hash, format_timestamp(ZERO), key],
            )?;
        }
        Some(_) => {}
        None => {
            conn.execute(
                "INSERT INTO file_scan (path, content_hash, last_scan) VALUES (?, ?, ?)",
                params![key, probe.content_hash, format_timestamp(ZERO)],
            )?;
        }
    }

    let champion: Option<(String, String)> = conn
        .query_row(
            "
            SELECT path, last_scan FROM file_scan
            WHERE content_hash = ?
            ORDER BY last_scan DESC, id ASC
            LIMIT 1
            ",
            [&probe.content_hash],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;
    let Some((champion_path, champion_scan)) = champion else {
        return Err(DbError::MissingHashChampion {
            hash: probe.content_hash.clone(),
        });
    };

    if champion_path != key {
        tracing::warn!(
            path = ?path,
            duplicate = %champion_path,
            "file content duplicates another scanned file"
        );
    }

    let champion_scan = parse_timestamp(&champion_scan)?;
    let process = force || probe.last_modified > champion_scan;
    tracing::debug!(
        path = ?path,
        last_modified = %probe.last_modified,
        last_scan = %champion_scan,
        force,
        process,
        "file scan decision"
    );
    Ok(process)
}

fn mark_scanned(
    conn: &Connection,
    path: &Path,
    last_modified: DateTime<Utc>,
) -> Result<(), DbError> {
    conn.execute(
        "UPDATE file_scan SET last_scan = ? WHERE path = ?",
        params![format_timestamp(last_modified), path_key(path)],
    )?;
    Ok(())
}

/// Lazy sequence of paths that need processing. See [`Database::modified_files`].
pub struct ModifiedFiles<'a, I> {
    db: &'a mut Database,
    paths: I,
    force: bool,
}

impl<I> Iterator for ModifiedFiles<'_, I>
where
    I: Iterator,
    I::Item: AsRef<Path>,
{
    type Item = Result<PathBuf, DbError>;

    fn next(&mut self) -> Option<Self::Item> {
        for item in self.paths.by_ref() {
            let path = item.as_ref();
            match self.db.scan_and_mark(path, self.force) {
                Ok(true) => return Some(Ok(path.to_path_buf())),
                Ok(false) => {}
                Err(err) => return Some(Err(err)),
            }
        }
        None
    }
}

impl Database {
    fn scan_and_mark(&mut self, path: &Path, force: bool) -> Result<bool, DbError> {
        let probe = probe(path)?;
        let tx = self.conn.transaction()?;
        let process = observe(&tx, path, &probe, force)?;
        if process {
            mark_scanned(&tx, path, probe.last_modified)?;
        }
        tx.commit()?;
        Ok(process)
    }

    /// Yields the paths that should be processed now, marking each as scanned
    /// before it is yielded.
    ///
    /// Each path is committed on its own, so stopping the iteration early
    /// leaves every path seen so far correctly recorded. An error for one path
    /// is yielded in its place and iteration may continue.
    pub fn modified_files<I>(&mut self, paths: I, force: bool) -> ModifiedFiles<'_, I::IntoIter>
    where
        I: IntoIterator,
        I::Item: AsRef<Path>,
    {
        ModifiedFiles {
            db: self,
            paths: paths.into_iter(),
            force,
        }
    }

    /// Runs `callback` for every path that should be processed now.
    ///
    /// The scan state is committed before `callback` runs, and the path is
    /// marked scanned only when `callback` returns `true`. A crash in between
    /// means the file is processed again, never that it is skipped.
    pub fn for_modified_files<I, F>(
        &mut self,
        paths: I,
        force: bool,
        mut callback: F,
    ) -> Result<ScanSummary, DbError>
    where
        I: IntoIterator,
        I::Item: AsRef<Path>,
        F: FnMut(&mut Self, &Path) -> bool,
    {
        let mut summary = ScanSummary::default();
        for item in paths {
            let path = item.as_ref();
            let probe = probe(path)?;

            let tx = self.conn.transaction()?;
            let process = observe(&tx, path, &probe, force)?;
            tx.commit()?;

            if !process {
                summary.skipped += 1;
                continue;
            }
            if callback(self, path) {
                mark_scanned(&self.conn, path, probe.last_modified)?;
                summary.processed += 1;
            } else {
                tracing::warn!(path = ?path, "processing failed, file left unscanned");
                summary.failed += 1;
            }
        }
        Ok(summary)
    }

    /// The scan record for exactly this path.
    pub fn file_scan(&self, path: &Path) -> Result<Option<FileScanRecord>, DbError> {
        let row: Option<(String, String, String)> = self
            .conn
            .query_row(
                "SELECT path, content_hash, last_scan FROM file_scan WHERE path = ?",
                [path_key(path)],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;
        row.map(|(path, content_hash, last_scan)| {
            Ok(FileScanRecord {
                path,
                content_hash,
                last_scan: parse_timestamp(&last_scan)?,
            })
        })
        .transpose()
    }

    /// All scan records, ordered by path.
    pub fn file_scans(&self) -> Result<Vec<FileScanRecord>, DbError> {
        let mut stmt = self
            .conn
            .prepare("SELECT path, content_hash, last_scan FROM file_scan ORDER BY path ASC")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;
        let mut scans = Vec::new();
        for row in rows {
            let (path, content_hash, last_scan) = row?;
            scans.push(FileScanRecord {
                path,
                content_hash,
                last_scan: parse_timestamp(&last_scan)?,
            });
        }
        Ok(scans)
    }
}
