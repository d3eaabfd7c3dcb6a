//! Import command: ingests statistic files that changed since they were last read.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fs2::FileExt;

use ch2_db::Database;

use crate::Config;
use crate::decode;

/// Returns the path of the writer lock for a database.
fn lock_path(database_path: &Path) -> PathBuf {
    database_path.with_extension("lock")
}

/// Imports every changed file, one transaction per file.
///
/// A file that fails to decode or store is logged and left unscanned, so the
/// next import retries it.
pub fn run<W: Write>(
    writer: &mut W,
    db: &mut Database,
    config: &Config,
    paths: &[PathBuf],
    force: bool,
) -> Result<()> {
    let lock_file =
        File::create(lock_path(&config.database_path)).context("failed to create lock file")?;
    lock_file
        .lock_exclusive()
        .context("failed to acquire lock")?;

    let mut imported = Vec::new();
    let summary = db
        .for_modified_files(paths, force, |db, path| {
            match decode::import_file(db, path) {
                Ok(count) => {
                    imported.push((path.to_path_buf(), count));
                    true
                }
                Err(err) => {
                    let error = format!("{err:#}");
                    tracing::error!(path = ?path, %error, "import failed");
                    false
                }
            }
        })
        .context("failed to scan files")?;

    for (path, count) in imported {
        writeln!(writer, "{}: {count} statistics", path.display())?;
    }
    writeln!(
        writer,
        "Imported {} file(s), {} failed, {} unchanged",
        summary.processed, summary.failed, summary.skipped
    )?;

    Ok(())
}
