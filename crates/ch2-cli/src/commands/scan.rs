//! Scan command: lists files that changed since they were last scanned.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};

use ch2_db::Database;

/// Prints each path that needs processing. Printed paths are marked scanned.
pub fn run<W: Write>(writer: &mut W, db: &mut Database, paths: &[PathBuf], force: bool) -> Result<()> {
    for path in db.modified_files(paths, force) {
        let path = path.context("failed to scan file")?;
        writeln!(writer, "{}", path.display())?;
    }
    Ok(())
}
