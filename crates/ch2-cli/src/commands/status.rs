//! Status command for showing what the database holds.

use std::io::Write;

use anyhow::Result;

use ch2_db::{Database, ZERO};

use crate::Config;

pub fn run<W: Write>(writer: &mut W, db: &Database, config: &Config) -> Result<()> {
    let counts = db.counts()?;

    writeln!(writer, "ch2 status")?;
    writeln!(writer, "Database: {}", config.database_path.display())?;
    writeln!(writer, "Files scanned: {}", counts.file_scans)?;
    writeln!(writer, "Sources: {}", counts.sources)?;
    writeln!(writer, "Statistic names: {}", counts.statistic_names)?;
    writeln!(writer, "Statistic journals: {}", counts.statistic_journals)?;
    writeln!(writer, "Statistic measures: {}", counts.statistic_measures)?;

    let pending: Vec<_> = db
        .file_scans()?
        .into_iter()
        .filter(|scan| scan.last_scan == ZERO)
        .collect();
    if !pending.is_empty() {
        writeln!(writer, "Files not yet processed:")?;
        for scan in pending {
            writeln!(writer, "- {}", scan.path)?;
        }
    }

    let names = db.statistic_names()?;
    if names.is_empty() {
        return Ok(());
    }
    writeln!(writer, "Statistics:")?;
    for name in names {
        let units = name
            .units
            .as_deref()
            .map_or_else(String::new, |units| format!(" [{units}]"));
        match name.constraint {
            Some(constraint) => writeln!(
                writer,
                "- {}/{} ({constraint}){units}",
                name.owner, name.name
            )?,
            None => writeln!(writer, "- {}/{}{units}", name.owner, name.name)?,
        }
    }

    Ok(())
}
