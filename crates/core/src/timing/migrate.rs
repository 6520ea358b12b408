//! Rewrite timing tables in canonical shape, in place.

use std::path::{Path, PathBuf};

use crate::error::{AlignError, Result};
use crate::timing::canonical::{read_any, write_canonical};

/// Outcome of a batch migration.
#[derive(Debug, Default)]
pub struct MigrationReport {
    /// Converted files and their row counts
    pub converted: Vec<(PathBuf, usize)>,
    /// Skipped files and why
    pub failed: Vec<(PathBuf, String)>,
}

impl MigrationReport {
    pub fn any_succeeded(&self) -> bool {
        !self.converted.is_empty()
    }

    /// Zero when at least one file was converted.
    pub fn exit_code(&self) -> i32 {
        if self.any_succeeded() {
            0
        } else {
            1
        }
    }
}

/// Convert one file in place. Returns the number of rows written.
pub fn migrate_file(path: &Path, default_span: f64) -> Result<usize> {
    let segments = read_any(path, default_span)?;
    write_canonical(path, &segments)?;
    Ok(segments.len())
}

/// Convert every `*.csv` in `dir`. A file that fails is reported and
/// skipped; it never stops the batch.
pub fn migrate_dir(dir: &Path, default_span: f64) -> Result<MigrationReport> {
    if !dir.is_dir() {
        return Err(AlignError::MissingInput {
            what: "timings directory",
            path: dir.to_path_buf(),
        });
    }

    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(|e| AlignError::io(format!("listing {}", dir.display()), e))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().map(|e| e == "csv").unwrap_or(false))
        .collect();
    paths.sort();

    let mut report = MigrationReport::default();
    for path in paths {
        match migrate_file(&path, default_span) {
            Ok(rows) => {
                log::info!("Fixed: {} ({} rows)", path.display(), rows);
                report.converted.push((path, rows));
            }
            Err(e) => {
                log::warn!("[skip] {}: {}", path.display(), e);
                report.failed.push((path, e.to_string()));
            }
        }
    }

    log::info!(
        "Migrated {} file(s), skipped {}",
        report.converted.len(),
        report.failed.len()
    );
    Ok(report)
}
