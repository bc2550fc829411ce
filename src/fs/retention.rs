//! Retention: cap the number of backups kept per file kind.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::info;

use crate::utils::errors::{BackupError, Result};

/// Delete the oldest matching backups until at most `max_backups` remain.
///
/// Matching entries are the directory's entries whose name ends with
/// `suffix` (the `(port_<port>).<kind>` discriminator). Ordering is by
/// modification time ascending; equal mtimes keep the listing order, which
/// is unspecified but stable within a run. Returns the number of files
/// deleted.
///
/// The directory is re-listed afterwards: anything other than exactly
/// `max_backups` survivors means a deletion silently went missing or an
/// external writer raced the run, and is reported as an invariant
/// violation rather than papered over.
pub fn enforce(backup_dir: &Path, suffix: &str, max_backups: usize) -> Result<usize> {
    let files = matching_files(backup_dir, suffix)?;
    if files.len() <= max_backups {
        return Ok(0);
    }

    info!(
        count = files.len(),
        limit = max_backups,
        suffix,
        "number of backups exceeds limit, deleting old backups"
    );

    let mut by_mtime: Vec<(PathBuf, SystemTime)> = Vec::with_capacity(files.len());
    for path in files {
        let mtime = fs::metadata(&path)?.modified()?;
        by_mtime.push((path, mtime));
    }
    by_mtime.sort_by_key(|(_, mtime)| *mtime);

    let surplus = by_mtime.len() - max_backups;
    for (path, _) in &by_mtime[..surplus] {
        info!(path = %path.display(), "delete old backup");
        fs::remove_file(path)?;
    }

    let remaining = matching_files(backup_dir, suffix)?.len();
    if remaining != max_backups {
        return Err(BackupError::InvariantViolation(format!(
            "expected {max_backups} backups matching {suffix} after cleanup, found {remaining}"
        )));
    }

    Ok(surplus)
}

fn matching_files(backup_dir: &Path, suffix: &str) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(backup_dir)? {
        let entry = entry?;
        if entry.file_name().to_string_lossy().ends_with(suffix) {
            files.push(entry.path());
        }
    }
    Ok(files)
}
