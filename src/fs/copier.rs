//! Checksum-verified copy of a data file into the backup directory.

use std::fmt::Write as _;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use chrono::format::StrftimeItems;
use chrono::{DateTime, Local};
use tracing::info;

use crate::fs::checksum;
use crate::utils::errors::{BackupError, Result};

/// Data file kinds backed up independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// Point-in-time snapshot (dump file)
    Rdb,
    /// Append-only log
    Aof,
}

impl FileKind {
    /// On-disk extension of backups of this kind.
    pub fn suffix(self) -> &'static str {
        match self {
            FileKind::Rdb => "rdb",
            FileKind::Aof => "aof",
        }
    }
}

/// One file to back up, resolved once per run from the server's
/// configuration; immutable for the run's duration.
#[derive(Debug, Clone)]
pub struct BackupTarget {
    /// Absolute path of the live data file
    pub source: PathBuf,

    pub kind: FileKind,

    /// Directory that receives the copies
    pub backup_dir: PathBuf,

    /// Server port, embedded in backup names to keep instances apart
    pub port: u16,
}

/// A retained backup on disk.
///
/// The backup directory itself is the durable store of these; membership is
/// re-derived by listing and suffix-matching, nothing is indexed separately.
#[derive(Debug, Clone)]
pub struct BackupRecord {
    pub path: PathBuf,

    /// Taken from the source file's modification time, not the wall clock
    pub created_at: DateTime<Local>,

    pub size_bytes: u64,

    pub port: u16,
}

/// Filename suffix shared by every backup of one `(port, kind)` pair.
/// Retention matches on this.
pub fn backup_suffix(port: u16, kind: FileKind) -> String {
    format!("(port_{port}).{}", kind.suffix())
}

/// Copy the target's source file into the backup directory and verify the
/// copy by digest comparison.
///
/// The destination name is the source file's modification time formatted
/// through `template`, with the port/kind suffix appended. Using the mtime
/// rather than the invocation time makes the name reproducible for an
/// unchanged source, so a re-run of the same snapshot hits the collision
/// check instead of duplicating it.
pub fn copy(target: &BackupTarget, template: &str) -> Result<BackupRecord> {
    let metadata = fs::metadata(&target.source)?;
    let mtime = metadata.modified()?;
    let created_at: DateTime<Local> = mtime.into();

    let mut backup_name = String::new();
    write!(
        backup_name,
        "{}",
        created_at.format_with_items(StrftimeItems::new(template))
    )
    .map_err(|_| BackupError::Config(format!("invalid filename template: {template}")))?;
    backup_name.push_str(&backup_suffix(target.port, target.kind));

    let backup_path = target.backup_dir.join(&backup_name);

    if !target.backup_dir.exists() {
        fs::create_dir_all(&target.backup_dir)?;
    } else if !target.backup_dir.is_dir() {
        return Err(BackupError::Config(format!(
            "backup dir {} is not a directory",
            target.backup_dir.display()
        )));
    } else if backup_path.exists() {
        return Err(BackupError::Collision(backup_path));
    }

    fs::copy(&target.source, &backup_path)?;

    // Restore the source mtime on the copy. Best effort on a live file;
    // the checksum below is what actually vouches for the bytes.
    let dest = File::options().write(true).open(&backup_path)?;
    dest.set_modified(mtime)?;
    drop(dest);

    verify_or_remove(&target.source, &backup_path)?;

    let size_bytes = fs::metadata(&backup_path)?.len();
    info!(path = %backup_path.display(), size_bytes, "backup created, checksum ok");

    Ok(BackupRecord {
        path: backup_path,
        created_at,
        size_bytes,
        port: target.port,
    })
}

/// Digest-compare `source` against `dst`; a mismatch removes `dst` so no
/// corrupt backup stays on disk.
fn verify_or_remove(source: &Path, dst: &Path) -> Result<()> {
    if checksum::files_match(source, dst)? {
        return Ok(());
    }
    fs::remove_file(dst)?;
    Err(BackupError::Integrity(dst.to_path_buf()))
}
