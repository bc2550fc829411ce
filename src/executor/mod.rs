//! Backup pipeline orchestration.
//!
//! Sequences the run: background save, verified copy of the snapshot file,
//! optional verified copy of the append-only file, retention cleanup. Copy
//! failures abort the run; an AOF copy failure additionally deletes the
//! snapshot copy made moments before, so no primary backup outlives a
//! missing secondary. Retention failures only warn — the backup itself is
//! already on disk at that point.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::fs::copier::{self, BackupRecord, BackupTarget, FileKind};
use crate::fs::retention;
use crate::store::{self, save, SaveOutcome, StoreClient};
use crate::utils::clock::Clock;
use crate::utils::errors::{BackupError, Result};

/// Per-run settings, resolved from config and CLI before the pipeline
/// starts. Nothing is retried internally; re-invocation after a failed run
/// is the scheduler's job.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub backup_dir: PathBuf,
    pub filename_template: String,
    pub max_backups: usize,
    pub bgsave_timeout: Duration,
    pub port: u16,
    pub with_aof: bool,
    pub aof_filename: String,
}

/// What a completed run produced.
#[derive(Debug)]
pub struct RunReport {
    pub rdb: BackupRecord,
    pub aof: Option<BackupRecord>,
    pub pruned_rdb: usize,
    pub pruned_aof: usize,
}

/// Run the whole backup pipeline against an already-connected store.
pub fn run<S, C>(store: &mut S, clock: &C, options: &RunOptions) -> Result<RunReport>
where
    S: StoreClient + ?Sized,
    C: Clock,
{
    let rdb_source = store::rdb_path(store)?;
    info!(path = %rdb_source.display(), "server rdb file");

    let aof_source = if options.with_aof {
        let path = store::aof_path(store, &options.aof_filename)?;
        info!(path = %path.display(), "server aof file");
        Some(path)
    } else {
        None
    };

    info!("triggering background save");
    let outcome = save::trigger_and_wait(store, clock, options.bgsave_timeout)?;
    info!(%outcome, "background save finished");
    if outcome != SaveOutcome::Ok {
        return Err(BackupError::Save(outcome));
    }

    info!("copying rdb backup");
    let rdb_record = copier::copy(
        &BackupTarget {
            source: rdb_source,
            kind: FileKind::Rdb,
            backup_dir: options.backup_dir.clone(),
            port: options.port,
        },
        &options.filename_template,
    )?;

    let aof_record = match aof_source {
        Some(source) => {
            info!("copying aof backup");
            let target = BackupTarget {
                source,
                kind: FileKind::Aof,
                backup_dir: options.backup_dir.clone(),
                port: options.port,
            };
            match copier::copy(&target, &options.filename_template) {
                Ok(record) => Some(record),
                Err(e) => {
                    // The snapshot copy must not outlive its missing AOF
                    // counterpart; remove it before giving up.
                    error!(path = %rdb_record.path.display(), "aof copy failed, removing rdb backup");
                    fs::remove_file(&rdb_record.path)?;
                    return Err(e);
                }
            }
        }
        None => None,
    };

    let pruned_rdb = prune(options, FileKind::Rdb);
    let pruned_aof = if options.with_aof {
        prune(options, FileKind::Aof)
    } else {
        0
    };

    Ok(RunReport {
        rdb: rdb_record,
        aof: aof_record,
        pruned_rdb,
        pruned_aof,
    })
}

/// Cleanup runs after the backup already succeeded, so its failures are
/// logged and swallowed instead of reverting the run.
fn prune(options: &RunOptions, kind: FileKind) -> usize {
    let suffix = copier::backup_suffix(options.port, kind);
    match retention::enforce(&options.backup_dir, &suffix, options.max_backups) {
        Ok(deleted) => deleted,
        Err(e) => {
            warn!(%suffix, error = %e, "backup cleanup failed");
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::fake::FakeStore;
    use crate::utils::clock::fake::FakeClock;
    use std::fs::File;
    use std::time::SystemTime;
    use tempfile::TempDir;

    fn options(backup_dir: &std::path::Path, with_aof: bool) -> RunOptions {
        RunOptions {
            backup_dir: backup_dir.to_path_buf(),
            filename_template: "redis_dump_%Y-%m-%d_%H%M%S".to_string(),
            max_backups: 10,
            bgsave_timeout: Duration::from_secs(60),
            port: 6379,
            with_aof,
            aof_filename: "appendonly.aof".to_string(),
        }
    }

    fn store_for(data_dir: &std::path::Path, accept_save: bool, polls_until_saved: u32) -> FakeStore {
        FakeStore::new(accept_save, polls_until_saved)
            .with_config("dir", &data_dir.to_string_lossy())
            .with_config("dbfilename", "dump.rdb")
    }

    #[test]
    fn test_successful_run_creates_one_rdb_backup() -> crate::Result<()> {
        let data_dir = TempDir::new()?;
        let backup_dir = TempDir::new()?;
        fs::write(data_dir.path().join("dump.rdb"), b"snapshot")?;

        // Marker moves after two simulated seconds of polling.
        let mut store = store_for(data_dir.path(), true, 2);
        let clock = FakeClock::new();

        let report = run(&mut store, &clock, &options(backup_dir.path(), false))?;

        assert!(report.rdb.path.exists());
        assert!(report
            .rdb
            .path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .ends_with("(port_6379).rdb"));
        assert!(report.aof.is_none());
        assert_eq!(report.pruned_rdb, 0);
        assert_eq!(fs::read_dir(backup_dir.path())?.count(), 1);
        Ok(())
    }

    #[test]
    fn test_rejected_save_aborts_before_any_copy() {
        let data_dir = TempDir::new().unwrap();
        let backup_dir = TempDir::new().unwrap();
        fs::write(data_dir.path().join("dump.rdb"), b"snapshot").unwrap();

        let mut store = store_for(data_dir.path(), false, 0);
        let clock = FakeClock::new();

        let err = run(&mut store, &clock, &options(backup_dir.path(), false)).unwrap_err();

        assert!(matches!(err, BackupError::Save(SaveOutcome::Failed)));
        assert_eq!(fs::read_dir(backup_dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_stalled_save_aborts_with_timeout() {
        let data_dir = TempDir::new().unwrap();
        let backup_dir = TempDir::new().unwrap();
        fs::write(data_dir.path().join("dump.rdb"), b"snapshot").unwrap();

        let mut store = store_for(data_dir.path(), true, u32::MAX);
        let clock = FakeClock::new();
        let mut opts = options(backup_dir.path(), false);
        opts.bgsave_timeout = Duration::from_secs(3);

        let err = run(&mut store, &clock, &opts).unwrap_err();

        assert!(matches!(err, BackupError::Save(SaveOutcome::Timeout)));
        assert_eq!(fs::read_dir(backup_dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_failed_aof_copy_removes_fresh_rdb_backup() {
        let data_dir = TempDir::new().unwrap();
        let backup_dir = TempDir::new().unwrap();
        fs::write(data_dir.path().join("dump.rdb"), b"snapshot").unwrap();
        // No appendonly.aof on disk: the AOF copy will fail.

        let mut store = store_for(data_dir.path(), true, 0);
        let clock = FakeClock::new();

        let err = run(&mut store, &clock, &options(backup_dir.path(), true)).unwrap_err();

        assert!(matches!(err, BackupError::Io(_)));
        // The compensating delete left no orphaned primary behind.
        assert_eq!(fs::read_dir(backup_dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_run_with_aof_copies_both_files() -> crate::Result<()> {
        let data_dir = TempDir::new()?;
        let backup_dir = TempDir::new()?;
        fs::write(data_dir.path().join("dump.rdb"), b"snapshot")?;
        fs::write(data_dir.path().join("appendonly.aof"), b"append log")?;

        let mut store = store_for(data_dir.path(), true, 1);
        let clock = FakeClock::new();

        let report = run(&mut store, &clock, &options(backup_dir.path(), true))?;

        let aof = report.aof.expect("aof record");
        assert!(report.rdb.path.exists());
        assert!(aof.path.exists());
        assert!(aof
            .path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .ends_with("(port_6379).aof"));
        Ok(())
    }

    #[test]
    fn test_run_prunes_down_to_max_backups() -> crate::Result<()> {
        let data_dir = TempDir::new()?;
        let backup_dir = TempDir::new()?;
        fs::write(data_dir.path().join("dump.rdb"), b"snapshot")?;

        // 12 pre-existing backups, all older than the one this run adds.
        let base = SystemTime::now() - std::time::Duration::from_secs(24 * 3600);
        for i in 0..12 {
            let path = backup_dir.path().join(format!("old_{i:02}(port_6379).rdb"));
            fs::write(&path, b"stale")?;
            let file = File::options().write(true).open(&path)?;
            file.set_modified(base + Duration::from_secs(i * 60))?;
        }

        let mut store = store_for(data_dir.path(), true, 0);
        let clock = FakeClock::new();

        let report = run(&mut store, &clock, &options(backup_dir.path(), false))?;

        // 12 + 1 new, pruned back down to exactly max_backups.
        assert_eq!(report.pruned_rdb, 3);
        let remaining: Vec<_> = fs::read_dir(backup_dir.path())?
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(remaining.len(), 10);
        assert!(report.rdb.path.exists());
        // The three oldest by mtime are the ones gone.
        for i in 0..3 {
            assert!(!remaining.iter().any(|n| n == &format!("old_{i:02}(port_6379).rdb")));
        }
        Ok(())
    }
}
