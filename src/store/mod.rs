//! Remote store access.
//!
//! The pipeline talks to the server through the narrow [`StoreClient`]
//! trait: trigger a background save, read the last-save marker, look up
//! configuration values. The production implementation is the redis-backed
//! [`client::RedisStore`]; tests substitute an in-memory fake.

pub mod client;
pub mod save;

use std::fmt;
use std::path::PathBuf;

use crate::utils::errors::Result;

/// Opaque save-completion marker.
///
/// The store bumps it whenever a persistence operation finishes; only
/// identity is meaningful, the embedded value is never compared against
/// local clocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveMarker(pub(crate) i64);

/// Terminal result of one background-save attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Ok,
    Failed,
    Timeout,
}

impl fmt::Display for SaveOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SaveOutcome::Ok => "ok",
            SaveOutcome::Failed => "failed",
            SaveOutcome::Timeout => "timeout",
        };
        f.write_str(s)
    }
}

/// The narrow contract the backup pipeline needs from the store.
pub trait StoreClient {
    /// Ask the store to start an asynchronous background save. `false`
    /// means the command was rejected (e.g. a save is already running).
    fn trigger_background_save(&mut self) -> Result<bool>;

    /// Current last-save marker.
    fn last_save_marker(&mut self) -> Result<SaveMarker>;

    /// Value of a single server configuration key.
    fn config_value(&mut self, key: &str) -> Result<String>;
}

/// Resolve the absolute path of the server's snapshot file from its `dir`
/// and `dbfilename` configuration.
pub fn rdb_path<S: StoreClient + ?Sized>(store: &mut S) -> Result<PathBuf> {
    let dir = store.config_value("dir")?;
    let dbfilename = store.config_value("dbfilename")?;
    Ok(PathBuf::from(dir).join(dbfilename))
}

/// Resolve the absolute path of the append-only file. The server reports
/// its data directory; the AOF filename is supplied by the caller.
pub fn aof_path<S: StoreClient + ?Sized>(store: &mut S, aof_filename: &str) -> Result<PathBuf> {
    let dir = store.config_value("dir")?;
    Ok(PathBuf::from(dir).join(aof_filename))
}

#[cfg(test)]
pub(crate) mod fake {
    use super::{SaveMarker, StoreClient};
    use crate::utils::errors::{BackupError, Result};
    use std::collections::HashMap;

    /// In-memory store whose marker advances a fixed number of polls after
    /// a save is triggered.
    pub struct FakeStore {
        accept_save: bool,
        polls_until_saved: u32,
        marker: i64,
        saving: bool,
        polls_seen: u32,
        config: HashMap<String, String>,
        /// Number of `last_save_marker` calls observed.
        pub marker_reads: u32,
    }

    impl FakeStore {
        pub fn new(accept_save: bool, polls_until_saved: u32) -> Self {
            Self {
                accept_save,
                polls_until_saved,
                marker: 1_700_000_000,
                saving: false,
                polls_seen: 0,
                config: HashMap::new(),
                marker_reads: 0,
            }
        }

        pub fn with_config(mut self, key: &str, value: &str) -> Self {
            self.config.insert(key.to_string(), value.to_string());
            self
        }
    }

    impl StoreClient for FakeStore {
        fn trigger_background_save(&mut self) -> Result<bool> {
            if self.accept_save {
                self.saving = true;
                self.polls_seen = 0;
            }
            Ok(self.accept_save)
        }

        fn last_save_marker(&mut self) -> Result<SaveMarker> {
            self.marker_reads += 1;
            if self.saving {
                if self.polls_seen >= self.polls_until_saved {
                    self.saving = false;
                    self.marker += 1;
                } else {
                    self.polls_seen += 1;
                }
            }
            Ok(SaveMarker(self.marker))
        }

        fn config_value(&mut self, key: &str) -> Result<String> {
            self.config
                .get(key)
                .cloned()
                .ok_or_else(|| BackupError::Config(format!("no value for `{key}`")))
        }
    }
}
