//! Redis-backed implementation of [`StoreClient`].

use std::collections::HashMap;

use redis::{Connection, ErrorKind};

use crate::store::{SaveMarker, StoreClient};
use crate::utils::errors::{BackupError, Result};

/// A single synchronous connection with one outstanding command at a time.
pub struct RedisStore {
    connection: Connection,
}

impl RedisStore {
    /// Connect to the server at `host:port`.
    pub fn connect(host: &str, port: u16) -> Result<Self> {
        let client = redis::Client::open((host, port))?;
        let connection = client.get_connection()?;
        Ok(Self { connection })
    }
}

impl StoreClient for RedisStore {
    fn trigger_background_save(&mut self) -> Result<bool> {
        match redis::cmd("BGSAVE").query::<String>(&mut self.connection) {
            Ok(_) => Ok(true),
            // An error reply means the server refused to start another
            // save; transport failures still propagate.
            Err(e) if e.kind() == ErrorKind::ResponseError => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn last_save_marker(&mut self) -> Result<SaveMarker> {
        let stamp: i64 = redis::cmd("LASTSAVE").query(&mut self.connection)?;
        Ok(SaveMarker(stamp))
    }

    fn config_value(&mut self, key: &str) -> Result<String> {
        let values: HashMap<String, String> = redis::cmd("CONFIG")
            .arg("GET")
            .arg(key)
            .query(&mut self.connection)?;

        values
            .get(key)
            .cloned()
            .ok_or_else(|| BackupError::Config(format!("server did not report a value for `{key}`")))
    }
}
