//! Background-save trigger and completion polling.

use std::time::Duration;

use crate::store::{SaveOutcome, StoreClient};
use crate::utils::clock::Clock;
use crate::utils::errors::Result;

/// Interval between last-save marker polls. Coarse enough to avoid
/// hammering the server, fine enough for multi-second snapshot durations.
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Trigger a background save and wait for it to finish.
///
/// Records the current last-save marker, issues the save command and polls
/// the marker until it moves or `timeout` elapses. A rejected command is
/// reported as [`SaveOutcome::Failed`] without any polling. On timeout the
/// remote save keeps running; only the wait is abandoned. Completion is
/// detected purely by marker identity, so clock skew between this process
/// and the server does not matter.
pub fn trigger_and_wait<S, C>(store: &mut S, clock: &C, timeout: Duration) -> Result<SaveOutcome>
where
    S: StoreClient + ?Sized,
    C: Clock,
{
    let started = clock.now();
    let t0 = store.last_save_marker()?;

    if !store.trigger_background_save()? {
        return Ok(SaveOutcome::Failed);
    }

    loop {
        if store.last_save_marker()? != t0 {
            return Ok(SaveOutcome::Ok);
        }
        if clock.now().duration_since(started) > timeout {
            return Ok(SaveOutcome::Timeout);
        }
        clock.sleep(POLL_INTERVAL);
    }
}
