//! Injectable time source for the save poll loop.
//!
//! The poll loop never calls `Instant::now` or `thread::sleep` directly;
//! tests substitute a simulated clock and run timeout scenarios without
//! real wall-clock delay.

use std::time::{Duration, Instant};

pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

/// Wall-clock implementation backed by `std::thread::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
