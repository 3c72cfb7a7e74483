//! Monotonic wall-clock time, abstracted so tests can drive the sweeper
//! deterministically instead of sleeping in real time.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

pub trait Clock: Send + Sync {
    fn now_secs(&self) -> u64;
}

#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_secs(&self) -> u64 {
        SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
    }
}

/// A clock whose value is set explicitly by test code, for driving scenario
/// tests (S3/S4) without real sleeps.
#[derive(Debug, Default)]
pub struct MockClock {
    secs: AtomicU64,
}

impl MockClock {
    pub fn new(start_secs: u64) -> Self {
        Self { secs: AtomicU64::new(start_secs) }
    }

    pub fn advance(&self, delta_secs: u64) {
        self.secs.fetch_add(delta_secs, Ordering::SeqCst);
    }

    pub fn set(&self, secs: u64) {
        self.secs.store(secs, Ordering::SeqCst);
    }
}

impl Clock for MockClock {
    fn now_secs(&self) -> u64 {
        self.secs.load(Ordering::SeqCst)
    }
}
