//! Injectable time source.
//!
//! Archive names embed their creation timestamp, so anything exercising the
//! naming path needs deterministic time. Production code uses [`SystemClock`];
//! tests substitute a fixed clock.

use chrono::{DateTime, Utc};

/// Source of "now" for archive naming.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time in UTC.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
