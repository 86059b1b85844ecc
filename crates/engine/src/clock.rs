//! Time source for entry timestamps.

use std::fmt;

use chrono::Utc;

/// Supplies the timestamp stamped on committed entries.
pub trait Clock: fmt::Debug + Send + Sync {
    /// Current time as whole seconds since the Unix epoch.
    fn now_unix(&self) -> i64;
}

/// Wall-clock time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> i64 {
        Utc::now().timestamp()
    }
}
