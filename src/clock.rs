use std::sync::Arc;

use chrono::{NaiveDateTime, Utc};

/// Wall-clock abstraction. Everything that reads "now" goes through this so
/// cutoff and live-hours logic stays deterministic under test.
///
/// All timestamps in the system are UTC wall time (`NaiveDateTime`), matching
/// the DATETIME columns.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Utc::now().naive_utc()
    }
}

pub type SharedClock = Arc<dyn Clock>;
