use std::time::{Duration, SystemTime};

use chrono::{DateTime, Local};
use parking_lot::Mutex;

/// Wall-clock source for the file sink (rotation age, file-name stamps,
/// cleanup age).
pub trait Clock: Send + Sync {
    fn now(&self) -> SystemTime;

    fn now_local(&self) -> DateTime<Local> {
        DateTime::<Local>::from(self.now())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<SystemTime>,
}

impl ManualClock {
    #[must_use]
    pub fn new(start: SystemTime) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    #[must_use]
    pub fn starting_now() -> Self {
        Self::new(SystemTime::now())
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }

    pub fn set(&self, to: SystemTime) {
        *self.now.lock() = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> SystemTime {
        *self.now.lock()
    }
}

/// `YYYYMMDD_HHMMSS` in local time, used for log file names.
pub(crate) fn filename_stamp(clock: &dyn Clock) -> String {
    clock.now_local().format("%Y%m%d_%H%M%S").to_string()
}
