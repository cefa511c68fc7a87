use std::time::Duration;

use chrono::{DateTime, Local};

/// Snapshot of the config manager's bookkeeping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigStats {
    /// Documents known to the manager (loaded, written or defined).
    pub total_configs: usize,
    /// Documents successfully read from disk at least once.
    pub loaded_configs: usize,
    /// Documents with unsaved changes.
    pub modified_configs: usize,
    pub listeners_count: usize,
    pub last_reload_time: Option<DateTime<Local>>,
    pub average_load_time: Duration,
}

/// Running load-time average.
#[derive(Debug, Clone, Default)]
pub(crate) struct LoadTimer {
    loads: u32,
    total: Duration,
    pub(crate) last_reload: Option<DateTime<Local>>,
}

impl LoadTimer {
    pub(crate) fn record(&mut self, took: Duration) {
        self.loads = self.loads.saturating_add(1);
        self.total += took;
        self.last_reload = Some(Local::now());
    }

    pub(crate) fn average(&self) -> Duration {
        if self.loads == 0 {
            Duration::ZERO
        } else {
            self.total / self.loads
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_of_recorded_loads() {
        let mut t = LoadTimer::default();
        assert_eq!(t.average(), Duration::ZERO);
        t.record(Duration::from_millis(10));
        t.record(Duration::from_millis(30));
        assert_eq!(t.average(), Duration::from_millis(20));
        assert!(t.last_reload.is_some());
    }
}
