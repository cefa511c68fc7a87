use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::log::{log_level::LogLevel, log_sink::LogSink, sink_error::SinkError};

/// Embedder hook receiving every formatted record.
pub type LogCallback = Arc<dyn Fn(LogLevel, &str) + Send + Sync>;

/// Forwards records to an embedder-supplied callback.
///
/// The callback is cloned out of the lock before it runs, so it may call back
/// into the logger or replace itself.
pub struct CallbackSink {
    name: String,
    callback: RwLock<Option<LogCallback>>,
}

impl CallbackSink {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(LogLevel, &str) + Send + Sync + 'static,
    {
        Self {
            name: "callback".to_string(),
            callback: RwLock::new(Some(Arc::new(callback))),
        }
    }

    /// A sink with no callback yet; it reports unavailable until one is set.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            name: "callback".to_string(),
            callback: RwLock::new(None),
        }
    }

    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn set_callback<F>(&self, callback: F)
    where
        F: Fn(LogLevel, &str) + Send + Sync + 'static,
    {
        *self.callback.write() = Some(Arc::new(callback));
    }

    pub fn clear_callback(&self) {
        *self.callback.write() = None;
    }
}

impl LogSink for CallbackSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn log(&self, level: LogLevel, text: &str) -> Result<(), SinkError> {
        let Some(cb) = self.callback.read().clone() else {
            return Err(SinkError::Unavailable);
        };
        panic::catch_unwind(AssertUnwindSafe(|| cb(level, text))).map_err(|payload| {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "callback panicked".to_string());
            SinkError::Callback(reason)
        })
    }

    fn flush(&self) {}

    fn is_available(&self) -> bool {
        self.callback.read().is_some()
    }
}
