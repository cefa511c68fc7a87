use std::{
    sync::atomic::{AtomicU64, Ordering},
    thread::{self, ThreadId},
};

use chrono::{DateTime, Local};

use crate::log::log_level::LogLevel;

/// Represents a single log event.
///
/// A record is immutable once captured: the severity, the raw message, the
/// wall-clock capture time, the call site and the producing thread.
#[derive(Debug, Clone)]
pub struct LogRecord {
    /// The severity level of the log.
    pub level: LogLevel,
    /// The raw message, before the format template is applied.
    pub message: String,
    /// Wall-clock capture time, millisecond precision when formatted.
    pub timestamp: DateTime<Local>,
    /// Basename of the source file that produced the record.
    pub filename: String,
    /// Source line.
    pub line: u32,
    /// Identifier of the producing thread.
    pub thread: ThreadId,
    /// Small per-process number of the producing thread, printed by
    /// `%thread%`. Numbers are handed out in order of first capture.
    pub thread_no: u64,
}

impl LogRecord {
    /// Captures a new record on the calling thread.
    ///
    /// `file` may be a full path (as produced by `file!()`); only its
    /// basename is kept.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let rec = LogRecord::capture(LogLevel::Info, file!(), line!(), "Connection established");
    /// assert_eq!(rec.filename, "log_record.rs");
    /// ```
    pub fn capture(level: LogLevel, file: &str, line: u32, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            timestamp: Local::now(),
            filename: basename(file).to_string(),
            line,
            thread: thread::current().id(),
            thread_no: thread_no(),
        }
    }
}

fn thread_no() -> u64 {
    static NEXT: AtomicU64 = AtomicU64::new(1);
    thread_local! {
        static NO: u64 = NEXT.fetch_add(1, Ordering::Relaxed);
    }
    NO.with(|n| *n)
}

/// Returns the last path component, accepting both `/` and `\` separators.
pub(crate) fn basename(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}
