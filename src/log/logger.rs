use std::{
    io,
    panic::{self, AssertUnwindSafe, Location},
    sync::{
        Arc, OnceLock,
        atomic::{AtomicU8, AtomicU64, Ordering},
    },
};

use parking_lot::RwLock;

use crate::log::{
    async_queue::{AsyncQueue, QueueState},
    log_format::LogFormat,
    log_level::LogLevel,
    log_record::LogRecord,
    log_sink::LogSink,
};

/// Queue capacity used by [`Logger::enable_async`].
pub const DEFAULT_QUEUE_CAPACITY: usize = 10_000;

type SinkList = Arc<Vec<Arc<dyn LogSink>>>;
type Queue = Arc<AsyncQueue<LogRecord>>;

/// State reachable from producers and from the async worker.
struct Shared {
    level: AtomicU8,
    sinks: RwLock<SinkList>,
    format: RwLock<Arc<LogFormat>>,
    sink_failures: AtomicU64,
}

impl Shared {
    /// Formats once, then hands the text to every available sink in
    /// insertion order. Sinks run on a snapshot of the list, outside the lock.
    fn dispatch(&self, record: &LogRecord) {
        let format = self.format.read().clone();
        let text = format.format(record);
        let sinks = self.sinks.read().clone();

        for sink in sinks.iter() {
            if !sink.is_available() {
                continue;
            }
            let delivered =
                panic::catch_unwind(AssertUnwindSafe(|| sink.log(record.level, &text)));
            if !matches!(delivered, Ok(Ok(()))) {
                self.sink_failures.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    fn flush_sinks(&self) {
        let sinks = self.sinks.read().clone();
        for sink in sinks.iter() {
            let _ = panic::catch_unwind(AssertUnwindSafe(|| sink.flush()));
        }
    }
}

struct LoggerInner {
    shared: Arc<Shared>,
    /// Only ever held for a slot swap or a push; a queue is stopped after
    /// it has been taken out, since its worker may be logging back in.
    queue: RwLock<Option<Queue>>,
    /// Drops counted by queues that have since been stopped.
    retired_drops: AtomicU64,
}

impl LoggerInner {
    fn current_queue(&self) -> Option<Queue> {
        self.queue.read().clone()
    }

    fn retire(&self, queue: Option<Queue>) {
        if let Some(queue) = queue {
            queue.stop();
            self.retired_drops
                .fetch_add(queue.dropped(), Ordering::Relaxed);
        }
    }
}

impl Drop for LoggerInner {
    fn drop(&mut self) {
        if let Some(queue) = self.queue.get_mut().take() {
            queue.stop();
        }
        self.shared.flush_sinks();
    }
}

/// Leveled logger fanning records out to a set of named sinks.
///
/// `Logger` is a cheap handle: clones share level, sinks, format and the
/// async worker. [`Logger::global`] is the process-wide instance.
///
/// # Modes
///
/// * **Sync** (default): the calling thread formats the record and writes
///   it to every sink.
/// * **Async**: the caller only captures the record and enqueues it; a
///   single `log-async` worker formats and dispatches. A full queue drops the
///   record and counts it (see [`dropped`](Self::dropped)).
#[derive(Clone)]
pub struct Logger {
    inner: Arc<LoggerInner>,
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

impl Logger {
    /// A synchronous logger at `Info` with no sinks and the default format.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(LoggerInner {
                shared: Arc::new(Shared {
                    level: AtomicU8::new(LogLevel::Info as u8),
                    sinks: RwLock::new(Arc::new(Vec::new())),
                    format: RwLock::new(Arc::new(LogFormat::default())),
                    sink_failures: AtomicU64::new(0),
                }),
                queue: RwLock::new(None),
                retired_drops: AtomicU64::new(0),
            }),
        }
    }

    /// The process-wide logger, created on first use.
    pub fn global() -> &'static Self {
        static GLOBAL: OnceLock<Logger> = OnceLock::new();
        GLOBAL.get_or_init(Self::new)
    }

    pub fn set_level(&self, level: LogLevel) {
        self.inner
            .shared
            .level
            .store(level as u8, Ordering::Relaxed);
    }

    #[must_use]
    pub fn level(&self) -> LogLevel {
        LogLevel::from_u8(self.inner.shared.level.load(Ordering::Relaxed))
    }

    /// Whether a record at `level` would be dispatched right now.
    #[must_use]
    pub fn enabled(&self, level: LogLevel) -> bool {
        level as u8 >= self.inner.shared.level.load(Ordering::Relaxed)
    }

    /// Adds `sink`, replacing any sink with the same name in place.
    pub fn add_sink(&self, sink: Arc<dyn LogSink>) {
        let mut guard = self.inner.shared.sinks.write();
        let mut next: Vec<_> = guard.iter().cloned().collect();
        match next.iter().position(|s| s.name() == sink.name()) {
            Some(i) => next[i] = sink,
            None => next.push(sink),
        }
        *guard = Arc::new(next);
    }

    /// Removes the sink called `name`. Returns `true` if one was removed.
    pub fn remove_sink(&self, name: &str) -> bool {
        let mut guard = self.inner.shared.sinks.write();
        let before = guard.len();
        let next: Vec<_> = guard.iter().filter(|s| s.name() != name).cloned().collect();
        let removed = next.len() != before;
        *guard = Arc::new(next);
        removed
    }

    pub fn clear_sinks(&self) {
        *self.inner.shared.sinks.write() = Arc::new(Vec::new());
    }

    #[must_use]
    pub fn sink_names(&self) -> Vec<String> {
        self.inner
            .shared
            .sinks
            .read()
            .iter()
            .map(|s| s.name().to_string())
            .collect()
    }

    #[must_use]
    pub fn sink(&self, name: &str) -> Option<Arc<dyn LogSink>> {
        self.inner
            .shared
            .sinks
            .read()
            .iter()
            .find(|s| s.name() == name)
            .cloned()
    }

    pub fn set_format(&self, template: &str) {
        *self.inner.shared.format.write() = Arc::new(LogFormat::compile(template));
    }

    #[must_use]
    pub fn format(&self) -> String {
        self.inner.shared.format.read().template().to_string()
    }

    /// Logs `message` from `file:line`. Below the current level this returns
    /// before anything is captured.
    pub fn log(&self, level: LogLevel, file: &str, line: u32, message: impl Into<String>) {
        if !self.enabled(level) {
            return;
        }
        let record = LogRecord::capture(level, file, line, message);

        let queue = self.inner.queue.read();
        match queue.as_ref() {
            Some(q) => {
                q.push(record);
            }
            None => {
                drop(queue);
                self.inner.shared.dispatch(&record);
            }
        }
    }

    #[track_caller]
    fn log_here(&self, level: LogLevel, message: impl Into<String>) {
        if !self.enabled(level) {
            return;
        }
        let loc = Location::caller();
        self.log(level, loc.file(), loc.line(), message);
    }

    #[track_caller]
    pub fn trace(&self, message: impl Into<String>) {
        self.log_here(LogLevel::Trace, message);
    }

    #[track_caller]
    pub fn debug(&self, message: impl Into<String>) {
        self.log_here(LogLevel::Debug, message);
    }

    #[track_caller]
    pub fn info(&self, message: impl Into<String>) {
        self.log_here(LogLevel::Info, message);
    }

    #[track_caller]
    pub fn warn(&self, message: impl Into<String>) {
        self.log_here(LogLevel::Warn, message);
    }

    #[track_caller]
    pub fn error(&self, message: impl Into<String>) {
        self.log_here(LogLevel::Error, message);
    }

    #[track_caller]
    pub fn fatal(&self, message: impl Into<String>) {
        self.log_here(LogLevel::Fatal, message);
    }

    /// Switches between sync and async dispatch.
    ///
    /// Enabling starts a worker with a queue of `queue_capacity` records
    /// (`0` = unbounded); enabling again restarts it with the new capacity.
    /// Disabling drains every queued record to the sinks before returning,
    /// except when called from a sink on the worker thread: then the worker
    /// finishes the backlog after the call returns.
    ///
    /// # Errors
    ///
    /// Returns the spawn error if the worker thread cannot be started; the
    /// logger stays synchronous in that case.
    pub fn set_async(&self, enable: bool, queue_capacity: usize) -> io::Result<()> {
        let old = self.inner.queue.write().take();
        self.inner.retire(old);
        if enable {
            let shared = self.inner.shared.clone();
            let queue = AsyncQueue::start("log-async", queue_capacity, move |record: LogRecord| {
                shared.dispatch(&record);
            })?;
            let raced = self.inner.queue.write().replace(Arc::new(queue));
            self.inner.retire(raced);
        }
        Ok(())
    }

    /// `set_async(true, DEFAULT_QUEUE_CAPACITY)`.
    pub fn enable_async(&self) -> io::Result<()> {
        self.set_async(true, DEFAULT_QUEUE_CAPACITY)
    }

    #[must_use]
    pub fn is_async(&self) -> bool {
        self.inner.queue.read().is_some()
    }

    #[must_use]
    pub fn async_state(&self) -> QueueState {
        self.inner
            .current_queue()
            .map_or(QueueState::Stopped, |q| q.state())
    }

    /// Waits for the async queue to empty (if any), then flushes every sink.
    /// From a sink running on the async worker it only flushes.
    pub fn flush(&self) {
        if let Some(queue) = self.inner.current_queue() {
            queue.wait_idle();
        }
        self.inner.shared.flush_sinks();
    }

    /// Records refused by a full async queue, over the logger's lifetime.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        let live = self.inner.current_queue().map_or(0, |q| q.dropped());
        self.inner.retired_drops.load(Ordering::Relaxed) + live
    }

    /// Sink calls that returned an error or panicked.
    #[must_use]
    pub fn sink_failures(&self) -> u64 {
        self.inner.shared.sink_failures.load(Ordering::Relaxed)
    }

    /// Drains the async worker, flushes and releases every sink. Calling it
    /// again, or on a logger that never logged, is harmless.
    pub fn shutdown(&self) {
        let old = self.inner.queue.write().take();
        self.inner.retire(old);
        self.inner.shared.flush_sinks();
        self.clear_sinks();
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use crate::log::{
        callback_sink::CallbackSink, console_sink::ConsoleSink,
        console_sink::tests::SharedBuf, sink_error::SinkError,
    };
    use parking_lot::Mutex;

    fn capture(logger: &Logger, name: &str) -> Arc<Mutex<Vec<String>>> {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let l = lines.clone();
        logger.add_sink(Arc::new(
            CallbackSink::new(move |_, text| l.lock().push(text.to_string())).named(name),
        ));
        lines
    }

    struct FailingSink;

    impl LogSink for FailingSink {
        fn name(&self) -> &str {
            "failing"
        }
        fn log(&self, _: LogLevel, _: &str) -> Result<(), SinkError> {
            Err(SinkError::Unavailable)
        }
        fn flush(&self) {}
    }

    #[test]
    fn level_filter_and_order() {
        let logger = Logger::new();
        logger.set_format("%level% %message%");
        let lines = capture(&logger, "cap");
        logger.set_level(LogLevel::Warn);
        logger.info("a");
        logger.warn("b");
        logger.error("c");
        assert_eq!(*lines.lock(), vec!["WARN b", "ERROR c"]);
    }

    #[test]
    fn convenience_methods_record_caller_location() {
        let logger = Logger::new();
        logger.set_format("%filename%:%line%");
        let lines = capture(&logger, "cap");
        let expected_line = line!() + 1;
        logger.info("here");
        assert_eq!(*lines.lock(), vec![format!("logger.rs:{expected_line}")]);
    }

    #[test]
    fn add_sink_replaces_by_name_in_place() {
        let logger = Logger::new();
        let first = capture(&logger, "a");
        let _b = capture(&logger, "b");
        let second = capture(&logger, "a");
        assert_eq!(logger.sink_names(), vec!["a", "b"]);
        logger.error("x");
        assert!(first.lock().is_empty());
        assert_eq!(second.lock().len(), 1);

        assert!(logger.remove_sink("a"));
        assert!(!logger.remove_sink("a"));
        assert_eq!(logger.sink_names(), vec!["b"]);
    }

    #[test]
    fn failing_sink_does_not_starve_others() {
        let logger = Logger::new();
        logger.add_sink(Arc::new(FailingSink));
        logger.add_sink(Arc::new(CallbackSink::new(|_, _| panic!("nope")).named("panicky")));
        let lines = capture(&logger, "ok");
        logger.error("still delivered");
        assert_eq!(lines.lock().len(), 1);
        assert_eq!(logger.sink_failures(), 2);
    }

    #[test]
    fn unavailable_sink_is_skipped_silently() {
        let logger = Logger::new();
        logger.add_sink(Arc::new(CallbackSink::empty()));
        logger.error("x");
        assert_eq!(logger.sink_failures(), 0);
    }

    #[test]
    fn console_sink_receives_formatted_line() {
        let logger = Logger::new();
        let buf = SharedBuf::default();
        logger.add_sink(Arc::new(ConsoleSink::with_writer(buf.clone(), false)));
        logger.set_format("[%level%] %message%");
        logger.log(LogLevel::Fatal, "main.rs", 3, "down");
        assert_eq!(buf.contents(), "[FATAL] down\n");
    }

    #[test]
    fn async_mode_drains_on_disable() {
        let logger = Logger::new();
        logger.set_format("%message%");
        let lines = capture(&logger, "cap");
        logger.set_async(true, 0).unwrap();
        assert!(logger.is_async());
        assert_eq!(logger.async_state(), QueueState::Running);
        for i in 0..200 {
            logger.info(format!("{i}"));
        }
        logger.set_async(false, 0).unwrap();
        assert!(!logger.is_async());
        assert_eq!(logger.async_state(), QueueState::Stopped);
        let expected: Vec<String> = (0..200).map(|i| i.to_string()).collect();
        assert_eq!(*lines.lock(), expected);
        assert_eq!(logger.dropped(), 0);
    }

    #[test]
    fn sink_logging_back_does_not_block_mode_switch() {
        let logger = Logger::new();
        logger.set_format("%message%");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (s, inner) = (seen.clone(), logger.clone());
        logger.add_sink(Arc::new(CallbackSink::new(move |_, text| {
            s.lock().push(text.to_string());
            if !text.starts_with("echo") {
                std::thread::sleep(std::time::Duration::from_millis(2));
                inner.warn(format!("echo {text}"));
                inner.flush();
            }
        })));
        logger.set_async(true, 0).unwrap();
        for i in 0..200 {
            logger.info(i.to_string());
        }

        let (done_tx, done_rx) = std::sync::mpsc::channel();
        let switcher = logger.clone();
        std::thread::spawn(move || {
            switcher.set_async(false, 0).unwrap();
            let _ = done_tx.send(());
        });
        done_rx
            .recv_timeout(std::time::Duration::from_secs(10))
            .expect("switching to sync mode returned");

        assert!(!logger.is_async());
        let originals = seen.lock().iter().filter(|t| !t.starts_with("echo")).count();
        assert_eq!(originals, 200);
        logger.clear_sinks();
    }

    #[test]
    fn flush_waits_for_queue() {
        let logger = Logger::new();
        let lines = capture(&logger, "cap");
        logger.set_async(true, 1000).unwrap();
        for _ in 0..100 {
            logger.warn("w");
        }
        logger.flush();
        assert_eq!(lines.lock().len() as u64 + logger.dropped(), 100);
    }

    #[test]
    fn shutdown_is_idempotent() {
        let logger = Logger::new();
        let lines = capture(&logger, "cap");
        logger.set_async(true, 16).unwrap();
        logger.error("last words");
        logger.shutdown();
        logger.shutdown();
        assert!(logger.sink_names().is_empty());
        assert_eq!(lines.lock().len() as u64 + logger.dropped(), 1);
        Logger::new().shutdown();
    }
}
