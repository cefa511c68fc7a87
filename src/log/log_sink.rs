use crate::log::{log_level::LogLevel, sink_error::SinkError};

/// Destination for formatted log records.
///
/// Sinks are shared (`Arc<dyn LogSink>`): the embedder may keep a handle to
/// reconfigure a sink after handing it to the logger. A sink's name is its
/// identity inside a logger.
pub trait LogSink: Send + Sync {
    fn name(&self) -> &str;

    /// Accepts one formatted record. `text` carries no trailing newline.
    fn log(&self, level: LogLevel, text: &str) -> Result<(), SinkError>;

    fn flush(&self);

    fn is_available(&self) -> bool {
        true
    }
}
