use thiserror::Error;

/// Failure reported by a sink while accepting a record.
///
/// The logger never propagates these to the caller; it skips the sink for
/// that record and counts the failure.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("sink I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("sink is not available")]
    Unavailable,
    #[error("sink callback failed: {0}")]
    Callback(String),
}
