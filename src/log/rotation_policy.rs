use std::time::Duration;

/// When and how a file sink rotates and expires its files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationPolicy {
    /// Rotate before a write that would bring the current file to this size.
    pub max_file_size: u64,
    /// Highest rotated index kept (`.1.log` ..= `.{max_files}.log`).
    pub max_files: usize,
    /// Rotate the current file once it is this old; the cleanup thread also
    /// deletes files older than this.
    pub max_age: Duration,
    /// Rotate a non-empty current file when the sink opens.
    pub rotate_on_start: bool,
    /// Period of the cleanup thread.
    pub cleanup_interval: Duration,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            max_file_size: 10 * 1024 * 1024,
            max_files: 5,
            max_age: Duration::from_secs(12 * 60 * 60),
            rotate_on_start: false,
            cleanup_interval: Duration::from_secs(60 * 60),
        }
    }
}
