use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::log::{log_level::LogLevel, log_sink::LogSink, sink_error::SinkError};

const RESET: &str = "\x1b[0m";

/// ANSI colour for a level.
#[must_use]
pub const fn color_code(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Trace => "\x1b[36m", // cyan
        LogLevel::Debug => "\x1b[34m", // blue
        LogLevel::Info => "\x1b[32m",  // green
        LogLevel::Warn => "\x1b[33m",  // yellow
        LogLevel::Error => "\x1b[31m", // red
        LogLevel::Fatal => "\x1b[35m", // magenta
    }
}

enum Target {
    Stdout,
    Stderr,
    Writer(Mutex<Box<dyn Write + Send>>),
}

/// Writes one line per record to stdout, stderr, or a caller-supplied writer.
///
/// Colour can be toggled at runtime through a shared handle.
pub struct ConsoleSink {
    name: String,
    target: Target,
    colors: AtomicBool,
}

impl ConsoleSink {
    /// Console sink on stdout (`use_stderr = false`) or stderr.
    #[must_use]
    pub fn new(use_stderr: bool, enable_colors: bool) -> Self {
        Self {
            name: "console".to_string(),
            target: if use_stderr {
                Target::Stderr
            } else {
                Target::Stdout
            },
            colors: AtomicBool::new(enable_colors),
        }
    }

    /// Console-style sink writing into any `Write`. Useful for capturing
    /// output or piping into another stream.
    pub fn with_writer<W: Write + Send + 'static>(writer: W, enable_colors: bool) -> Self {
        Self {
            name: "console".to_string(),
            target: Target::Writer(Mutex::new(Box::new(writer))),
            colors: AtomicBool::new(enable_colors),
        }
    }

    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn set_color_enabled(&self, enable: bool) {
        self.colors.store(enable, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_color_enabled(&self) -> bool {
        self.colors.load(Ordering::Relaxed)
    }

    fn write_line(out: &mut dyn Write, colored: bool, level: LogLevel, text: &str) -> io::Result<()> {
        if colored {
            writeln!(out, "{}{}{}", color_code(level), text, RESET)?;
        } else {
            writeln!(out, "{text}")?;
        }
        out.flush()
    }
}

impl LogSink for ConsoleSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn log(&self, level: LogLevel, text: &str) -> Result<(), SinkError> {
        let colored = self.is_color_enabled();
        match &self.target {
            Target::Stdout => Self::write_line(&mut io::stdout().lock(), colored, level, text)?,
            Target::Stderr => Self::write_line(&mut io::stderr().lock(), colored, level, text)?,
            Target::Writer(w) => {
                let mut guard = w.lock();
                Self::write_line(&mut **guard, colored, level, text)?;
            }
        }
        Ok(())
    }

    fn flush(&self) {
        let _ = match &self.target {
            Target::Stdout => io::stdout().flush(),
            Target::Stderr => io::stderr().flush(),
            Target::Writer(w) => w.lock().flush(),
        };
    }
}

#[cfg(test)]
pub(crate) mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use std::sync::Arc;

    /// Cloneable in-memory writer for capturing sink output.
    #[derive(Clone, Default)]
    pub(crate) struct SharedBuf(pub Arc<Mutex<Vec<u8>>>);

    impl SharedBuf {
        pub(crate) fn contents(&self) -> String {
            String::from_utf8(self.0.lock().clone()).expect("utf8")
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn plain_output_is_one_line_per_record() {
        let buf = SharedBuf::default();
        let sink = ConsoleSink::with_writer(buf.clone(), false);
        sink.log(LogLevel::Info, "a").unwrap();
        sink.log(LogLevel::Warn, "b").unwrap();
        assert_eq!(buf.contents(), "a\nb\n");
    }

    #[test]
    fn colour_wraps_text_and_can_be_toggled() {
        let buf = SharedBuf::default();
        let sink = ConsoleSink::with_writer(buf.clone(), true);
        sink.log(LogLevel::Error, "bad").unwrap();
        sink.set_color_enabled(false);
        sink.log(LogLevel::Error, "plain").unwrap();
        assert_eq!(buf.contents(), "\x1b[31mbad\x1b[0m\nplain\n");
    }

    #[test]
    fn always_available() {
        let sink = ConsoleSink::new(true, false).named("stderr");
        assert!(sink.is_available());
        assert_eq!(sink.name(), "stderr");
    }
}
