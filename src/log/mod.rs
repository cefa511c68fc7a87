pub mod async_queue;
pub mod callback_sink;
pub mod cleanup_worker;
pub mod clock;
pub mod console_sink;
pub mod file_sink;
pub mod log_format;
pub mod log_level;
pub mod log_macros;
pub mod log_record;
pub mod log_sink;
pub mod log_type;
pub mod logger;
pub mod rotation_policy;
pub mod sink_error;

pub use async_queue::{AsyncQueue, QueueState};
pub use callback_sink::CallbackSink;
pub use clock::{Clock, ManualClock, SystemClock};
pub use console_sink::ConsoleSink;
pub use file_sink::{FileSink, FileSinkOptions};
pub use log_format::{DEFAULT_FORMAT, LogFormat};
pub use log_level::LogLevel;
pub use log_record::LogRecord;
pub use log_sink::LogSink;
pub use log_type::LogType;
pub use logger::Logger;
pub use rotation_policy::RotationPolicy;
pub use sink_error::SinkError;
