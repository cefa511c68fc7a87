use std::{
    fs::{self, File, OpenOptions},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, SystemTime},
};

use parking_lot::Mutex;

use crate::log::{
    cleanup_worker::CleanupWorker,
    clock::{Clock, SystemClock, filename_stamp},
    log_level::LogLevel,
    log_sink::LogSink,
    log_type::LogType,
    rotation_policy::RotationPolicy,
    sink_error::SinkError,
};

/// Construction options for [`FileSink`].
#[derive(Debug, Clone)]
pub struct FileSinkOptions {
    /// Append to an existing current file instead of truncating it.
    pub append: bool,
    /// Flush after every record.
    pub auto_flush: bool,
    /// Start the age-based cleanup thread right away.
    pub start_cleanup: bool,
    /// Sink name; defaults to `file:{type dir}`.
    pub name: Option<String>,
}

impl Default for FileSinkOptions {
    fn default() -> Self {
        Self {
            append: true,
            auto_flush: true,
            start_cleanup: true,
            name: None,
        }
    }
}

struct FileState {
    base_dir: PathBuf,
    log_type: LogType,
    policy: RotationPolicy,
    append: bool,
    auto_flush: bool,
    file: Option<BufWriter<File>>,
    current_path: Option<PathBuf>,
    /// Stem shared by the rotated files of this sink (`{series}.{i}.log`).
    series: Option<String>,
    current_bytes: u64,
    last_rotation: SystemTime,
}

impl FileState {
    fn log_dir(&self) -> PathBuf {
        self.base_dir.join(self.log_type.dir_name())
    }

    fn is_open(&self) -> bool {
        self.file.is_some()
    }

    fn close(&mut self) {
        if let Some(mut file) = self.file.take() {
            let _ = file.flush();
        }
    }

    /// Opens a freshly stamped current file. `starting` marks an open that is
    /// not part of a rotation, where `rotate_on_start` applies.
    fn open(&mut self, clock: &dyn Clock, starting: bool) -> io::Result<()> {
        self.close();
        let dir = self.log_dir();
        fs::create_dir_all(&dir)?;

        let stem = format!("{}_{}", self.log_type.file_prefix(), filename_stamp(clock));
        let path = dir.join(format!("{stem}.log"));
        let file = if self.append {
            OpenOptions::new().create(true).append(true).open(&path)?
        } else {
            OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&path)?
        };

        self.current_bytes = if self.append { file.metadata()?.len() } else { 0 };
        self.file = Some(BufWriter::new(file));
        self.current_path = Some(path);
        self.series.get_or_insert(stem);
        self.last_rotation = clock.now();

        if starting && self.policy.rotate_on_start && self.current_bytes > 0 {
            self.rotate(clock)?;
        }
        Ok(())
    }

    fn should_rotate(&self, next_len: u64, now: SystemTime) -> bool {
        let by_size =
            self.current_bytes > 0 && self.current_bytes + next_len >= self.policy.max_file_size;
        let age = now
            .duration_since(self.last_rotation)
            .unwrap_or(Duration::ZERO);
        by_size || age >= self.policy.max_age
    }

    /// Closes the current file, shifts `.i.log` to `.i+1.log` from the top
    /// down, moves the current file to `.1.log`, and opens a new current file.
    /// On error the sink is left closed.
    fn rotate(&mut self, clock: &dyn Clock) -> io::Result<()> {
        self.close();
        let dir = self.log_dir();

        if let (Some(series), Some(current)) = (self.series.clone(), self.current_path.take()) {
            let max = self.policy.max_files.max(1);
            for i in (1..max).rev() {
                let from = dir.join(format!("{series}.{i}.log"));
                if !from.exists() {
                    continue;
                }
                let to = dir.join(format!("{series}.{}.log", i + 1));
                if to.exists() {
                    fs::remove_file(&to)?;
                }
                fs::rename(&from, &to)?;
            }
            let first = dir.join(format!("{series}.1.log"));
            if first.exists() {
                fs::remove_file(&first)?;
            }
            if current.exists() {
                fs::rename(&current, &first)?;
            }
        }

        self.open(clock, false)
    }

    fn write_record(&mut self, text: &str) -> io::Result<()> {
        let Some(file) = self.file.as_mut() else {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "log file is closed"));
        };
        file.write_all(text.as_bytes())?;
        file.write_all(b"\n")?;
        self.current_bytes += text.len() as u64 + 1;
        if self.auto_flush {
            file.flush()?;
        }
        Ok(())
    }
}

/// Writes records to `{base}/{type dir}/Fantasy_{Type}_{YYYYMMDD_HHMMSS}.log`,
/// rotating by size and age and optionally purging expired files in the
/// background.
///
/// All file operations, rotation included, run under one mutex per sink.
pub struct FileSink {
    name: String,
    clock: Arc<dyn Clock>,
    state: Arc<Mutex<FileState>>,
    open: AtomicBool,
    cleanup: Mutex<Option<CleanupWorker>>,
}

impl FileSink {
    /// File sink with the default policy and options.
    pub fn new(base_dir: impl Into<PathBuf>, log_type: LogType) -> Self {
        Self::with_options(
            base_dir,
            log_type,
            RotationPolicy::default(),
            FileSinkOptions::default(),
        )
    }

    pub fn with_options(
        base_dir: impl Into<PathBuf>,
        log_type: LogType,
        policy: RotationPolicy,
        options: FileSinkOptions,
    ) -> Self {
        Self::with_clock(base_dir, log_type, policy, options, Arc::new(SystemClock))
    }

    /// Like [`with_options`](Self::with_options) with an explicit time
    /// source for rotation age, file-name stamps and cleanup age.
    ///
    /// The first file is opened immediately; if that fails the sink reports
    /// unavailable and retries on the next record.
    pub fn with_clock(
        base_dir: impl Into<PathBuf>,
        log_type: LogType,
        policy: RotationPolicy,
        options: FileSinkOptions,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let name = options
            .name
            .clone()
            .unwrap_or_else(|| format!("file:{}", log_type.dir_name()));
        let mut state = FileState {
            base_dir: base_dir.into(),
            log_type,
            policy,
            append: options.append,
            auto_flush: options.auto_flush,
            file: None,
            current_path: None,
            series: None,
            current_bytes: 0,
            last_rotation: clock.now(),
        };
        let opened = state.open(clock.as_ref(), true).is_ok();
        if !opened {
            state.close();
        }

        let sink = Self {
            name,
            clock,
            state: Arc::new(Mutex::new(state)),
            open: AtomicBool::new(opened),
            cleanup: Mutex::new(None),
        };
        if options.start_cleanup {
            let _ = sink.start_cleanup_thread();
        }
        sink
    }

    fn sync_open_flag(&self, state: &FileState) {
        self.open.store(state.is_open(), Ordering::Release);
    }

    /// Forces a rotation now.
    pub fn rotate(&self) -> io::Result<()> {
        let mut st = self.state.lock();
        let res = st.rotate(self.clock.as_ref());
        self.sync_open_flag(&st);
        res
    }

    /// Closes the current file and opens a freshly stamped one.
    pub fn reopen(&self) -> io::Result<()> {
        let mut st = self.state.lock();
        let res = st.open(self.clock.as_ref(), true);
        if res.is_err() {
            st.close();
        }
        self.sync_open_flag(&st);
        res
    }

    /// Moves the sink under a new base directory. On failure the sink stays
    /// closed and reports unavailable.
    pub fn set_base_dir(&self, base_dir: impl Into<PathBuf>) -> io::Result<()> {
        let mut st = self.state.lock();
        st.close();
        st.base_dir = base_dir.into();
        st.series = None;
        st.current_path = None;
        let res = st.open(self.clock.as_ref(), true);
        self.sync_open_flag(&st);
        res
    }

    pub fn set_log_type(&self, log_type: LogType) -> io::Result<()> {
        let mut st = self.state.lock();
        st.close();
        st.log_type = log_type;
        st.series = None;
        st.current_path = None;
        let res = st.open(self.clock.as_ref(), true);
        self.sync_open_flag(&st);
        res
    }

    /// Replaces the policy; a running cleanup thread is restarted so that a
    /// new interval takes effect.
    pub fn set_rotation_policy(&self, policy: RotationPolicy) {
        self.state.lock().policy = policy;
        let running = self
            .cleanup
            .lock()
            .as_ref()
            .is_some_and(CleanupWorker::is_running);
        if running {
            self.stop_cleanup_thread();
            let _ = self.start_cleanup_thread();
        }
    }

    #[must_use]
    pub fn rotation_policy(&self) -> RotationPolicy {
        self.state.lock().policy.clone()
    }

    pub fn set_auto_flush(&self, enable: bool) {
        self.state.lock().auto_flush = enable;
    }

    #[must_use]
    pub fn current_path(&self) -> Option<PathBuf> {
        self.state.lock().current_path.clone()
    }

    #[must_use]
    pub fn log_dir(&self) -> PathBuf {
        self.state.lock().log_dir()
    }

    /// Bytes written to the current file since it was opened or rotated.
    #[must_use]
    pub fn current_size(&self) -> u64 {
        self.state.lock().current_bytes
    }

    /// One cleanup pass: deletes this type's files older than `max_age`,
    /// leaving the current file alone. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        purge_expired(&self.state, self.clock.as_ref())
    }

    pub fn start_cleanup_thread(&self) -> io::Result<()> {
        let mut slot = self.cleanup.lock();
        if slot.as_ref().is_some_and(CleanupWorker::is_running) {
            return Ok(());
        }
        let interval = self.state.lock().policy.cleanup_interval;
        let state = self.state.clone();
        let clock = self.clock.clone();
        let worker = CleanupWorker::spawn("log-cleanup", interval, move || {
            purge_expired(&state, clock.as_ref());
        })?;
        *slot = Some(worker);
        Ok(())
    }

    pub fn stop_cleanup_thread(&self) {
        let worker = self.cleanup.lock().take();
        if let Some(mut worker) = worker {
            worker.stop();
        }
    }

    #[must_use]
    pub fn is_cleanup_running(&self) -> bool {
        self.cleanup
            .lock()
            .as_ref()
            .is_some_and(CleanupWorker::is_running)
    }
}

fn purge_expired(state: &Mutex<FileState>, clock: &dyn Clock) -> usize {
    let (dir, prefix, current, max_age) = {
        let st = state.lock();
        (
            st.log_dir(),
            st.log_type.file_prefix(),
            st.current_path.clone(),
            st.policy.max_age,
        )
    };
    let now = clock.now();

    let Ok(entries) = fs::read_dir(&dir) else {
        return 0;
    };
    let mut removed = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        if is_expired(&path, &prefix, current.as_deref(), now, max_age) && fs::remove_file(&path).is_ok()
        {
            removed += 1;
        }
    }
    removed
}

fn is_expired(
    path: &Path,
    prefix: &str,
    current: Option<&Path>,
    now: SystemTime,
    max_age: Duration,
) -> bool {
    if Some(path) == current {
        return false;
    }
    let named = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with(prefix));
    if !named {
        return false;
    }
    let Ok(meta) = fs::metadata(path) else {
        return false;
    };
    if !meta.is_file() {
        return false;
    }
    meta.modified()
        .ok()
        .and_then(|mtime| now.duration_since(mtime).ok())
        .is_some_and(|age| age > max_age)
}

impl LogSink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn log(&self, _level: LogLevel, text: &str) -> Result<(), SinkError> {
        let mut st = self.state.lock();
        let clock = self.clock.as_ref();

        if !st.is_open() {
            let res = st.open(clock, true);
            if res.is_err() {
                st.close();
            }
            self.sync_open_flag(&st);
            res?;
        }

        if st.should_rotate(text.len() as u64 + 1, clock.now()) {
            let res = st.rotate(clock);
            self.sync_open_flag(&st);
            res?;
        }

        let res = st.write_record(text);
        if res.is_err() {
            st.close();
            self.sync_open_flag(&st);
        }
        res.map_err(SinkError::from)
    }

    fn flush(&self) {
        if let Some(file) = self.state.lock().file.as_mut() {
            let _ = file.flush();
        }
    }

    /// Closed sinks retry an open here when their lock is free.
    fn is_available(&self) -> bool {
        if self.open.load(Ordering::Acquire) {
            return true;
        }
        let Some(mut st) = self.state.try_lock() else {
            return false;
        };
        if st.open(self.clock.as_ref(), true).is_err() {
            st.close();
        }
        self.sync_open_flag(&st);
        st.is_open()
    }
}

impl Drop for FileSink {
    fn drop(&mut self) {
        self.stop_cleanup_thread();
        self.state.lock().close();
    }
}
