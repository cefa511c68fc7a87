use std::{
    io,
    sync::Arc,
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use parking_lot::{Condvar, Mutex};

/// Longest single sleep between cancellation checks.
const SLICE: Duration = Duration::from_secs(60);

struct Signal {
    stop: Mutex<bool>,
    wake: Condvar,
}

/// Periodic background task with prompt cancellation.
///
/// The worker sleeps for `interval` in slices of at most one minute, checking
/// the stop flag between slices, then runs the task. `stop` wakes it
/// immediately and joins.
pub struct CleanupWorker {
    signal: Arc<Signal>,
    handle: Option<JoinHandle<()>>,
}

impl CleanupWorker {
    pub fn spawn<F>(name: &str, interval: Duration, mut task: F) -> io::Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let signal = Arc::new(Signal {
            stop: Mutex::new(false),
            wake: Condvar::new(),
        });
        let thread_signal = signal.clone();

        let handle = thread::Builder::new().name(name.into()).spawn(move || {
            loop {
                if !sleep_interval(&thread_signal, interval) {
                    break;
                }
                task();
            }
        })?;

        Ok(Self {
            signal,
            handle: Some(handle),
        })
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn stop(&mut self) {
        *self.signal.stop.lock() = true;
        self.signal.wake.notify_all();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for CleanupWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Sleeps for `interval` in slices. Returns `false` if asked to stop.
fn sleep_interval(signal: &Signal, interval: Duration) -> bool {
    let deadline = Instant::now() + interval;
    let mut stop = signal.stop.lock();
    loop {
        if *stop {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        let slice = (deadline - now).min(SLICE);
        let _ = signal.wake.wait_for(&mut stop, slice);
    }
}
