use std::{
    io,
    panic::{self, AssertUnwindSafe},
    sync::{
        Arc,
        atomic::{AtomicU8, AtomicU64, Ordering},
        mpsc::{self, Receiver, Sender, SyncSender, TrySendError},
    },
    thread::{self, JoinHandle, ThreadId},
    time::Duration,
};

use parking_lot::{Condvar, Mutex};

/// Lifecycle of the async worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum QueueState {
    Stopped = 0,
    Running = 1,
    Draining = 2,
}

impl QueueState {
    const fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Running,
            2 => Self::Draining,
            _ => Self::Stopped,
        }
    }
}

enum QueueTx<T> {
    Bounded(SyncSender<T>),
    Unbounded(Sender<T>),
}

/// Items accepted but not yet processed by the worker.
struct Pending {
    count: Mutex<usize>,
    idle: Condvar,
}

impl Pending {
    fn incr(&self) {
        *self.count.lock() += 1;
    }

    fn decr(&self) {
        let mut count = self.count.lock();
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.idle.notify_all();
        }
    }
}

/// FIFO queue drained by one dedicated worker thread.
///
/// A capacity of `0` means unbounded. When a bounded queue is full, `push`
/// drops the item and bumps the drop counter instead of blocking.
pub struct AsyncQueue<T: Send + 'static> {
    tx: Mutex<Option<QueueTx<T>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    worker_id: ThreadId,
    state: Arc<AtomicU8>,
    pending: Arc<Pending>,
    dropped: AtomicU64,
    capacity: usize,
}

impl<T: Send + 'static> AsyncQueue<T> {
    /// Spawns the worker thread `name`; `process` runs once per item, in
    /// push order.
    pub fn start<F>(name: &str, capacity: usize, mut process: F) -> io::Result<Self>
    where
        F: FnMut(T) + Send + 'static,
    {
        let (tx, rx): (QueueTx<T>, Receiver<T>) = if capacity == 0 {
            let (tx, rx) = mpsc::channel();
            (QueueTx::Unbounded(tx), rx)
        } else {
            let (tx, rx) = mpsc::sync_channel(capacity);
            (QueueTx::Bounded(tx), rx)
        };

        let pending = Arc::new(Pending {
            count: Mutex::new(0),
            idle: Condvar::new(),
        });
        let state = Arc::new(AtomicU8::new(QueueState::Running as u8));

        let worker_pending = pending.clone();
        let worker_state = state.clone();
        let worker = thread::Builder::new().name(name.into()).spawn(move || {
            while let Ok(item) = rx.recv() {
                // A panicking processor loses this item only.
                let _ = panic::catch_unwind(AssertUnwindSafe(|| process(item)));
                worker_pending.decr();
            }
            worker_state.store(QueueState::Stopped as u8, Ordering::Release);
        })?;

        Ok(Self {
            tx: Mutex::new(Some(tx)),
            worker_id: worker.thread().id(),
            worker: Mutex::new(Some(worker)),
            state,
            pending,
            dropped: AtomicU64::new(0),
            capacity,
        })
    }

    /// Enqueues `item`. Returns `false` if it was dropped (queue full or
    /// already stopping).
    pub fn push(&self, item: T) -> bool {
        let guard = self.tx.lock();
        let Some(tx) = guard.as_ref() else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        };

        self.pending.incr();
        let sent = match tx {
            QueueTx::Bounded(tx) => match tx.try_send(item) {
                Ok(()) => true,
                Err(TrySendError::Full(_) | TrySendError::Disconnected(_)) => false,
            },
            QueueTx::Unbounded(tx) => tx.send(item).is_ok(),
        };
        if !sent {
            self.pending.decr();
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        sent
    }

    /// Whether the caller is running on this queue's worker thread.
    #[must_use]
    pub fn on_worker(&self) -> bool {
        thread::current().id() == self.worker_id
    }

    /// Blocks until every accepted item has been processed. On the worker
    /// thread itself this returns at once, since the item being processed
    /// can only finish after the caller does.
    pub fn wait_idle(&self) {
        if self.on_worker() {
            return;
        }
        let mut count = self.pending.count.lock();
        while *count > 0 {
            self.pending.idle.wait(&mut count);
        }
    }

    /// Like [`wait_idle`](Self::wait_idle) with an upper bound. Returns `true`
    /// if the queue went idle in time.
    pub fn wait_idle_for(&self, timeout: Duration) -> bool {
        if self.on_worker() {
            return false;
        }
        let mut count = self.pending.count.lock();
        while *count > 0 {
            if self.pending.idle.wait_for(&mut count, timeout).timed_out() {
                return *count == 0;
            }
        }
        true
    }

    /// Stops accepting items, lets the worker drain what is queued, and joins
    /// it. Safe to call more than once. Called from the worker itself it only
    /// closes the queue; the worker exits once the backlog is done.
    pub fn stop(&self) {
        let tx = self.tx.lock().take();
        if tx.is_none() {
            return;
        }
        self.state
            .store(QueueState::Draining as u8, Ordering::Release);
        // Dropping the last sender ends the worker's recv loop after the backlog.
        drop(tx);
        if self.on_worker() {
            return;
        }
        if let Some(handle) = self.worker.lock().take() {
            let _ = handle.join();
        }
        self.state.store(QueueState::Stopped as u8, Ordering::Release);
    }

    #[must_use]
    pub fn state(&self) -> QueueState {
        QueueState::from_u8(self.state.load(Ordering::Acquire))
    }

    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn pending(&self) -> usize {
        *self.pending.count.lock()
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<T: Send + 'static> Drop for AsyncQueue<T> {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use std::sync::mpsc as std_mpsc;

    #[test]
    fn processes_in_push_order_and_drains_on_stop() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_w = seen.clone();
        let q = AsyncQueue::start("test-queue", 0, move |n: u32| seen_w.lock().push(n)).unwrap();
        assert_eq!(q.state(), QueueState::Running);
        for i in 0..500 {
            assert!(q.push(i));
        }
        q.stop();
        assert_eq!(q.state(), QueueState::Stopped);
        assert_eq!(*seen.lock(), (0..500).collect::<Vec<_>>());
        assert!(!q.push(1), "stopped queue refuses items");
        assert_eq!(q.dropped(), 1);
    }

    #[test]
    fn full_bounded_queue_drops_without_blocking() {
        let (gate_tx, gate_rx) = std_mpsc::channel::<()>();
        let gate_rx = Mutex::new(gate_rx);
        let q = AsyncQueue::start("gated", 2, move |_: u32| {
            let _ = gate_rx.lock().recv();
        })
        .unwrap();

        // Worker holds at most one item, the channel two more.
        let accepted = (0..10).filter(|i| q.push(*i)).count();
        assert!(accepted <= 3, "accepted {accepted}");
        assert_eq!(q.dropped() as usize, 10 - accepted);

        for _ in 0..accepted {
            gate_tx.send(()).unwrap();
        }
        assert!(q.wait_idle_for(Duration::from_secs(5)));
        assert_eq!(q.pending(), 0);
    }

    #[test]
    fn wait_idle_returns_after_backlog() {
        let count = Arc::new(AtomicU64::new(0));
        let c = count.clone();
        let q = AsyncQueue::start("idle", 64, move |_: ()| {
            c.fetch_add(1, Ordering::Relaxed);
        })
        .unwrap();
        let mut accepted = 0;
        for _ in 0..50 {
            if q.push(()) {
                accepted += 1;
            }
        }
        q.wait_idle();
        assert_eq!(count.load(Ordering::Relaxed), accepted);
    }

    #[test]
    fn waiting_from_the_worker_returns() {
        let slot: Arc<Mutex<Option<Arc<AsyncQueue<u32>>>>> = Arc::new(Mutex::new(None));
        let (done_tx, done_rx) = std_mpsc::channel();
        let s = slot.clone();
        let q = Arc::new(
            AsyncQueue::start("self-wait", 0, move |_: u32| {
                let queue = s.lock().clone();
                if let Some(queue) = queue {
                    assert!(queue.on_worker());
                    queue.wait_idle();
                    queue.stop();
                }
                let _ = done_tx.send(());
            })
            .unwrap(),
        );
        *slot.lock() = Some(q.clone());
        assert!(!q.on_worker());
        assert!(q.push(1));
        done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(!q.push(2));
        q.stop();
        *slot.lock() = None;
    }

    #[test]
    fn panicking_item_does_not_kill_worker() {
        let count = Arc::new(AtomicU64::new(0));
        let c = count.clone();
        let q = AsyncQueue::start("panicky", 0, move |n: u32| {
            assert!(n != 1, "boom");
            c.fetch_add(1, Ordering::Relaxed);
        })
        .unwrap();
        for i in 0..3 {
            q.push(i);
        }
        q.stop();
        assert_eq!(count.load(Ordering::Relaxed), 2);
    }
}
