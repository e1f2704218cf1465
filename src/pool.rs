//! Fixed-size work-stealing thread pool.
//!
//! Each worker owns a [`WsDeque`] of boxed tasks. `commit` submits work
//! round-robin across workers; a worker's loop is local-pop, then steal
//! from peers (starting at `self+1`, wrapping), then a timed wait on its
//! own condvar so it notices new work even if a wakeup was missed.
//!
//! Grounded on the C++ source's `rayshape::threadpool::{ThreadPool,
//! LocalThread}` (round-robin `Commit`, `PushTask`/steal loop) and on
//! `other_examples/...crayon__src-sched-scheduler.rs.rs`'s `Signal(Mutex<()>,
//! Condvar)` wrapper for the idle wait.

use crate::deque::WsDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

type Task = Box<dyn FnOnce() + Send + 'static>;

/// Default idle-wait timeout for a worker with no local or stealable work.
pub const DEFAULT_IDLE_WAIT: Duration = Duration::from_millis(100);

struct Signal {
    mutex: Mutex<()>,
    cv: Condvar,
}

impl Signal {
    fn new() -> Self {
        Self { mutex: Mutex::new(()), cv: Condvar::new() }
    }

    fn wait_timeout(&self, dur: Duration) {
        let guard = self.mutex.lock().unwrap();
        let _ = self.cv.wait_timeout(guard, dur).unwrap();
    }

    fn notify_one(&self) {
        self.cv.notify_one();
    }
}

struct Worker {
    index: usize,
    deque: WsDeque<Task>,
    signal: Signal,
}

/// A handle to a value produced by a task submitted via [`ThreadPool::commit`].
///
/// Blocking on [`JoinFuture::join`] waits for the task to run on whichever
/// worker it was committed to; it never runs the task on the calling
/// thread.
pub struct JoinFuture<R> {
    inner: Arc<(Mutex<Option<R>>, Condvar)>,
}

impl<R> JoinFuture<R> {
    #[must_use]
    pub fn join(self) -> R {
        let (lock, cv) = &*self.inner;
        let mut guard = lock.lock().unwrap();
        while guard.is_none() {
            guard = cv.wait(guard).unwrap();
        }
        guard.take().unwrap()
    }
}

pub struct ThreadPool {
    workers: Vec<Arc<Worker>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    running: Arc<AtomicBool>,
    next: AtomicUsize,
    idle_wait: Duration,
}

impl ThreadPool {
    /// Build and start a pool of `size` workers (minimum 1).
    #[must_use]
    pub fn new(size: usize) -> Self {
        Self::with_idle_wait(size, DEFAULT_IDLE_WAIT)
    }

    #[must_use]
    pub fn with_idle_wait(size: usize, idle_wait: Duration) -> Self {
        let size = size.max(1);
        let running = Arc::new(AtomicBool::new(true));
        let workers: Vec<Arc<Worker>> = (0..size)
            .map(|i| Arc::new(Worker { index: i, deque: WsDeque::new(), signal: Signal::new() }))
            .collect();

        let mut handles = Vec::with_capacity(size);
        for i in 0..size {
            let workers = workers.clone();
            let running = running.clone();
            handles.push(
                thread::Builder::new()
                    .name(format!("kernel-worker-{i}"))
                    .spawn(move || worker_loop(i, workers, running, idle_wait))
                    .expect("failed to spawn worker thread"),
            );
        }

        tracing::debug!(size, "thread pool started");
        Self { workers, handles: Mutex::new(handles), running, next: AtomicUsize::new(0), idle_wait }
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Submit a zero-argument callable. Picks the target worker by a
    /// monotonically incrementing counter modulo `size` and pushes to it,
    /// retrying with a yield until the push is accepted (the deque's lock
    /// is only ever held for the duration of a push/pop, so this converges
    /// quickly).
    pub fn commit<F, R>(&self, f: F) -> JoinFuture<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let slot = Arc::new((Mutex::new(None), Condvar::new()));
        let slot_for_task = slot.clone();

        let task: Task = Box::new(move || {
            let result = match catch_unwind(AssertUnwindSafe(f)) {
                Ok(r) => r,
                Err(payload) => {
                    // Re-raise after bookkeeping is impossible here since R is
                    // arbitrary; callers that need panic-to-Error conversion
                    // use `commit_fallible` instead. Plain `commit` propagates
                    // the panic by resuming it on the worker thread, which
                    // terminates that worker -- matching "propagates as a
                    // fatal engine error" at the engine layer, which always
                    // goes through `commit_fallible`.
                    std::panic::resume_unwind(payload);
                }
            };
            let (lock, cv) = &*slot_for_task;
            *lock.lock().unwrap() = Some(result);
            cv.notify_one();
        });

        let idx = self.next.fetch_add(1, Ordering::Relaxed) % self.workers.len();
        self.push_to(idx, task);

        JoinFuture { inner: slot }
    }

    /// Like [`ThreadPool::commit`], but catches a panic inside `f` and
    /// converts it to `Err(E)` via `on_panic`, instead of unwinding the
    /// worker thread. Engines use this so a panicking node becomes a fatal
    /// engine error rather than silently killing a worker.
    pub fn commit_fallible<F, R, E>(&self, f: F, on_panic: impl Fn() -> E + Send + 'static) -> JoinFuture<Result<R, E>>
    where
        F: FnOnce() -> Result<R, E> + Send + 'static,
        R: Send + 'static,
        E: Send + 'static,
    {
        self.commit(move || match catch_unwind(AssertUnwindSafe(f)) {
            Ok(r) => r,
            Err(_) => Err(on_panic()),
        })
    }

    fn push_to(&self, idx: usize, mut task: Task) {
        loop {
            match self.workers[idx].deque.try_push(task) {
                Ok(()) => {
                    self.workers[idx].signal.notify_one();
                    return;
                }
                Err(t) => {
                    task = t;
                    thread::yield_now();
                }
            }
        }
    }

    /// Joins all workers. Infallible after the first call; subsequent
    /// calls are a no-op.
    pub fn deinit(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            for w in &self.workers {
                w.signal.notify_one();
            }
            let mut handles = self.handles.lock().unwrap();
            for h in handles.drain(..) {
                let _ = h.join();
            }
            tracing::debug!("thread pool stopped");
        }
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.deinit();
    }
}

fn worker_loop(index: usize, workers: Vec<Arc<Worker>>, running: Arc<AtomicBool>, idle_wait: Duration) {
    let me = &workers[index];
    let n = workers.len();

    while running.load(Ordering::SeqCst) {
        if let Some(task) = me.deque.try_pop() {
            task();
            continue;
        }

        let mut stolen = None;
        for offset in 1..n {
            let peer = (index + offset) % n;
            if let Some(task) = workers[peer].deque.try_steal() {
                stolen = Some(task);
                break;
            }
        }
        if let Some(task) = stolen {
            task();
            continue;
        }

        me.signal.wait_timeout(idle_wait);
    }

    // Drain remaining local work before exiting so `deinit` doesn't drop
    // unstarted tasks.
    while let Some(task) = me.deque.try_pop() {
        task();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize as StdAtomicUsize;

    #[test]
    fn commit_resolves_return_value() {
        let pool = ThreadPool::new(4);
        let fut = pool.commit(|| 2 + 2);
        assert_eq!(fut.join(), 4);
        pool.deinit();
    }

    #[test]
    fn no_task_loss_under_load() {
        let pool = ThreadPool::new(4);
        let counter = Arc::new(StdAtomicUsize::new(0));
        let futures: Vec<_> = (0..200)
            .map(|_| {
                let counter = counter.clone();
                pool.commit(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                })
            })
            .collect();
        for f in futures {
            f.join();
        }
        assert_eq!(counter.load(Ordering::SeqCst), 200);
        pool.deinit();
    }

    #[test]
    fn deinit_is_idempotent() {
        let pool = ThreadPool::new(2);
        pool.deinit();
        pool.deinit();
    }

    #[test]
    fn commit_fallible_converts_panic() {
        let pool = ThreadPool::new(2);
        let fut = pool.commit_fallible(
            || -> Result<i32, String> { panic!("boom") },
            || "panicked".to_string(),
        );
        assert_eq!(fut.join(), Err("panicked".to_string()));
        pool.deinit();
    }
}
