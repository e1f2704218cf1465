//! A single-writer, many-reader work-stealing deque.
//!
//! Guarded by one [`Mutex`]; every operation uses `try_lock` and never
//! blocks. The owning worker pushes and pops from the front (FIFO for the
//! owner); thieves pop from the back (LIFO for thieves), which keeps
//! contention between the owner and a thief low since they work opposite
//! ends of the same deque.
//!
//! Grounded on the C++ source's `rayshape::threadpool::SafeWSQueue`
//! (`try_lock`-guarded `std::deque`, front-pop for the owner, back-pop for
//! thieves).

use std::collections::VecDeque;
use std::sync::Mutex;

pub struct WsDeque<T> {
    inner: Mutex<VecDeque<T>>,
}

impl<T> Default for WsDeque<T> {
    fn default() -> Self {
        Self { inner: Mutex::new(VecDeque::new()) }
    }
}

impl<T> WsDeque<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Push `task` to the back. Fails (returning `task` back to the
    /// caller) only if the lock is currently held; the caller is expected
    /// to yield and retry.
    pub fn try_push(&self, task: T) -> Result<(), T> {
        match self.inner.try_lock() {
            Ok(mut guard) => {
                guard.push_back(task);
                Ok(())
            }
            Err(_) => Err(task),
        }
    }

    /// Pop from the front -- FIFO order for the deque's owner.
    pub fn try_pop(&self) -> Option<T> {
        self.inner.try_lock().ok().and_then(|mut guard| guard.pop_front())
    }

    /// Pop from the back -- LIFO order for a thief.
    pub fn try_steal(&self) -> Option<T> {
        self.inner.try_lock().ok().and_then(|mut guard| guard.pop_back())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.try_lock().map(|g| g.is_empty()).unwrap_or(false)
    }
}
