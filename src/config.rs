//! Explicit engine configuration, threaded through [`Graph::init`](crate::graph::Graph::init).
//!
//! Spec.md §9's design note resolves the C++ source's module-level
//! singletons (device map, inference-creator map, edge-creator map) in
//! favor of an explicit struct passed in at construction time, for
//! testability. `EngineConfig` is the part of that resolution the DAG
//! runtime itself needs: worker counts and queue sizing, not the
//! back-end/device registries that live outside this crate's scope.

use crate::pool::DEFAULT_IDLE_WAIT;
use std::time::Duration;

/// Default worker count for [`crate::engine::parallel_task::ParallelTaskEngine`]
/// (spec.md §4.10).
pub const DEFAULT_TASK_WORKERS: usize = 4;

/// Tunables for engine construction, passed explicitly rather than read
/// from ambient global state.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Worker count for the parallel-task engine's thread pool. The
    /// parallel-pipeline engine always sizes its pool to the run-node
    /// count (spec.md §4.11), so this field doesn't apply there.
    pub task_workers: usize,
    /// Default bound on a `Pipeline` edge's in-flight packet count
    /// (spec.md §4.5), used when an edge doesn't specify its own.
    pub queue_max_size: usize,
    /// Idle-wait timeout for thread-pool workers with no local or
    /// stealable work (spec.md §4.2).
    pub worker_idle_wait: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            task_workers: DEFAULT_TASK_WORKERS,
            queue_max_size: crate::edge::DEFAULT_QUEUE_MAX_SIZE,
            worker_idle_wait: DEFAULT_IDLE_WAIT,
        }
    }
}

impl EngineConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_task_workers(mut self, n: usize) -> Self {
        self.task_workers = n;
        self
    }

    #[must_use]
    pub fn with_queue_max_size(mut self, n: usize) -> Self {
        self.queue_max_size = n;
        self
    }

    #[must_use]
    pub fn with_worker_idle_wait(mut self, d: Duration) -> Self {
        self.worker_idle_wait = d;
        self
    }
}
