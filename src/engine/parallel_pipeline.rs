//! Software-pipeline engine: one persistent worker thread per run-node,
//! each looping `update_input` -> `run` until its inputs signal
//! termination (spec.md §4.11).
//!
//! Grounded on
//! `original_source/kernel/src/dag/engine/parallel_pipeline_engine.cc`:
//! `Init` validates the run-node subgraph with `TopoSortDFS`, sizes the
//! thread pool to the run-node count, and commits one persistent loop per
//! node. `DeInit` unblocks every worker by requesting termination on
//! every edge before joining the pool -- the reverse of the order the C++
//! source uses, since in this implementation a worker can be parked
//! indefinitely inside `Edge::update` and joining first would deadlock;
//! this reordering is recorded in `DESIGN.md`.
//!
//! `run_size_` in the original is a single engine-level counter that
//! `Run()` increments on every call; `Synchronize()` blocks until every
//! node's own completed-run count has caught up to it. This is *not* a
//! per-node counter -- an earlier draft of this port compared each node's
//! own `run_size`/`completed_size` pair instead, which races (a node can
//! re-enter its next iteration and bump its own `run_size` again before a
//! waiting `synchronize()` gets scheduled to observe the momentary
//! equality). Keeping one shared counter here removes that race.

use crate::edge::Edge;
use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::graph::Graph;
use crate::mode::UpdateFlag;
use crate::node::NodeEntry;
use crate::node_id::NodeId;
use crate::pool::ThreadPool;
use crate::topo::topo_sort_dfs;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};

struct PipelineRunState {
    cv_mutex: Mutex<()>,
    cv: Condvar,
    status: Mutex<Option<Error>>,
    /// Bumped once per [`Engine::run`] call; `synchronize()` waits until
    /// every node's `completed_size()` has reached this value.
    run_size: AtomicUsize,
}

pub struct ParallelPipelineEngine {
    pool: Mutex<Option<ThreadPool>>,
    nodes: Mutex<Vec<(NodeId, Arc<NodeEntry>)>>,
    state: Arc<PipelineRunState>,
    idle_wait: std::time::Duration,
}

impl ParallelPipelineEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::with_idle_wait(crate::pool::DEFAULT_IDLE_WAIT)
    }

    #[must_use]
    pub fn with_idle_wait(idle_wait: std::time::Duration) -> Self {
        Self {
            pool: Mutex::new(None),
            nodes: Mutex::new(Vec::new()),
            state: Arc::new(PipelineRunState {
                cv_mutex: Mutex::new(()),
                cv: Condvar::new(),
                status: Mutex::new(None),
                run_size: AtomicUsize::new(0),
            }),
            idle_wait,
        }
    }
}

impl Default for ParallelPipelineEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn notify(state: &PipelineRunState) {
    let _guard = state.cv_mutex.lock().unwrap();
    state.cv.notify_all();
}

fn record_failure(state: &PipelineRunState, e: Error) {
    let mut status = state.status.lock().unwrap();
    if status.is_none() {
        *status = Some(e);
    }
}

/// Runs `id` until its inputs report `Terminate`, a run fails, or the
/// node panics -- the last two also request termination on the node's
/// own output edges, so the failure drains downstream instead of hanging
/// the rest of the pipeline.
fn node_worker_loop(graph: Graph, id: NodeId, entry: Arc<NodeEntry>, state: Arc<PipelineRunState>) {
    loop {
        let edges: Vec<Arc<Edge>> = graph.edges_for(&entry.inputs());

        let flag = entry.update_input(id, &edges);
        if flag == UpdateFlag::Terminate {
            notify(&state);
            break;
        }

        entry.set_running(true);
        let result = catch_unwind(AssertUnwindSafe(|| entry.run()));
        entry.set_running(false);
        notify(&state);

        match result {
            Ok(Ok(())) => {
                if graph.edges_for(&entry.outputs()).iter().any(|e| e.is_terminated()) {
                    break;
                }
            }
            Ok(Err(e)) => {
                tracing::error!(node = entry.name(), error = %e, "pipeline node failed; terminating downstream edges");
                for output in graph.edges_for(&entry.outputs()) {
                    output.request_terminate();
                }
                record_failure(&state, Error::NodeExecutionFailed(entry.name().to_string(), e.to_string()));
                break;
            }
            Err(_) => {
                tracing::error!(node = entry.name(), "pipeline node panicked; terminating downstream edges");
                for output in graph.edges_for(&entry.outputs()) {
                    output.request_terminate();
                }
                record_failure(&state, Error::NodePanicked(entry.name().to_string()));
                break;
            }
        }
    }
}

impl Engine for ParallelPipelineEngine {
    fn init(&mut self, graph: &Graph, run_nodes: Vec<NodeId>) -> Result<()> {
        for &id in &run_nodes {
            graph.node(id).init(id)?;
        }

        // Validate the run-node subgraph is acyclic before committing any
        // persistent worker; a cycle here would otherwise only surface as
        // every worker blocking forever.
        topo_sort_dfs(&graph.entries())?;

        let nodes: Vec<(NodeId, Arc<NodeEntry>)> = run_nodes.iter().map(|&id| (id, graph.node(id))).collect();

        let pool = ThreadPool::with_idle_wait(nodes.len().max(1), self.idle_wait);
        for (id, entry) in &nodes {
            let graph = graph.clone();
            let entry = entry.clone();
            let id = *id;
            let state = self.state.clone();
            pool.commit(move || node_worker_loop(graph, id, entry, state));
        }

        *self.nodes.lock().unwrap() = nodes;
        *self.pool.lock().unwrap() = Some(pool);
        Ok(())
    }

    /// Workers are already running continuously once `init` returns; `run`
    /// just bumps the engine-level frame counter `synchronize()` waits on
    /// (spec.md §4.11: "`run_size` is a graph-level counter incremented
    /// each `run()` call; there is no per-frame join").
    fn run(&self, _graph: &Graph) -> Result<()> {
        self.state.run_size.fetch_add(1, Ordering::SeqCst);
        let _guard = self.state.cv_mutex.lock().unwrap();
        self.state.cv.notify_all();
        Ok(())
    }

    /// Blocks until every run-node's `completed_size()` has reached the
    /// current `run_size` (spec.md §4.11). Reads `run_size` live on each
    /// wake, so a concurrent `run()` call raising the bar is honored
    /// rather than racing against a snapshot taken at entry.
    fn synchronize(&self) -> Result<()> {
        let nodes = self.nodes.lock().unwrap().clone();
        let mut guard = self.state.cv_mutex.lock().unwrap();
        loop {
            let target = self.state.run_size.load(Ordering::SeqCst);
            if nodes.iter().all(|(_, e)| e.completed_size() >= target) {
                break;
            }
            guard = self.state.cv.wait(guard).unwrap();
        }
        drop(guard);

        match self.state.status.lock().unwrap().take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn deinit(&self, graph: &Graph) -> Result<()> {
        // Per spec.md §4.11, `deinit` first synchronizes on whatever frame
        // was last submitted (a no-op wait if `run` was never called, since
        // `run_size` is then still 0) before tearing workers down.
        let sync_result = self.synchronize();

        for edge in graph.all_edges() {
            edge.request_terminate();
        }

        if let Some(pool) = self.pool.lock().unwrap().take() {
            pool.deinit();
        }

        let nodes = self.nodes.lock().unwrap().clone();
        for (_, entry) in nodes {
            entry.deinit()?;
        }

        match self.state.status.lock().unwrap().take() {
            Some(e) => Err(e),
            None => sync_result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;
    use crate::mode::ParallelMode;
    use crate::node::Node;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    /// Writes `next`, `next + 1`, ... to its output edge as fast as
    /// backpressure allows. Has no input edges, so `update_input` is
    /// always `Complete`; it relies on the engine's "my output got
    /// terminated" check (see `node_worker_loop`) to exit once
    /// `deinit` requests termination.
    struct Produce {
        edge: Arc<Edge>,
        next: i32,
    }
    impl Node for Produce {
        fn run(&mut self) -> crate::error::Result<()> {
            self.edge.set_value(self.next);
            self.next += 1;
            Ok(())
        }
    }

    /// Pops one item per iteration with an artificial 1ms delay, mirroring
    /// spec.md S4's "C consumes with 1 ms delay".
    struct Collect {
        edge: Arc<Edge>,
        id: NodeId,
        out: Arc<StdMutex<Vec<i32>>>,
    }
    impl Node for Collect {
        fn bind(&mut self, id: NodeId) {
            self.id = id;
        }
        fn run(&mut self) -> crate::error::Result<()> {
            if let Some(packet) = self.edge.get(self.id) {
                if let Some(v) = packet.get::<i32>() {
                    self.out.lock().unwrap().push(*v);
                }
            }
            std::thread::sleep(Duration::from_millis(1));
            Ok(())
        }
    }

    #[test]
    fn bounded_pipeline_delivers_prefix_in_order() {
        let g = Graph::new("pipe");
        g.set_parallel_type(ParallelMode::Pipeline);

        let e = g.create_edge_with_queue("items", 2).unwrap();
        let edge_handle = g.edge_handle(e);
        g.create_node("producer", Produce { edge: edge_handle.clone(), next: 0 }, vec![], vec![e]).unwrap();

        let collected = Arc::new(StdMutex::new(Vec::new()));
        g.create_node("consumer", Collect { edge: edge_handle, id: NodeId::new(0), out: collected.clone() }, vec![e], vec![]).unwrap();

        g.init().unwrap();

        // "Submit" 20 frames: each `run()` bumps the engine's frame
        // counter; `synchronize()` then blocks until every node (producer
        // included, via the FIFO edge's no-loss invariant) has completed
        // at least that many iterations.
        for _ in 0..20 {
            g.run().unwrap();
        }
        g.synchronize().unwrap();

        let got = collected.lock().unwrap().clone();
        assert!(got.len() >= 20, "expected at least 20 items, got {}", got.len());
        assert_eq!(&got[..20], (0..20).collect::<Vec<_>>().as_slice());

        g.deinit().unwrap();
    }

    #[test]
    fn queue_never_exceeds_its_bound() {
        let g = Graph::new("pipe-bounded");
        g.set_parallel_type(ParallelMode::Pipeline);

        let e = g.create_edge_with_queue("items", 2).unwrap();
        let edge_handle = g.edge_handle(e);
        g.create_node("producer", Produce { edge: edge_handle.clone(), next: 0 }, vec![], vec![e]).unwrap();
        let collected = Arc::new(StdMutex::new(Vec::new()));
        g.create_node("consumer", Collect { edge: edge_handle.clone(), id: NodeId::new(0), out: collected }, vec![e], vec![]).unwrap();

        g.init().unwrap();
        for _ in 0..10 {
            std::thread::sleep(Duration::from_millis(1));
            assert!(edge_handle.queue_len() <= 2, "edge exceeded queue_max_size");
        }
        g.deinit().unwrap();
    }
}
