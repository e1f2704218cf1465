//! [`Node`]: the trait application code implements for one unit of work,
//! and [`NodeEntry`]: the graph-owned metadata wrapping it (spec.md §3
//! "Wrappers", §4.6).
//!
//! Mirrors the teacher's `node.rs` in spirit (a typed execution-IR entry
//! the runtime interprets) but is grounded more directly on
//! `rm-dr-copper/copperd/lib/piper/src/base/node.rs`'s `Node` trait shape,
//! adapted from its async-task model to the plain-thread model spec.md
//! mandates (each node is driven by a dedicated OS thread or a thread-pool
//! task, not a future).

use crate::edge::Edge;
use crate::edge_id::EdgeId;
use crate::error::Result;
use crate::mode::{ParallelMode, UpdateFlag};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Three-color marker used by both topological sort variants (spec.md
/// §4.8) and the parallel-task engine's fork/join bookkeeping (spec.md
/// §4.10).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Color {
    White,
    Gray,
    Black,
}

/// A user-defined unit of work.
///
/// `init`/`deinit` bracket the node's lifetime; `run` executes once per
/// graph run (Sequential/Task) or once per edge-ready iteration
/// (Pipeline). `forward` is the trace-mode construction hook (spec.md
/// §4.6, §4.7): implement it to build output edges dynamically instead of
/// declaring them upfront via [`crate::graph::Graph::create_node`].
///
/// Implementations are driven from whichever thread the selected engine
/// assigns -- never concurrently with themselves, but engines do not
/// require `Sync` since only one thread ever touches a given node's trait
/// object at a time (enforced by [`NodeEntry`]'s internal mutex).
pub trait Node: Send {
    /// Called once, before `init`, with the identity the graph assigned
    /// this node. Implementations that hold their own `Arc<Edge>` handles
    /// (obtained from [`crate::graph::Graph::edge_handle`] at construction
    /// time) cache `id` here so `run` can call [`crate::edge::Edge::get`]
    /// with the right consumer cursor. Default: not needed.
    fn bind(&mut self, _id: crate::node_id::NodeId) {}

    fn init(&mut self) -> Result<()> {
        Ok(())
    }

    fn deinit(&mut self) -> Result<()> {
        Ok(())
    }

    fn run(&mut self) -> Result<()>;

    /// Trace-mode construction hook. Default: not implemented, matching
    /// the C++ source's `is_forward_api_ok_` sentinel -- callers must
    /// treat `None` as "this node doesn't support tracing" and surface an
    /// empty output vector, not an error (spec.md §4.7's open question
    /// resolution).
    fn forward(&mut self, _inputs: &[EdgeId]) -> Option<Vec<EdgeId>> {
        None
    }

    /// Names for outputs this node declares, used by the graph to build
    /// edges implicitly in trace mode. Default: the node has no declared
    /// output names (it must create its own edges in `forward`).
    fn real_output_names(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Graph-owned metadata for one [`Node`]: name, ownership flag, lifecycle
/// flags, per-run counters, and the predecessor/successor cross-links
/// `Graph::construct` derives (spec.md §3 "Wrappers", §4.7 step 3).
///
/// Never outlives the [`crate::graph::Graph`] that created it; referenced
/// elsewhere only by [`crate::node_id::NodeId`].
pub struct NodeEntry {
    pub(crate) name: String,
    pub(crate) is_external: bool,
    pub(crate) node: Mutex<Box<dyn Node>>,
    pub(crate) inputs: Mutex<Vec<EdgeId>>,
    pub(crate) outputs: Mutex<Vec<EdgeId>>,
    pub(crate) predecessors: Mutex<Vec<crate::node_id::NodeId>>,
    pub(crate) successors: Mutex<Vec<crate::node_id::NodeId>>,
    pub(crate) color: Mutex<Color>,
    pub(crate) parallel_mode: Mutex<ParallelMode>,
    pub(crate) is_init: AtomicBool,
    pub(crate) is_running: AtomicBool,
    pub(crate) trace_flag: AtomicBool,
    pub(crate) run_size: AtomicUsize,
    pub(crate) completed_size: AtomicUsize,
}

impl NodeEntry {
    pub(crate) fn new(name: impl Into<String>, is_external: bool, node: Box<dyn Node>, inputs: Vec<EdgeId>, outputs: Vec<EdgeId>) -> Self {
        Self {
            name: name.into(),
            is_external,
            node: Mutex::new(node),
            inputs: Mutex::new(inputs),
            outputs: Mutex::new(outputs),
            predecessors: Mutex::new(Vec::new()),
            successors: Mutex::new(Vec::new()),
            color: Mutex::new(Color::White),
            parallel_mode: Mutex::new(ParallelMode::None),
            is_init: AtomicBool::new(false),
            is_running: AtomicBool::new(false),
            trace_flag: AtomicBool::new(false),
            run_size: AtomicUsize::new(0),
            completed_size: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn is_external(&self) -> bool {
        self.is_external
    }

    #[must_use]
    pub fn inputs(&self) -> Vec<EdgeId> {
        self.inputs.lock().unwrap().clone()
    }

    #[must_use]
    pub fn outputs(&self) -> Vec<EdgeId> {
        self.outputs.lock().unwrap().clone()
    }

    pub(crate) fn add_output(&self, id: EdgeId) {
        let mut outputs = self.outputs.lock().unwrap();
        if !outputs.contains(&id) {
            outputs.push(id);
        }
    }

    #[must_use]
    pub fn predecessors(&self) -> Vec<crate::node_id::NodeId> {
        self.predecessors.lock().unwrap().clone()
    }

    #[must_use]
    pub fn successors(&self) -> Vec<crate::node_id::NodeId> {
        self.successors.lock().unwrap().clone()
    }

    #[must_use]
    pub fn color(&self) -> Color {
        *self.color.lock().unwrap()
    }

    pub(crate) fn set_color(&self, c: Color) {
        *self.color.lock().unwrap() = c;
    }

    #[must_use]
    pub fn is_init(&self) -> bool {
        self.is_init.load(Ordering::SeqCst)
    }

    pub(crate) fn set_init(&self, v: bool) {
        self.is_init.store(v, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::SeqCst)
    }

    /// `set_running(bool)` from spec.md §4.6: increments `run_size` on the
    /// `false -> true` edge; increments `completed_size` on the
    /// `true -> false` edge.
    pub fn set_running(&self, flag: bool) {
        let was_running = self.is_running.swap(flag, Ordering::SeqCst);
        if flag {
            self.run_size.fetch_add(1, Ordering::SeqCst);
        } else if was_running {
            self.completed_size.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[must_use]
    pub fn run_size(&self) -> usize {
        self.run_size.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn completed_size(&self) -> usize {
        self.completed_size.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn parallel_mode(&self) -> ParallelMode {
        *self.parallel_mode.lock().unwrap()
    }

    pub(crate) fn set_parallel_mode(&self, mode: ParallelMode) {
        *self.parallel_mode.lock().unwrap() = mode;
    }

    #[must_use]
    pub fn trace_flag(&self) -> bool {
        self.trace_flag.load(Ordering::SeqCst)
    }

    pub(crate) fn set_trace_flag(&self, flag: bool) {
        self.trace_flag.store(flag, Ordering::SeqCst);
    }

    pub(crate) fn init(&self, self_id: crate::node_id::NodeId) -> Result<()> {
        if self.is_init() {
            return Ok(());
        }
        let mut node = self.node.lock().unwrap();
        node.bind(self_id);
        node.init()?;
        drop(node);
        self.set_init(true);
        Ok(())
    }

    pub(crate) fn deinit(&self) -> Result<()> {
        if !self.is_init() {
            return Ok(());
        }
        self.node.lock().unwrap().deinit()?;
        self.set_init(false);
        Ok(())
    }

    pub(crate) fn run(&self) -> Result<()> {
        self.node.lock().unwrap().run()
    }

    pub(crate) fn forward(&self, inputs: &[EdgeId]) -> Option<Vec<EdgeId>> {
        self.node.lock().unwrap().forward(inputs)
    }

    #[must_use]
    pub fn real_output_names(&self) -> Vec<String> {
        self.node.lock().unwrap().real_output_names()
    }

    /// `update_input()` from spec.md §4.6: calls `update(self)` on each
    /// input edge in declared order, returning the first non-`Complete`
    /// flag, else `Complete`. This is the suspension point in pipeline
    /// mode -- a `Pipeline` input edge blocks here until data (or
    /// termination) arrives.
    pub(crate) fn update_input(&self, self_id: crate::node_id::NodeId, edges: &[Arc<Edge>]) -> UpdateFlag {
        for edge in edges {
            let flag = edge.update(self_id);
            if flag != UpdateFlag::Complete {
                return flag;
            }
        }
        UpdateFlag::Complete
    }
}
