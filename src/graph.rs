//! [`Graph`]: container of nodes and edges; constructs topology and drives
//! one of the three execution engines (spec.md §4.7).
//!
//! Grounded on the teacher's `src/pipeline.rs` (`Arc<Mutex<Inner>>`-backed
//! graph with `NodeId` handles), generalized from a linear transform chain
//! to an arbitrary DAG with producer/consumer edges, predecessor/successor
//! derivation, and engine selection per
//! `original_source/kernel/src/dag/graph.cc` (the authoritative later copy,
//! per spec.md §9).

use crate::config::EngineConfig;
use crate::edge::Edge;
use crate::edge_id::EdgeId;
use crate::engine::{parallel_pipeline::ParallelPipelineEngine, parallel_task::ParallelTaskEngine, sequential::SequentialEngine, Engine};
use crate::error::{Error, Result};
use crate::mode::ParallelMode;
use crate::node::{Node, NodeEntry};
use crate::node_id::NodeId;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

struct EdgeEntry {
    is_external: bool,
    edge: Arc<Edge>,
}

struct GraphInner {
    name: String,
    nodes: RwLock<Vec<Arc<NodeEntry>>>,
    edges: RwLock<Vec<EdgeEntry>>,
    used_node_names: Mutex<HashSet<String>>,
    used_edge_names: Mutex<HashSet<String>>,
    inputs: Mutex<Vec<EdgeId>>,
    outputs: Mutex<Vec<EdgeId>>,
    parallel_mode: Mutex<ParallelMode>,
    engine: Mutex<Option<Box<dyn Engine>>>,
    is_init: AtomicBool,
    config: EngineConfig,
    anon_counter: AtomicU64,
}

/// Container of nodes and edges. Cheap to clone -- clones share the same
/// underlying arena, since the parallel-pipeline engine needs to hand a
/// handle to each of its persistent per-node worker threads (spec.md §9's
/// "model as an arena" design note).
pub struct Graph {
    inner: Arc<GraphInner>,
}

impl Clone for Graph {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl Graph {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_config(name, EngineConfig::default())
    }

    #[must_use]
    pub fn with_config(name: impl Into<String>, config: EngineConfig) -> Self {
        Self {
            inner: Arc::new(GraphInner {
                name: name.into(),
                nodes: RwLock::new(Vec::new()),
                edges: RwLock::new(Vec::new()),
                used_node_names: Mutex::new(HashSet::new()),
                used_edge_names: Mutex::new(HashSet::new()),
                inputs: Mutex::new(Vec::new()),
                outputs: Mutex::new(Vec::new()),
                parallel_mode: Mutex::new(ParallelMode::None),
                engine: Mutex::new(None),
                is_init: AtomicBool::new(false),
                config,
                anon_counter: AtomicU64::new(0),
            }),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    #[must_use]
    pub(crate) fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn is_init(&self) -> bool {
        self.inner.is_init.load(Ordering::SeqCst)
    }

    pub fn set_parallel_type(&self, mode: ParallelMode) {
        *self.inner.parallel_mode.lock().unwrap() = mode;
    }

    #[must_use]
    pub fn parallel_type(&self) -> ParallelMode {
        *self.inner.parallel_mode.lock().unwrap()
    }

    // --- edge repository -------------------------------------------------

    /// `create_edge(name)` from spec.md §6. An empty name gets an
    /// auto-generated unique one.
    pub fn create_edge(&self, name: impl Into<String>) -> Result<EdgeId> {
        self.create_edge_with_queue(name, self.inner.config.queue_max_size)
    }

    pub fn create_edge_with_queue(&self, name: impl Into<String>, queue_max_size: usize) -> Result<EdgeId> {
        let name = name.into();
        let name = if name.is_empty() {
            format!("edge_{}", self.inner.anon_counter.fetch_add(1, Ordering::SeqCst))
        } else {
            name
        };

        let mut used = self.inner.used_edge_names.lock().unwrap();
        if used.contains(&name) {
            return Err(Error::DuplicateName(name));
        }

        let edge = Arc::new(Edge::with_queue_max_size(name.clone(), queue_max_size));
        let mut edges = self.inner.edges.write().unwrap();
        let id = EdgeId::new(edges.len() as u64);
        edges.push(EdgeEntry { is_external: false, edge });
        used.insert(name);
        Ok(id)
    }

    #[must_use]
    pub(crate) fn edge(&self, id: EdgeId) -> Arc<Edge> {
        self.inner.edges.read().unwrap()[id.raw() as usize].edge.clone()
    }

    #[must_use]
    pub fn edge_name(&self, id: EdgeId) -> String {
        self.edge(id).name().to_string()
    }

    /// Public handle to a registered edge, so a [`crate::node::Node`]
    /// implementation can capture the edges it reads/writes directly as
    /// fields at construction time, instead of routing every access
    /// through `Graph` (spec.md §3: nodes hold direct edge references,
    /// the same way the original source's node constructors do).
    #[must_use]
    pub fn edge_handle(&self, id: EdgeId) -> Arc<Edge> {
        self.edge(id)
    }

    pub(crate) fn edges_for(&self, ids: &[EdgeId]) -> Vec<Arc<Edge>> {
        ids.iter().map(|&id| self.edge(id)).collect()
    }

    // --- node repository ---------------------------------------------------

    fn register_node(&self, name: impl Into<String>, is_external: bool, node: Box<dyn Node>, inputs: Vec<EdgeId>, outputs: Vec<EdgeId>) -> Result<NodeId> {
        let name = name.into();
        let mut used = self.inner.used_node_names.lock().unwrap();
        if used.contains(&name) {
            return Err(Error::DuplicateName(name));
        }

        let mut nodes = self.inner.nodes.write().unwrap();
        let id = NodeId::new(nodes.len() as u64);

        for &input in &inputs {
            self.edge(input).increase_consumers(id);
        }
        for &output in &outputs {
            self.edge(output).increase_producers(id);
        }

        nodes.push(Arc::new(NodeEntry::new(name.clone(), is_external, node, inputs, outputs)));
        used.insert(name);
        Ok(id)
    }

    /// `create_node`: the graph owns and constructs the node in place.
    pub fn create_node<N: Node + 'static>(&self, name: impl Into<String>, node: N, inputs: Vec<EdgeId>, outputs: Vec<EdgeId>) -> Result<NodeId> {
        self.register_node(name, false, Box::new(node), inputs, outputs)
    }

    /// `add_node`: registers an already-constructed node (application
    /// retains the type; the graph still owns storage, per spec.md §9's
    /// arena design note -- `is_external` only changes bookkeeping, not
    /// who frees it in a GC'd language).
    pub fn add_node(&self, name: impl Into<String>, node: Box<dyn Node>, inputs: Vec<EdgeId>, outputs: Vec<EdgeId>) -> Result<NodeId> {
        self.register_node(name, true, node, inputs, outputs)
    }

    #[must_use]
    pub(crate) fn node(&self, id: NodeId) -> Arc<NodeEntry> {
        self.inner.nodes.read().unwrap()[id.raw() as usize].clone()
    }

    #[must_use]
    pub fn node_name(&self, id: NodeId) -> String {
        self.node(id).name().to_string()
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.inner.nodes.read().unwrap().len()
    }

    fn all_node_ids(&self) -> Vec<NodeId> {
        (0..self.node_count() as u64).map(NodeId::new).collect()
    }

    pub(crate) fn entries(&self) -> Vec<(NodeId, Arc<NodeEntry>)> {
        self.all_node_ids().into_iter().map(|id| (id, self.node(id))).collect()
    }

    pub(crate) fn all_edges(&self) -> Vec<Arc<Edge>> {
        self.inner.edges.read().unwrap().iter().map(|e| e.edge.clone()).collect()
    }

    // --- construction --------------------------------------------------

    /// Builds predecessor/successor cross-links and derives graph
    /// inputs/outputs (spec.md §4.7 `construct()`). Idempotent: callers
    /// that `create_node` after an initial `construct()` (trace mode) can
    /// call it again to re-derive topology.
    pub fn construct(&self) -> Result<()> {
        let mode = self.parallel_type();

        let edges: Vec<Arc<Edge>> = self.inner.edges.read().unwrap().iter().map(|e| e.edge.clone()).collect();
        for edge in &edges {
            edge.set_parallel_type(mode);
            edge.construct();
        }

        for (id, entry) in self.entries() {
            entry.set_parallel_mode(mode);

            let mut predecessors = Vec::new();
            for input in entry.inputs() {
                for p in self.edge(input).producers() {
                    if p != id && !predecessors.contains(&p) {
                        predecessors.push(p);
                    }
                }
            }
            *entry.predecessors.lock().unwrap() = predecessors;

            let mut successors = Vec::new();
            for output in entry.outputs() {
                for c in self.edge(output).consumers() {
                    if c != id && !successors.contains(&c) {
                        successors.push(c);
                    }
                }
            }
            *entry.successors.lock().unwrap() = successors;
        }

        let mut inputs = Vec::new();
        let mut outputs = Vec::new();
        for (idx, entry) in self.inner.edges.read().unwrap().iter().enumerate() {
            let id = EdgeId::new(idx as u64);
            if entry.edge.producers().is_empty() {
                inputs.push(id);
            }
            if entry.edge.consumers().is_empty() {
                outputs.push(id);
            }
        }
        *self.inner.inputs.lock().unwrap() = inputs;
        *self.inner.outputs.lock().unwrap() = outputs;

        Ok(())
    }

    #[must_use]
    pub fn inputs(&self) -> Vec<EdgeId> {
        self.inner.inputs.lock().unwrap().clone()
    }

    #[must_use]
    pub fn outputs(&self) -> Vec<EdgeId> {
        self.inner.outputs.lock().unwrap().clone()
    }

    /// The subset of nodes that are producer or consumer of at least one
    /// edge -- the set the engine is actually handed (spec.md §4.7 step,
    /// "Builds the run-node subset").
    fn run_nodes(&self) -> Vec<NodeId> {
        let edges: Vec<Arc<Edge>> = self.inner.edges.read().unwrap().iter().map(|e| e.edge.clone()).collect();
        self.all_node_ids()
            .into_iter()
            .filter(|&id| edges.iter().any(|e| e.producers().contains(&id) || e.consumers().contains(&id)))
            .collect()
    }

    fn init_execute_engine(&self) -> Result<()> {
        let run_nodes = self.run_nodes();
        let mut engine: Box<dyn Engine> = match self.parallel_type() {
            ParallelMode::None | ParallelMode::Sequential => Box::new(SequentialEngine::new()),
            ParallelMode::Task => Box::new(ParallelTaskEngine::with_idle_wait(self.inner.config.task_workers, self.inner.config.worker_idle_wait)),
            ParallelMode::Pipeline => Box::new(ParallelPipelineEngine::with_idle_wait(self.inner.config.worker_idle_wait)),
        };
        engine.init(self, run_nodes)?;
        *self.inner.engine.lock().unwrap() = Some(engine);
        Ok(())
    }

    /// `Graph::init()`: constructs topology, selects and initializes the
    /// engine, then marks the graph initialized (spec.md §4.7, §6).
    pub fn init(&self) -> Result<()> {
        self.construct()?;
        self.init_execute_engine()?;
        self.inner.is_init.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Delegates to the selected engine.
    pub fn run(&self) -> Result<()> {
        let guard = self.inner.engine.lock().unwrap();
        let engine = guard.as_ref().ok_or_else(|| Error::InvalidState("graph.run() called before init()".into()))?;
        engine.run(self)
    }

    /// Blocks until every run-node has finished its current run (only
    /// meaningful for the parallel-pipeline engine; a no-op elsewhere).
    pub fn synchronize(&self) -> Result<()> {
        let guard = self.inner.engine.lock().unwrap();
        match guard.as_ref() {
            Some(engine) => engine.synchronize(),
            None => Ok(()),
        }
    }

    /// `Graph::deinit()`: deinits the engine if one was created, else
    /// deinits every node directly (the later `kernel/src/dag/` tree's
    /// construct-but-never-init path, per spec.md §9).
    pub fn deinit(&self) -> Result<()> {
        let mut guard = self.inner.engine.lock().unwrap();
        match guard.take() {
            Some(engine) => engine.deinit(self)?,
            None => {
                for (_, entry) in self.entries() {
                    entry.deinit()?;
                }
            }
        }
        self.inner.is_init.store(false, Ordering::SeqCst);
        Ok(())
    }

    /// Dynamic construction (spec.md §4.7 "Dynamic construction via
    /// `trace(inputs)`"): sets the trace flag on every node, invokes
    /// `node.forward(inputs)` on `root`, registers the edges it returns as
    /// `root`'s outputs and as graph outputs, then initializes the graph.
    ///
    /// If `root` doesn't implement `forward` (returns `None`), tracing
    /// fails soft: the graph is left un-inited and an empty output vector
    /// is returned, matching the `is_forward_api_ok` resolution in
    /// spec.md §4.7's open question -- callers must check for an empty
    /// result, not expect an error.
    pub fn trace(&self, root: NodeId, inputs: Vec<EdgeId>) -> Result<Vec<EdgeId>> {
        for (_, entry) in self.entries() {
            entry.set_trace_flag(true);
        }

        let entry = self.node(root);
        for &input in &inputs {
            self.edge(input).increase_consumers(root);
        }
        *entry.inputs.lock().unwrap() = inputs;

        let Some(outputs) = entry.forward(&entry.inputs()) else {
            return Ok(Vec::new());
        };

        for &output in &outputs {
            self.edge(output).increase_producers(root);
            entry.add_output(output);
        }

        {
            let mut graph_outputs = self.inner.outputs.lock().unwrap();
            for &o in &outputs {
                if !graph_outputs.contains(&o) {
                    graph_outputs.push(o);
                }
            }
        }

        self.init()?;
        Ok(outputs)
    }
}
