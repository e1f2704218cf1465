//! The three execution engines a [`crate::graph::Graph`] can select
//! (spec.md §4.9-§4.11), behind one trait so `Graph` doesn't need to know
//! which variant it holds.
//!
//! Grounded on `original_source/kernel/src/dag/engine/*.cc`, each engine
//! file below cites its specific source.

pub mod parallel_pipeline;
pub mod parallel_task;
pub mod sequential;

use crate::error::Result;
use crate::graph::Graph;
use crate::node_id::NodeId;

/// An execution strategy for a constructed graph.
///
/// `init` receives the run-node subset `Graph::construct` computed --
/// nodes that are producer or consumer of at least one edge -- and is
/// responsible for any engine-specific setup (topological ordering,
/// starting a thread pool, spawning persistent worker threads). `run`
/// drives one execution; what "one execution" means is engine-specific
/// (a single pass for Sequential/Task, nothing at all for Pipeline, whose
/// workers already run continuously once `init` returns).
pub trait Engine: Send {
    fn init(&mut self, graph: &Graph, run_nodes: Vec<NodeId>) -> Result<()>;
    fn run(&self, graph: &Graph) -> Result<()>;
    fn deinit(&self, graph: &Graph) -> Result<()>;

    /// Blocks until outstanding work quiesces. A no-op for engines whose
    /// `run` already blocks until completion.
    fn synchronize(&self) -> Result<()> {
        Ok(())
    }
}
