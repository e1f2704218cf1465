//! Single-thread engine: runs every node once, in topological order, on
//! the caller's thread (spec.md §4.9).
//!
//! Grounded on `original_source/kernel/src/dag/engine/sequential_engine.cc`,
//! whose `Init` sorts the run-node subset with `TopoSortBFS` and whose
//! `Run` walks that order calling `UpdateInput` then `Run` on each node.

use crate::edge::Edge;
use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::graph::Graph;
use crate::mode::UpdateFlag;
use crate::node_id::NodeId;
use crate::topo::topo_sort_bfs;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

pub struct SequentialEngine {
    order: Mutex<Vec<NodeId>>,
}

impl SequentialEngine {
    #[must_use]
    pub fn new() -> Self {
        Self { order: Mutex::new(Vec::new()) }
    }
}

impl Default for SequentialEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn run_node(graph: &Graph, id: NodeId) -> Result<()> {
    let entry = graph.node(id);
    let edges: Vec<Arc<Edge>> = graph.edges_for(&entry.inputs());

    entry.set_running(true);
    let result = catch_unwind(AssertUnwindSafe(|| match entry.update_input(id, &edges) {
        UpdateFlag::Terminate | UpdateFlag::Error => Ok(()),
        UpdateFlag::Complete => entry.run().map_err(|e| Error::NodeExecutionFailed(entry.name().to_string(), e.to_string())),
    }));
    entry.set_running(false);

    match result {
        Ok(r) => r,
        Err(_) => Err(Error::NodePanicked(entry.name().to_string())),
    }
}

impl Engine for SequentialEngine {
    fn init(&mut self, graph: &Graph, run_nodes: Vec<NodeId>) -> Result<()> {
        let entries = graph.entries();
        let topo = topo_sort_bfs(&entries)?;
        let order: Vec<NodeId> = topo.order.into_iter().filter(|id| run_nodes.contains(id)).collect();

        for &id in &order {
            graph.node(id).init(id)?;
        }
        *self.order.lock().unwrap() = order;
        Ok(())
    }

    fn run(&self, graph: &Graph) -> Result<()> {
        let order = self.order.lock().unwrap().clone();
        for id in order {
            run_node(graph, id)?;
        }
        Ok(())
    }

    fn deinit(&self, graph: &Graph) -> Result<()> {
        let order = self.order.lock().unwrap().clone();
        for id in order {
            graph.node(id).deinit()?;
        }
        Ok(())
    }
}
