//! Fluent helpers for assembling small graphs in tests.
//!
//! Mirrors the teacher's `TestDataBuilder` (a thin fluent wrapper that
//! saves call sites from hand-rolled boilerplate) retargeted from vectors
//! of test data to chains of nodes and edges.

use crate::edge_id::EdgeId;
use crate::error::Result;
use crate::graph::Graph;
use crate::mode::ParallelMode;
use crate::node::Node;

/// A [`Node`] built from a plain closure, for tests that don't want to
/// declare a one-off struct + `impl Node` for every node in a fixture.
pub struct FnNode<F> {
    run: F,
}

impl<F> Node for FnNode<F>
where
    F: FnMut() -> Result<()> + Send + 'static,
{
    fn run(&mut self) -> Result<()> {
        (self.run)()
    }
}

/// Wraps `f` as a [`Node`] whose `run` is exactly `f`.
///
/// # Example
///
/// ```
/// use rayshape_kernel::testing::fn_node;
/// use rayshape_kernel::graph::Graph;
///
/// let g = Graph::new("g");
/// g.create_node("noop", fn_node(|| Ok(())), vec![], vec![]).unwrap();
/// ```
#[must_use]
pub fn fn_node<F>(f: F) -> FnNode<F>
where
    F: FnMut() -> Result<()> + Send + 'static,
{
    FnNode { run: f }
}

/// Builds a linear chain of nodes, each fed by the previous node's sole
/// output edge. Useful for tests that only care about ordering, not
/// branching topology (use [`super::fixtures::diamond_graph`] for that).
pub struct ChainBuilder {
    graph: Graph,
    tail: Option<EdgeId>,
}

impl ChainBuilder {
    #[must_use]
    pub fn new(name: impl Into<String>, mode: ParallelMode) -> Self {
        let graph = Graph::new(name);
        graph.set_parallel_type(mode);
        Self { graph, tail: None }
    }

    /// Appends `node`, wired to consume the previous node's output (if
    /// any) and producing a fresh output edge of its own. Returns the new
    /// output edge's id.
    pub fn then<N: Node + 'static>(&mut self, name: impl Into<String>, node: N) -> Result<EdgeId> {
        let name = name.into();
        let inputs = self.tail.into_iter().collect::<Vec<_>>();
        let output = self.graph.create_edge(format!("{name}_out"))?;
        self.graph.create_node(name, node, inputs, vec![output])?;
        self.tail = Some(output);
        Ok(output)
    }

    /// The graph built so far. Cheap: [`Graph`] clones share the same
    /// underlying arena.
    #[must_use]
    pub fn graph(&self) -> Graph {
        self.graph.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_builder_wires_sequential_edges() {
        let mut chain = ChainBuilder::new("chain", ParallelMode::Sequential);
        chain.then("a", fn_node(|| Ok(()))).unwrap();
        chain.then("b", fn_node(|| Ok(()))).unwrap();
        let g = chain.graph();

        g.construct().unwrap();
        assert_eq!(g.node_count(), 2);
    }
}
