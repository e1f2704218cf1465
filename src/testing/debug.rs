//! A debug dumper for inspecting a constructed graph's node/edge state
//! during test failures.
//!
//! Grounded on the teacher's `src/testing/debug.rs` (`debug_inspect` on a
//! `PCollection`), retargeted from per-element inspection to whole-graph
//! structural inspection; emitted via `tracing` to match the rest of the
//! crate's logging (spec.md's ambient logging addition) rather than a bare
//! `println!`.

use crate::graph::Graph;

/// Renders `graph`'s nodes (name, predecessors, successors, counters) and
/// edges (name, producer/consumer counts, in-flight packet count) as a
/// multi-line string, and emits it as a `tracing::debug!` event.
#[must_use]
pub fn dump_graph(graph: &Graph) -> String {
    let mut out = format!("graph `{}`:\n", graph.name());

    out.push_str("  nodes:\n");
    for (id, entry) in graph.entries() {
        out.push_str(&format!(
            "    {id:?} `{}` preds={:?} succs={:?} run_size={} completed_size={} color={:?}\n",
            entry.name(),
            entry.predecessors(),
            entry.successors(),
            entry.run_size(),
            entry.completed_size(),
            entry.color(),
        ));
    }

    out.push_str("  edges:\n");
    for edge in graph.all_edges() {
        out.push_str(&format!(
            "    `{}` producers={:?} consumers={:?} queue_len={} pipeline={} terminated={}\n",
            edge.name(),
            edge.producers(),
            edge.consumers(),
            edge.queue_len(),
            edge.is_pipeline(),
            edge.is_terminated(),
        ));
    }

    tracing::debug!(graph = graph.name(), "{}", out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::ParallelMode;
    use crate::testing::builders::fn_node;
    use crate::testing::fixtures::linear_pair_graph;

    #[test]
    fn dump_includes_node_and_edge_names() {
        let (g, _) = linear_pair_graph("dump-test", ParallelMode::Sequential, fn_node(|| Ok(())), fn_node(|| Ok(()))).unwrap();
        g.construct().unwrap();
        let rendered = dump_graph(&g);
        assert!(rendered.contains("`a`"));
        assert!(rendered.contains("`b`"));
        assert!(rendered.contains("`ab`"));
    }
}
