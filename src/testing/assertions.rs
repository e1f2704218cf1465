//! Assertion helpers for the topological and ordering invariants spec.md
//! §8 calls out (invariants 1, 3, 4).
//!
//! Grounded on the teacher's `src/testing/assertions.rs` (collection
//! comparison helpers), retargeted from collection equality to graph
//! topology and pipeline-ordering equality.

use crate::graph::Graph;
use crate::node_id::NodeId;

/// Asserts that for every edge in `graph`, each producer appears before
/// each consumer in `order` -- spec.md §8 invariant 1's "for any
/// predecessor-successor pair, the predecessor precedes the successor in
/// the emission".
///
/// # Panics
///
/// Panics (via `assert!`) if `order` violates the ordering for any edge,
/// or if a node referenced by an edge is missing from `order` entirely.
pub fn assert_topological_order(graph: &Graph, order: &[NodeId]) {
    let position = |id: NodeId| order.iter().position(|&x| x == id);

    for edge in graph.all_edges() {
        for producer in edge.producers() {
            let Some(p_pos) = position(producer) else {
                panic!("producer {producer:?} of edge `{}` missing from order", edge.name());
            };
            for consumer in edge.consumers() {
                let Some(c_pos) = position(consumer) else {
                    panic!("consumer {consumer:?} of edge `{}` missing from order", edge.name());
                };
                assert!(
                    p_pos < c_pos,
                    "edge `{}`: producer {producer:?} (position {p_pos}) must precede consumer {consumer:?} (position {c_pos})",
                    edge.name(),
                );
            }
        }
    }
}

/// Asserts `observed` is exactly `0, 1, 2, ..., n - 1` -- spec.md §8
/// invariant 3, "Pipeline FIFO": a consumer's sequence of observations
/// must equal the producer's write order, in full, without gaps.
pub fn assert_fifo_prefix(observed: &[i32], n: usize) {
    let expected: Vec<i32> = (0..n as i32).collect();
    assert_eq!(observed, expected.as_slice(), "pipeline consumer did not observe a contiguous 0..{n} prefix in order");
}

/// Asserts spec.md §8 invariant 4, "Pipeline no-loss": summed over every
/// consumer, the number of packets observed equals `consumers * produced`.
pub fn assert_no_packet_loss(observed_per_consumer: &[usize], produced: usize) {
    for (i, &observed) in observed_per_consumer.iter().enumerate() {
        assert_eq!(observed, produced, "consumer {i} observed {observed} packets, expected all {produced}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::ParallelMode;
    use crate::testing::builders::fn_node;
    use crate::testing::fixtures::diamond_graph;

    #[test]
    fn topological_order_assertion_accepts_valid_order() {
        let (g, _edges) = diamond_graph(
            "diamond",
            ParallelMode::Sequential,
            fn_node(|| Ok(())),
            fn_node(|| Ok(())),
            fn_node(|| Ok(())),
            fn_node(|| Ok(())),
        )
        .unwrap();
        g.construct().unwrap();

        let order = crate::topo::topo_sort_bfs(&g.entries()).unwrap().order;
        assert_topological_order(&g, &order);
    }

    #[test]
    #[should_panic(expected = "must precede")]
    fn topological_order_assertion_rejects_reversed_order() {
        let (g, _edges) = diamond_graph(
            "diamond-bad",
            ParallelMode::Sequential,
            fn_node(|| Ok(())),
            fn_node(|| Ok(())),
            fn_node(|| Ok(())),
            fn_node(|| Ok(())),
        )
        .unwrap();
        g.construct().unwrap();

        let mut order = crate::topo::topo_sort_bfs(&g.entries()).unwrap().order;
        order.reverse();
        assert_topological_order(&g, &order);
    }
}
