//! Scenario S6 and invariants 1/2 from spec.md §8: topological sort
//! correctness and cycle detection, exercised through `Graph::init` rather
//! than `topo::topo_sort_*` directly (those have their own unit tests).

use rayshape_kernel::testing::{cyclic_pair_graph, diamond_graph, fn_node};
use rayshape_kernel::{Error, ParallelMode};

#[test]
fn cyclic_graph_fails_init_with_a_cycle_error() {
    let g = cyclic_pair_graph("s6", ParallelMode::Sequential, fn_node(|| Ok(())), fn_node(|| Ok(()))).unwrap();
    let err = g.init().unwrap_err();
    assert!(matches!(err, Error::GraphCycle | Error::GraphMissingStart));
}

#[test]
fn cyclic_graph_fails_the_same_way_under_every_engine_mode() {
    for mode in [ParallelMode::Sequential, ParallelMode::Task, ParallelMode::Pipeline] {
        let g = cyclic_pair_graph("s6-multi", mode, fn_node(|| Ok(())), fn_node(|| Ok(()))).unwrap();
        assert!(g.init().is_err(), "mode {mode:?} should reject a cyclic graph");
    }
}

#[test]
fn acyclic_diamond_initializes_successfully_under_every_engine_mode() {
    for mode in [ParallelMode::Sequential, ParallelMode::Task, ParallelMode::Pipeline] {
        let (g, _edges) = diamond_graph(
            "diamond-multi",
            mode,
            fn_node(|| Ok(())),
            fn_node(|| Ok(())),
            fn_node(|| Ok(())),
            fn_node(|| Ok(())),
        )
        .unwrap();
        g.init().unwrap();
        g.deinit().unwrap();
    }
}
