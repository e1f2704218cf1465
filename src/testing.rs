//! Test-support tooling: graph fixtures, fluent builders, and assertion
//! helpers for exercising the execution engines against known shapes.
//!
//! Mirrors the teacher's `src/testing.rs` + `src/testing/*.rs` layout
//! (`testing.rs` re-exporting a handful of submodules under `testing/`),
//! retargeted from collection-pipeline test data to DAG/engine test data.
//! Public (not `#[cfg(test)]`-gated) so integration tests under `tests/`
//! can depend on it like any other module.

pub mod assertions;
pub mod builders;
pub mod debug;
pub mod fixtures;

pub use assertions::{assert_fifo_prefix, assert_no_packet_loss, assert_topological_order};
pub use builders::{fn_node, ChainBuilder, FnNode};
pub use debug::dump_graph;
pub use fixtures::{bounded_pipeline_graph, cyclic_pair_graph, diamond_graph, fan_out_pipeline_graph, linear_pair_graph, DiamondEdges};
