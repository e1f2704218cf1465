//! The parallel-mode tag, shared by [`Graph`](crate::graph::Graph) (engine
//! selection) and [`Edge`](crate::edge::Edge) (Fixed vs. Pipeline variant
//! selection).

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum ParallelMode {
    #[default]
    None,
    Sequential,
    Task,
    Pipeline,
}

/// The result of an edge's `update(node)` call, consumed by nodes and
/// engines to decide whether to proceed, suspend, or abort.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum UpdateFlag {
    Complete,
    Terminate,
    Error,
}
