//! Opaque handle into a [`Graph`](crate::graph::Graph)'s node arena.
//!
//! Mirrors the teacher crate's `NodeId`: small, `Copy`, hashable, and only
//! meaningful in combination with the graph that issued it.

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    pub(crate) fn new(v: u64) -> Self {
        Self(v)
    }

    #[must_use]
    pub fn raw(&self) -> u64 {
        self.0
    }
}
