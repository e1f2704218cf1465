//! Opaque handle into a [`Graph`](crate::graph::Graph)'s edge arena.
//!
//! Sibling to [`NodeId`](crate::node_id::NodeId): the graph owns both node
//! and edge storage in parallel arenas (spec.md §9's "arena" design note),
//! and wrappers on either side refer to their counterpart by one of these
//! stable handles rather than by a raw reference.

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct EdgeId(u64);

impl EdgeId {
    pub(crate) fn new(v: u64) -> Self {
        Self(v)
    }

    #[must_use]
    pub fn raw(&self) -> u64 {
        self.0
    }
}
