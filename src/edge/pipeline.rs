//! [`PipelineDataPacket`] and the internal state backing the `Pipeline`
//! variant of [`Edge`](crate::edge::Edge).
//!
//! Grounded on spec.md §4.5 and the authoritative later copy,
//! `original_source/kernel/src/dag/edge/pipeline_edge.cc`, for the exact
//! reclamation and backpressure ordering.

use crate::node_id::NodeId;
use crate::packet::{DataPacket, Ownership, Payload};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// A packet living on a [`PipelineEdge`]'s queue.
///
/// Extends [`DataPacket`] (via `Deref`) with the bookkeeping a bounded FIFO
/// with multiple consumers needs: how many consumers are required before
/// the packet is eligible for reclamation, and how many have consumed it
/// so far.
pub struct PipelineDataPacket {
    packet: DataPacket,
    consumers_size: usize,
    consumers_count: AtomicUsize,
}

impl std::ops::Deref for PipelineDataPacket {
    type Target = DataPacket;
    fn deref(&self) -> &DataPacket {
        &self.packet
    }
}

impl PipelineDataPacket {
    fn new(consumers_size: usize, index: u64) -> Self {
        let mut packet = DataPacket::new();
        packet.set_index(index);
        Self { packet, consumers_size, consumers_count: AtomicUsize::new(0) }
    }

    pub(crate) fn write(&mut self, value: Payload, ownership: Ownership) {
        self.packet.set(value, ownership);
    }

    /// Called once per consumer the first time it observes this packet.
    /// Returns the new consumer count.
    fn mark_consumed(&self) -> usize {
        self.consumers_count.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// True once every registered consumer has observed this packet.
    #[must_use]
    pub fn is_fully_consumed(&self) -> bool {
        self.consumers_count.load(Ordering::SeqCst) >= self.consumers_size
    }
}

/// All mutable state of a `Pipeline`-variant edge, guarded by the edge's
/// single mutex (see [`crate::edge::Edge`]).
pub(crate) struct PipelineState {
    pub(crate) packets: VecDeque<Arc<PipelineDataPacket>>,
    pub(crate) to_consume_index: HashMap<NodeId, usize>,
    pub(crate) currently_consuming: HashMap<NodeId, Option<Arc<PipelineDataPacket>>>,
    pub(crate) consumers_size: usize,
    pub(crate) queue_max_size: usize,
    pub(crate) last_index: u64,
}

impl PipelineState {
    pub(crate) fn new(queue_max_size: usize) -> Self {
        Self {
            packets: VecDeque::new(),
            to_consume_index: HashMap::new(),
            currently_consuming: HashMap::new(),
            consumers_size: 0,
            queue_max_size,
            last_index: 0,
        }
    }

    /// Carries forward the cursor/holding maps when promoting from a
    /// `FixedEdge`, registering `consumers` with a fresh cursor each.
    pub(crate) fn register_consumers<'a>(&mut self, consumers: impl Iterator<Item = &'a NodeId>) {
        for &node in consumers {
            self.to_consume_index.entry(node).or_insert(0);
            self.currently_consuming.entry(node).or_insert(None);
        }
    }

    /// Allocates a fresh packet with the next index and appends it after
    /// populating it via `build`. Caller is responsible for having already
    /// waited for queue space.
    pub(crate) fn produce(&mut self, build: impl FnOnce(&mut PipelineDataPacket)) {
        let index = self.last_index;
        self.last_index += 1;
        let mut packet = PipelineDataPacket::new(self.consumers_size, index);
        build(&mut packet);
        self.packets.push_back(Arc::new(packet));
    }

    #[must_use]
    pub(crate) fn is_full(&self) -> bool {
        self.packets.len() >= self.queue_max_size
    }

    /// Consumer-side protocol step 2-5 of spec.md §4.5, assuming the
    /// caller has already confirmed `to_consume_index[node] < packets.len()`.
    /// Returns whether the reclamation pass freed at least one slot that
    /// had previously been at/above `queue_max_size`.
    pub(crate) fn consume_and_reclaim(&mut self, node: NodeId) -> bool {
        let idx = self.to_consume_index.get(&node).copied().unwrap_or(0);
        let packet = self.packets[idx].clone();
        packet.mark_consumed();
        self.currently_consuming.insert(node, Some(packet));

        let was_full = self.is_full();

        let mut drop_count = 0usize;
        for p in &self.packets {
            let held = self.currently_consuming.values().any(|h| matches!(h, Some(held) if Arc::ptr_eq(held, p)));
            if p.is_fully_consumed() && !held {
                drop_count += 1;
            } else {
                break;
            }
        }
        for _ in 0..drop_count {
            self.packets.pop_front();
        }
        if drop_count > 0 {
            for v in self.to_consume_index.values_mut() {
                *v = v.saturating_sub(drop_count);
            }
        }

        *self.to_consume_index.entry(node).or_insert(0) += 1;

        was_full && drop_count > 0
    }
}
