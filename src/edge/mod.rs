//! [`Edge`]: the façade over the `Fixed`/`Pipeline` variants.
//!
//! Replaces the C++ source's `AbstractEdge` inheritance hierarchy with a
//! tagged sum (`EdgeKind`) behind one concrete type, per spec.md §9's
//! design note. Promotion from `Fixed` to `Pipeline` (via
//! [`Edge::set_parallel_type`]) swaps the variant in place while carrying
//! the producer/consumer sets forward.

pub mod fixed;
pub mod pipeline;

use crate::mode::{ParallelMode, UpdateFlag};
use crate::node_id::NodeId;
use crate::packet::{Buffer, DataPacket, Ownership, Payload};
use fixed::FixedState;
use pipeline::{PipelineDataPacket, PipelineState};
use std::any::Any;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};

/// Default bound on a [`PipelineEdge`](pipeline::PipelineState)'s in-flight
/// packet count (spec.md §4.5).
pub const DEFAULT_QUEUE_MAX_SIZE: usize = 16;

struct PipelineRuntime {
    state: Mutex<PipelineState>,
    not_empty: Condvar,
    not_full: Condvar,
}

impl PipelineRuntime {
    fn new(state: PipelineState) -> Self {
        Self { state: Mutex::new(state), not_empty: Condvar::new(), not_full: Condvar::new() }
    }
}

enum EdgeKind {
    Fixed(FixedState),
    Pipeline(Arc<PipelineRuntime>),
}

/// A packet read back from an edge, regardless of which variant produced it.
///
/// Both variants publish fully-written packets atomically (built, then
/// wrapped in an `Arc` and made visible) -- see `fixed.rs`/`pipeline.rs` --
/// so a shared reference is always safe to hand out without further
/// synchronization.
pub enum PacketRef {
    Fixed(Arc<DataPacket>),
    Pipeline(Arc<PipelineDataPacket>),
}

impl PacketRef {
    #[must_use]
    pub fn as_data_packet(&self) -> &DataPacket {
        match self {
            PacketRef::Fixed(p) => p.as_ref(),
            PacketRef::Pipeline(p) => p.as_ref().deref(),
        }
    }
}

impl Deref for PacketRef {
    type Target = DataPacket;
    fn deref(&self) -> &DataPacket {
        self.as_data_packet()
    }
}

/// Logical channel between one producer and N consumers.
///
/// Every edge tracks its own producer/consumer node sets and a
/// `terminate_flag`, outside whichever variant ([`EdgeKind::Fixed`] /
/// [`EdgeKind::Pipeline`]) currently backs it, so promotion doesn't need to
/// touch them (spec.md §3).
pub struct Edge {
    name: String,
    producers: Mutex<Vec<NodeId>>,
    consumers: Mutex<Vec<NodeId>>,
    terminate_flag: AtomicBool,
    queue_max_size: usize,
    kind: Mutex<EdgeKind>,
}

impl Edge {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_queue_max_size(name, DEFAULT_QUEUE_MAX_SIZE)
    }

    #[must_use]
    pub fn with_queue_max_size(name: impl Into<String>, queue_max_size: usize) -> Self {
        Self {
            name: name.into(),
            producers: Mutex::new(Vec::new()),
            consumers: Mutex::new(Vec::new()),
            terminate_flag: AtomicBool::new(false),
            queue_max_size,
            kind: Mutex::new(EdgeKind::Fixed(FixedState::new())),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn increase_producers(&self, node: NodeId) {
        let mut producers = self.producers.lock().unwrap();
        if !producers.contains(&node) {
            producers.push(node);
        }
    }

    pub(crate) fn increase_consumers(&self, node: NodeId) {
        let mut consumers = self.consumers.lock().unwrap();
        if !consumers.contains(&node) {
            consumers.push(node);
        }
    }

    #[must_use]
    pub fn producers(&self) -> Vec<NodeId> {
        self.producers.lock().unwrap().clone()
    }

    #[must_use]
    pub fn consumers(&self) -> Vec<NodeId> {
        self.consumers.lock().unwrap().clone()
    }

    /// Sizes a `Pipeline` variant's `consumers_size` from the registered
    /// consumer set and gives each consumer a cursor. Called once by
    /// `Graph::construct` (spec.md §4.7 step 2); a no-op for `Fixed` edges.
    pub(crate) fn construct(&self) {
        let mut kind = self.kind.lock().unwrap();
        if let EdgeKind::Pipeline(rt) = &mut *kind {
            let consumers = self.consumers.lock().unwrap().clone();
            let mut state = rt.state.lock().unwrap();
            state.consumers_size = consumers.len();
            state.register_consumers(consumers.iter());
        }
    }

    /// Promotes a `Fixed` edge to `Pipeline`, carrying the producer/consumer
    /// sets forward. A no-op if `mode` isn't `Pipeline` or the edge is
    /// already `Pipeline` (demotion back to `Fixed` is not supported --
    /// spec.md never requires it).
    pub fn set_parallel_type(&self, mode: ParallelMode) {
        if mode != ParallelMode::Pipeline {
            return;
        }
        let mut kind = self.kind.lock().unwrap();
        if matches!(*kind, EdgeKind::Fixed(_)) {
            let consumers = self.consumers.lock().unwrap().clone();
            let mut state = PipelineState::new(self.queue_max_size);
            state.consumers_size = consumers.len();
            state.register_consumers(consumers.iter());
            *kind = EdgeKind::Pipeline(Arc::new(PipelineRuntime::new(state)));
        }
    }

    fn write(&self, payload: Payload, ownership: Ownership) {
        let rt = {
            let mut kind = self.kind.lock().unwrap();
            match &mut *kind {
                EdgeKind::Fixed(state) => {
                    state.write(|p| p.set(payload, ownership));
                    return;
                }
                EdgeKind::Pipeline(rt) => rt.clone(),
            }
        };

        let mut guard = rt.state.lock().unwrap();
        if guard.consumers_size > 0 {
            while guard.is_full() {
                if self.terminate_flag.load(Ordering::SeqCst) {
                    // The edge is being torn down and nothing will ever
                    // drain it again; writing would block forever.
                    // Dropping the value here is the producer-side mirror
                    // of `update`'s early-Terminate return.
                    return;
                }
                guard = rt.not_full.wait(guard).unwrap();
            }
        }
        guard.produce(|p| p.write(payload, ownership));
        drop(guard);
        rt.not_empty.notify_all();
    }

    /// `set(value, external)` from spec.md §3: writes a buffer payload.
    pub fn set_buffer(&self, buffer: Buffer, ownership: Ownership) {
        self.write(Payload::Buffer(buffer), ownership);
    }

    /// `create<T>(args)`: writes a freshly-constructed application value,
    /// always owned.
    pub fn set_value<T: Any + Send + Sync + 'static>(&self, value: T) {
        self.write(Payload::custom(value), Ownership::Owned);
    }

    /// Marks the edge's currently-published `Fixed` packet as written,
    /// provided the caller's belief about the current written state
    /// (`expected_written`) matches. Returns `false` (a no-op, not an
    /// error) on mismatch, or always for `Pipeline` edges, whose packets
    /// are only ever published fully-written (spec.md §9's `notify_write`
    /// open-question resolution).
    pub fn notify_write(&self, expected_written: bool) -> bool {
        let kind = self.kind.lock().unwrap();
        match &*kind {
            EdgeKind::Fixed(state) => state.packet.is_written() == expected_written,
            EdgeKind::Pipeline(_) => false,
        }
    }

    /// Returns the packet `node` is currently holding (after a prior
    /// `update(node)` returned `Complete`) without blocking. For `Fixed`
    /// edges, always returns the current (possibly stale) value.
    #[must_use]
    pub fn get(&self, node: NodeId) -> Option<PacketRef> {
        let kind = self.kind.lock().unwrap();
        match &*kind {
            EdgeKind::Fixed(state) => Some(PacketRef::Fixed(state.packet.clone())),
            EdgeKind::Pipeline(rt) => {
                let state = rt.state.lock().unwrap();
                state.currently_consuming.get(&node).and_then(Clone::clone).map(PacketRef::Pipeline)
            }
        }
    }

    /// Fast path for a graph output edge with no registered consumer node:
    /// reads the most recently produced packet directly (spec.md §4.5).
    #[must_use]
    pub fn get_graph_output(&self) -> Option<PacketRef> {
        let kind = self.kind.lock().unwrap();
        match &*kind {
            EdgeKind::Fixed(state) => Some(PacketRef::Fixed(state.packet.clone())),
            EdgeKind::Pipeline(rt) => {
                let state = rt.state.lock().unwrap();
                state.packets.back().cloned().map(PacketRef::Pipeline)
            }
        }
    }

    /// Advances `node`'s view of the edge. `Fixed` edges never block:
    /// `Terminate` if the edge has been told to terminate, else `Complete`.
    /// `Pipeline` edges block on `not_empty` until a packet is available or
    /// termination is requested (spec.md §4.5 steps 1-5).
    pub fn update(&self, node: NodeId) -> UpdateFlag {
        if self.terminate_flag.load(Ordering::SeqCst) {
            return UpdateFlag::Terminate;
        }

        let rt = {
            let kind = self.kind.lock().unwrap();
            match &*kind {
                EdgeKind::Fixed(_) => return UpdateFlag::Complete,
                EdgeKind::Pipeline(rt) => rt.clone(),
            }
        };

        let mut guard = rt.state.lock().unwrap();
        loop {
            if self.terminate_flag.load(Ordering::SeqCst) {
                return UpdateFlag::Terminate;
            }
            let idx = guard.to_consume_index.get(&node).copied().unwrap_or(0);
            if idx < guard.packets.len() {
                break;
            }
            guard = rt.not_empty.wait(guard).unwrap();
        }

        let freed_a_full_slot = guard.consume_and_reclaim(node);
        drop(guard);
        if freed_a_full_slot {
            rt.not_full.notify_all();
        }
        UpdateFlag::Complete
    }

    /// Sets the terminate flag and wakes any consumer blocked in `update`.
    pub fn request_terminate(&self) {
        self.terminate_flag.store(true, Ordering::SeqCst);
        let kind = self.kind.lock().unwrap();
        if let EdgeKind::Pipeline(rt) = &*kind {
            rt.not_empty.notify_all();
            rt.not_full.notify_all();
        }
    }

    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.terminate_flag.load(Ordering::SeqCst)
    }

    /// Current in-flight packet count; `0` for `Fixed` edges (they hold at
    /// most one packet, but it is never "in flight").
    #[must_use]
    pub fn queue_len(&self) -> usize {
        let kind = self.kind.lock().unwrap();
        match &*kind {
            EdgeKind::Fixed(_) => 0,
            EdgeKind::Pipeline(rt) => rt.state.lock().unwrap().packets.len(),
        }
    }

    #[must_use]
    pub fn is_pipeline(&self) -> bool {
        matches!(*self.kind.lock().unwrap(), EdgeKind::Pipeline(_))
    }
}
