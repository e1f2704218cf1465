//! Internal state backing the `Fixed` variant of [`Edge`](crate::edge::Edge):
//! a single most-recent packet, overwritten on every write, with no
//! ordering or backpressure.

use crate::packet::DataPacket;
use std::sync::Arc;

pub(crate) struct FixedState {
    pub(crate) packet: Arc<DataPacket>,
    pub(crate) last_index: u64,
}

impl FixedState {
    pub(crate) fn new() -> Self {
        Self { packet: Arc::new(DataPacket::new()), last_index: 0 }
    }

    pub(crate) fn write(&mut self, build: impl FnOnce(&mut DataPacket)) {
        self.last_index += 1;
        let mut packet = DataPacket::new();
        packet.set_index(self.last_index);
        build(&mut packet);
        self.packet = Arc::new(packet);
    }
}
