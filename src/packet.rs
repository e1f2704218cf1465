//! [`DataPacket`]: the single unit of data that flows across an [`Edge`](crate::edge::Edge).
//!
//! A packet carries exactly one [`Payload`] -- either an opaque [`Buffer`]
//! (byte region + memory/data-type metadata) or an application-defined value
//! tagged with a [`TypeTag`]. This replaces the C++ source's
//! `set_any<T>`/`get_any<T>` template pair (keyed by `type_info`) with a
//! closed sum type, per spec.md's design notes: the kernel only ever needs
//! to carry a buffer or one opaque boxed value, so there is no need for an
//! open-ended registry of payload kinds.

use std::any::{Any, TypeId};
use std::fmt;

/// Where a [`Buffer`]'s bytes physically live.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum MemoryKind {
    Host,
    Device,
}

/// Element type carried by a [`Buffer`].
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum DataType {
    F32,
    F16,
    I32,
    I64,
    U8,
    Bool,
}

/// An opaque byte region plus the metadata needed to interpret it.
///
/// The kernel never inspects `data`; back-ends (out of scope per spec.md
/// §1) are the only code that interprets it. [`Buffer::deep_copy`] is the
/// one capability the kernel relies on: producing an edge's output from a
/// borrowed buffer requires an owned copy.
#[derive(Clone, Debug)]
pub struct Buffer {
    pub data: Vec<u8>,
    pub memory_kind: MemoryKind,
    pub data_type: DataType,
    pub element_count: usize,
}

impl Buffer {
    #[must_use]
    pub fn new(data: Vec<u8>, memory_kind: MemoryKind, data_type: DataType, element_count: usize) -> Self {
        Self { data, memory_kind, data_type, element_count }
    }

    /// Cross-memory-kind copy. The kernel treats this as infallible (a real
    /// back-end would surface allocation/transfer failures; that's outside
    /// this crate's scope).
    pub fn deep_copy(&self, other: &mut Buffer) {
        other.data.clear();
        other.data.extend_from_slice(&self.data);
        other.memory_kind = self.memory_kind;
        other.data_type = self.data_type;
        other.element_count = self.element_count;
    }
}

/// A lightweight runtime type tag used by [`Payload::Custom`]'s checked
/// downcast. Carries both a human-readable name (for error messages) and
/// the `TypeId` used for the actual comparison.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct TypeTag {
    name: &'static str,
    id: TypeId,
}

impl TypeTag {
    #[must_use]
    pub fn of<T: 'static>() -> Self {
        Self { name: std::any::type_name::<T>(), id: TypeId::of::<T>() }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// The value carried by a [`DataPacket`].
pub enum Payload {
    Buffer(Buffer),
    Custom(TypeTag, Box<dyn Any + Send + Sync>),
}

impl Payload {
    #[must_use]
    pub fn custom<T: Any + Send + Sync + 'static>(value: T) -> Self {
        Payload::Custom(TypeTag::of::<T>(), Box::new(value))
    }

    #[must_use]
    pub fn get<T: 'static>(&self) -> Option<&T> {
        match self {
            Payload::Custom(tag, v) if *tag == TypeTag::of::<T>() => v.downcast_ref::<T>(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_buffer(&self) -> Option<&Buffer> {
        match self {
            Payload::Buffer(b) => Some(b),
            Payload::Custom(..) => None,
        }
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Buffer(b) => f.debug_struct("Buffer").field("element_count", &b.element_count).finish(),
            Payload::Custom(tag, _) => f.debug_tuple("Custom").field(tag).finish(),
        }
    }
}

/// Whether a [`DataPacket`] owns its [`Payload`] (drops it on destruction /
/// replacement) or merely references an externally-owned value.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Ownership {
    Owned,
    External,
}

/// One unit of data on an edge.
///
/// Packets are in one of three conceptual states -- empty, written, or
/// consumed-by-k-of-N -- but the state is tracked by the surrounding edge
/// (the consumption count lives on [`crate::edge::pipeline::PipelineDataPacket`],
/// not here); a bare `DataPacket` only tracks whether it has been written.
pub struct DataPacket {
    payload: Option<Payload>,
    ownership: Ownership,
    written: bool,
    index: u64,
}

impl Default for DataPacket {
    fn default() -> Self {
        Self { payload: None, ownership: Ownership::Owned, written: false, index: 0 }
    }
}

impl DataPacket {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the payload. The previous payload (if owned) is dropped by
    /// virtue of being overwritten; if it was `External`, it is simply
    /// forgotten (the caller remains responsible for it).
    pub fn set(&mut self, value: Payload, ownership: Ownership) {
        self.payload = Some(value);
        self.ownership = ownership;
        self.written = true;
    }

    /// Construct a fresh payload in place from `value`, always owned.
    pub fn create<T: Any + Send + Sync + 'static>(&mut self, value: T) {
        self.set(Payload::custom(value), Ownership::Owned);
    }

    /// Marks the packet written without changing the payload, provided the
    /// caller's expectation (`expected_written`) about the current written
    /// state holds. Mirrors the C++ source's pointer-equality check: since
    /// the Rust port does not expose raw payload pointers, we key off
    /// whether the packet's state matches what the caller believes it to
    /// be. Returns `false` (a no-op, not an error) on mismatch -- see
    /// spec.md's resolution of the `notify_write` open question.
    pub fn notify_write(&mut self, expected_written: bool) -> bool {
        if self.written != expected_written {
            return false;
        }
        self.written = true;
        true
    }

    #[must_use]
    pub fn is_written(&self) -> bool {
        self.written
    }

    #[must_use]
    pub fn get<T: 'static>(&self) -> Option<&T> {
        self.payload.as_ref().and_then(Payload::get)
    }

    #[must_use]
    pub fn payload(&self) -> Option<&Payload> {
        self.payload.as_ref()
    }

    #[must_use]
    pub fn as_buffer(&self) -> Option<&Buffer> {
        self.payload.as_ref().and_then(Payload::as_buffer)
    }

    #[must_use]
    pub fn ownership(&self) -> Ownership {
        self.ownership
    }

    pub fn set_index(&mut self, index: u64) {
        self.index = index;
    }

    #[must_use]
    pub fn index(&self) -> u64 {
        self.index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_custom_payload() {
        let mut p = DataPacket::new();
        assert!(!p.is_written());
        p.create(42i32);
        assert!(p.is_written());
        assert_eq!(p.get::<i32>(), Some(&42));
        assert_eq!(p.get::<f64>(), None);
    }

    #[test]
    fn notify_write_mismatch_is_noop_not_error() {
        let mut p = DataPacket::new();
        // Packet isn't written yet; caller incorrectly believes it was.
        assert!(!p.notify_write(true));
        assert!(!p.is_written());
        assert!(p.notify_write(false));
        assert!(p.is_written());
    }

    #[test]
    fn deep_copy_buffer() {
        let src = Buffer::new(vec![1, 2, 3], MemoryKind::Host, DataType::U8, 3);
        let mut dst = Buffer::new(vec![], MemoryKind::Device, DataType::F32, 0);
        src.deep_copy(&mut dst);
        assert_eq!(dst.data, vec![1, 2, 3]);
        assert_eq!(dst.memory_kind, MemoryKind::Host);
        assert_eq!(dst.element_count, 3);
    }
}
