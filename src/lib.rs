//! # rayshape-kernel
//!
//! An **inference-pipeline execution kernel**: a library for describing a
//! computation as a directed acyclic graph of [`Node`]s connected by typed
//! [`Edge`]s, then executing that graph under one of three scheduling
//! strategies.
//!
//! This crate is the DAG *runtime* only. Inference back-ends (ONNX,
//! TensorRT, OpenVINO, MNN, ...), device/buffer allocators, model file
//! parsing, image codecs, and the CLI/packager tool are external
//! collaborators; the kernel only requires a [`runnable::Runnable`]
//! abstraction and treats buffers as opaque owned values.
//!
//! ## Key Features
//!
//! - **Typed edges** - [`edge::Edge`] carries [`packet::DataPacket`]s as
//!   either a single most-recent value (`Fixed`) or a bounded FIFO with
//!   per-consumer cursors (`Pipeline`)
//! - **User nodes** - implement [`node::Node`] for one unit of work
//!   (`init`/`deinit`/`run`, optionally `forward` for trace-mode
//!   construction)
//! - **Three execution engines** - [`engine::sequential::SequentialEngine`]
//!   (single-threaded, topo order), [`engine::parallel_task::ParallelTaskEngine`]
//!   (per-frame fork/join over a work-stealing pool), and
//!   [`engine::parallel_pipeline::ParallelPipelineEngine`] (one persistent
//!   worker per node, forming a software pipeline)
//! - **Work-stealing thread pool** - [`pool::ThreadPool`], backed by a
//!   lock-protected [`deque::WsDeque`] per worker
//! - **Explicit configuration** - [`config::EngineConfig`] is constructed
//!   and passed to [`graph::Graph::init`] rather than read from global state
//!
//! ## Quick Start
//!
//! ```
//! use rayshape_kernel::edge::Edge;
//! use rayshape_kernel::graph::Graph;
//! use rayshape_kernel::mode::ParallelMode;
//! use rayshape_kernel::node::Node;
//! use rayshape_kernel::node_id::NodeId;
//! use rayshape_kernel::error::Result;
//! use std::sync::{Arc, Mutex};
//!
//! struct Producer {
//!     out: Arc<Edge>,
//! }
//! impl Node for Producer {
//!     fn run(&mut self) -> Result<()> {
//!         self.out.set_value(42i32);
//!         Ok(())
//!     }
//! }
//!
//! struct Consumer {
//!     input: Arc<Edge>,
//!     id: Option<NodeId>,
//!     seen: Arc<Mutex<Option<i32>>>,
//! }
//! impl Node for Consumer {
//!     fn bind(&mut self, id: NodeId) {
//!         self.id = Some(id);
//!     }
//!     fn run(&mut self) -> Result<()> {
//!         if let Some(packet) = self.id.and_then(|id| self.input.get(id)) {
//!             *self.seen.lock().unwrap() = packet.get::<i32>().copied();
//!         }
//!         Ok(())
//!     }
//! }
//!
//! # fn main() -> Result<()> {
//! let graph = Graph::new("example");
//! graph.set_parallel_type(ParallelMode::Sequential);
//!
//! let edge = graph.create_edge("a_to_b")?;
//! let edge_handle = graph.edge_handle(edge);
//!
//! graph.create_node("producer", Producer { out: edge_handle.clone() }, vec![], vec![edge])?;
//! let seen = Arc::new(Mutex::new(None));
//! graph.create_node(
//!     "consumer",
//!     Consumer { input: edge_handle, id: None, seen: seen.clone() },
//!     vec![edge],
//!     vec![],
//! )?;
//!
//! graph.init()?;
//! graph.run()?;
//! graph.deinit()?;
//!
//! assert_eq!(*seen.lock().unwrap(), Some(42));
//! # Ok(())
//! # }
//! ```
//!
//! ## Execution Modes
//!
//! Select a mode with [`graph::Graph::set_parallel_type`] before
//! [`graph::Graph::init`]:
//!
//! - [`mode::ParallelMode::None`] / [`mode::ParallelMode::Sequential`] -
//!   runs the topological order on the caller's thread
//! - [`mode::ParallelMode::Task`] - per-frame fork/join on a shared
//!   work-stealing pool; a node becomes runnable once every predecessor
//!   has completed
//! - [`mode::ParallelMode::Pipeline`] - one persistent worker per node;
//!   nodes loop on input-edge readiness, forming a software pipeline with
//!   backpressure from bounded edges
//!
//! ## Feature Flags
//!
//! - `metrics` - enables [`metrics`], a per-run counters/gauges collector
//!   over a constructed graph (enabled by default)

pub mod config;
pub mod deque;
pub mod edge;
pub mod edge_id;
pub mod engine;
pub mod error;
pub mod graph;
pub mod mode;
pub mod node;
pub mod node_id;
pub mod packet;
pub mod pool;
pub mod runnable;
pub mod topo;

#[cfg(feature = "metrics")]
pub mod metrics;

pub mod testing;

pub use config::EngineConfig;
pub use edge::Edge;
pub use edge_id::EdgeId;
pub use error::{Error, Result};
pub use graph::Graph;
pub use mode::{ParallelMode, UpdateFlag};
pub use node::Node;
pub use node_id::NodeId;
pub use packet::{Buffer, DataPacket, DataType, MemoryKind, Payload};
pub use pool::ThreadPool;
