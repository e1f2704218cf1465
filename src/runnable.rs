//! Interface-contract types for the inference back-end collaborator
//! (spec.md §1(a), §6). The kernel never calls these itself -- a
//! model-infer node's `run()` is user code that happens to hold one of
//! these -- but the types are part of the crate's public surface so
//! application code has somewhere to hang a back-end adapter.

use crate::error::Result;
use crate::packet::{Buffer, DataType};

/// Tensor memory layout a [`Blob`] is arranged in.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum DataFormat {
    Nhwc,
    Nchw,
    Nc,
    Nhwc4,
    Ncdhw,
}

/// One tensor crossing the boundary into/out of a [`Runnable`] back-end.
#[derive(Clone, Debug)]
pub struct Blob {
    pub buffer: Buffer,
    pub data_type: DataType,
    pub data_format: DataFormat,
    pub dims: Vec<usize>,
}

/// The inference back-end abstraction the core requires, per spec.md §1(a):
/// model parsing, device buffers, and the actual ONNX/TensorRT/OpenVINO/MNN
/// adapters are out of scope; this trait is the only contract the runtime
/// imposes on them.
pub trait Runnable: Send {
    fn init(&mut self, model_path: &str, runtime: &str) -> Result<()>;
    fn deinit(&mut self) -> Result<()>;
    fn forward(&mut self) -> Result<()>;
    fn reshape(&mut self, names: &[String], shapes: &[Vec<usize>]) -> Result<()>;
    fn input_blobs(&self) -> Vec<Blob>;
    fn output_blobs(&self) -> Vec<Blob>;
}
