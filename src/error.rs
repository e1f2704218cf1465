//! Crate-wide error taxonomy.
//!
//! Every fallible operation in the kernel returns [`Result<T>`]. Variants are
//! grouped by subsystem, each with a stable numeric code in a contiguous
//! range so callers that need to match on an integer (e.g. across an FFI
//! boundary) don't have to depend on enum variant layout:
//!
//! | Range | Kind |
//! |---|---|
//! | 0-99 | Parameter |
//! | 100-199 | Model |
//! | 200-299 | Common |
//! | 300-399 | Device |
//! | 400-499 | Runtime |

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// The kernel's flat error enumeration.
///
/// Construction helpers (`Error::bad_name`, `Error::cycle`, ...) are
/// provided alongside the variants for call sites that don't want to name
/// the enum explicitly.
#[derive(Debug, Error, Clone)]
pub enum Error {
    // --- Parameter (0-99) ---
    #[error("null parameter: {0}")]
    NullParameter(String),

    #[error("bad value for parameter `{name}`: {reason}")]
    BadValue { name: String, reason: String },

    #[error("bad name: `{0}`")]
    BadName(String),

    #[error("bad format: {0}")]
    BadFormat(String),

    // --- Model (100-199) ---
    #[error("model parse error: {0}")]
    ModelParse(String),

    #[error("model compile error: {0}")]
    ModelCompile(String),

    // --- Common (200-299) ---
    #[error("out of memory")]
    OutOfMemory,

    #[error("bad file: {0}")]
    BadFile(String),

    // --- Device (300-399) ---
    #[error("unsupported device: {0}")]
    DeviceUnsupported(String),

    #[error("invalid device: {0}")]
    DeviceInvalid(String),

    // --- Runtime (400-499) ---
    #[error("node `{0}` execution failed: {1}")]
    NodeExecutionFailed(String, String),

    #[error("node `{0}` panicked during run()")]
    NodePanicked(String),

    #[error("graph has a cycle")]
    GraphCycle,

    #[error("graph has no start node (every node has at least one predecessor)")]
    GraphMissingStart,

    #[error("unknown parallel mode")]
    UnknownParallelMode,

    #[error("thread pool error: {0}")]
    ThreadPoolError(String),

    #[error("not implemented: {0}")]
    NotImplemented(String),

    #[error("name `{0}` is already in use")]
    DuplicateName(String),

    #[error("unknown node or edge: `{0}`")]
    NotFound(String),

    #[error("operation invalid in current state: {0}")]
    InvalidState(String),
}

impl Error {
    /// The stable numeric code for this error, per the per-subsystem
    /// contiguous ranges documented on [`Error`].
    #[must_use]
    pub fn code(&self) -> u32 {
        match self {
            Error::NullParameter(_) => 0,
            Error::BadValue { .. } => 1,
            Error::BadName(_) => 2,
            Error::BadFormat(_) => 3,

            Error::ModelParse(_) => 100,
            Error::ModelCompile(_) => 101,

            Error::OutOfMemory => 200,
            Error::BadFile(_) => 201,

            Error::DeviceUnsupported(_) => 300,
            Error::DeviceInvalid(_) => 301,

            Error::NodeExecutionFailed(..) => 400,
            Error::NodePanicked(_) => 401,
            Error::GraphCycle => 402,
            Error::GraphMissingStart => 403,
            Error::UnknownParallelMode => 404,
            Error::ThreadPoolError(_) => 405,
            Error::NotImplemented(_) => 406,
            Error::DuplicateName(_) => 407,
            Error::NotFound(_) => 408,
            Error::InvalidState(_) => 409,
        }
    }

    /// True if this error belongs to the `Runtime` kind (codes 400-499).
    ///
    /// Engines use this to decide whether an error is something a node
    /// produced (propagate as-is) versus a structural graph problem.
    #[must_use]
    pub fn is_runtime(&self) -> bool {
        (400..500).contains(&self.code())
    }
}
