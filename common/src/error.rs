//! Error taxonomy shared by every stage of the detection pipeline.
//!
//! The variants mirror the propagation policy in the specification: some
//! are local to a single process and get absorbed by the caller
//! (`NotFound`, `PermissionDenied`, `Io`, `InvalidFormat`), others corrupt a
//! pass-global invariant and must abort the pass (`OutOfMemory`,
//! `InvalidArgument`, `GraphFull`).

use thiserror::Error;

/// Errors produced anywhere in the kernel-view → snapshot → RAG → cycle →
/// classifier pipeline.
#[derive(Error, Debug)]
pub enum Error {
    /// The process vanished between enumeration and read. Expected and
    /// non-fatal; the caller skips this process and continues the pass.
    #[error("process {0} not found")]
    NotFound(i32),

    /// The observer lacks permission to inspect this process.
    #[error("permission denied reading process {0}")]
    PermissionDenied(i32),

    /// Any other reader failure (malformed path, unreadable file, ...).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A pass-global allocation failed. Fatal for the current pass.
    #[error("out of memory: {0}")]
    OutOfMemory(String),

    /// A caller passed a value outside the contract of the operation.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The graph's pre-declared vertex capacity is exhausted.
    #[error("resource allocation graph is full (capacity {capacity})")]
    GraphFull { capacity: usize },

    /// A kernel-view record did not parse per its format contract.
    #[error("invalid format: {0}")]
    InvalidFormat(String),
}

/// Result alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// True for errors that are local to one process and should be
    /// absorbed by the caller rather than aborting the pass.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Error::NotFound(_) | Error::PermissionDenied(_) | Error::Io(_) | Error::InvalidFormat(_)
        )
    }
}
