use std::io;

use thiserror::Error;

/// Errors reported by the trampoline compiler and program host.
#[derive(Debug, Error)]
pub enum JitError {
    #[error("entry parameters and scratch allocations are frozen after begin()")]
    FrameFrozen,

    #[error("no trampoline is being built; call begin() first")]
    NotBuilding,

    #[error("begin() called while a trampoline is already being built")]
    AlreadyBuilding,

    #[error("trampoline is unfinished; call end() before flushing")]
    Unfinished,

    #[error("previous trampoline has not been flushed")]
    Unflushed,

    #[error("{count} pushed arguments were never passed to func_call()")]
    PendingArgs { count: usize },

    #[error("too many entry parameters: {count} (limit {limit})")]
    TooManyParameters { count: usize, limit: usize },

    #[error("too many scratch allocations (limit {limit})")]
    TooManyScratch { limit: usize },

    #[error("entry parameter index {index} out of range ({declared} declared)")]
    ParameterIndex { index: u8, declared: usize },

    #[error("scratch allocation index {index} out of range ({declared} declared)")]
    ScratchIndex { index: u8, declared: usize },

    #[error("far calls are not supported on {arch}")]
    FarCallUnsupported { arch: &'static str },

    #[error("stack frame of {size} bytes exceeds the 32-bit displacement range")]
    DisplacementRange { size: usize },

    #[error("executable memory {op} failed: {source}")]
    Memory {
        op: &'static str,
        #[source]
        source: io::Error,
    },
}

impl JitError {
    /// Wrap the calling thread's last OS error.
    pub fn last_os_error(op: &'static str) -> Self {
        JitError::Memory {
            op,
            source: io::Error::last_os_error(),
        }
    }
}

pub type JitResult<T> = Result<T, JitError>;
