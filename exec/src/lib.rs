//! Trampoline compiler façade and executable program host.
//!
//! A [`JitCompiler`] drives one [`tramp_backend::ArchEncoder`] through
//! a declare / begin / push / call / end / flush cycle; `flush` copies
//! the finished bytes into a [`Program`] backed by an
//! [`ExecutableMemory`] strategy.

pub mod compiler;
pub mod memory;
pub mod program;

pub use compiler::{host_encoder, JitCompiler};
pub use memory::{ExecutableMemory, HostMemory};
#[cfg(unix)]
pub use memory::{RwxMapping, WxMapping};
#[cfg(windows)]
pub use memory::VirtualAllocMapping;
pub use program::{EntryPoint, Program};
