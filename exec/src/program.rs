use std::fmt;

use log::debug;
use tramp_core::JitResult;

use crate::memory::{ExecutableMemory, HostMemory};

/// Signature of a trampoline entry point. The real parameter list is
/// whatever was declared before `begin()`; callers transmute to it.
pub type EntryPoint = unsafe extern "C" fn();

/// A finished trampoline in its own executable mapping.
///
/// Each program owns its memory exclusively and releases it on drop.
/// Invoking the entry point after the program is dropped is undefined.
pub struct Program<M: ExecutableMemory = HostMemory> {
    mem: M,
    len: usize,
}

impl<M: ExecutableMemory> Program<M> {
    /// Copy `code` into a fresh executable mapping.
    pub fn new(code: &[u8]) -> JitResult<Self> {
        let mem = M::acquire(code)?;
        debug!(
            "program: {} bytes at {:p} ({} mapped)",
            code.len(),
            mem.as_ptr(),
            mem.capacity()
        );
        Ok(Self {
            mem,
            len: code.len(),
        })
    }

    /// Address of the first instruction.
    pub fn entry_point(&self) -> EntryPoint {
        // SAFETY: the mapping is executable and starts with the
        // trampoline prologue.
        unsafe { std::mem::transmute::<*const u8, EntryPoint>(self.mem.as_ptr()) }
    }

    pub fn as_ptr(&self) -> *const u8 {
        self.mem.as_ptr()
    }

    /// Length of the copied code in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The code as mapped.
    pub fn code(&self) -> &[u8] {
        // SAFETY: the mapping is readable for at least `len` bytes and
        // never written after acquire.
        unsafe { std::slice::from_raw_parts(self.mem.as_ptr(), self.len) }
    }

    pub fn memory(&self) -> &M {
        &self.mem
    }
}

impl<M: ExecutableMemory> fmt::Debug for Program<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Program")
            .field("ptr", &self.mem.as_ptr())
            .field("len", &self.len)
            .finish()
    }
}
