//! Executable memory acquisition.
//!
//! Every strategy copies a finished instruction stream into a fresh,
//! page-rounded, private mapping and releases it on drop. The mapping
//! is never written again after `acquire` returns.

use tramp_core::JitResult;

/// A private block of executable memory holding a copy of some code.
pub trait ExecutableMemory: Sized {
    /// Map at least `code.len()` bytes, copy `code` to the start and
    /// make the block executable.
    fn acquire(code: &[u8]) -> JitResult<Self>;

    /// Base address of the block.
    fn as_ptr(&self) -> *const u8;

    /// Mapped size in bytes (page-rounded).
    fn capacity(&self) -> usize;
}

#[cfg(unix)]
pub use self::unix::{RwxMapping, WxMapping};
#[cfg(windows)]
pub use self::windows::VirtualAllocMapping;

/// Build-time default strategy.
#[cfg(unix)]
pub type HostMemory = WxMapping;
#[cfg(windows)]
pub type HostMemory = VirtualAllocMapping;

#[inline]
fn round_to_page(len: usize, page: usize) -> usize {
    (len.max(1) + page - 1) & !(page - 1)
}

#[cfg(unix)]
mod unix {
    use std::ptr;

    use log::trace;
    use tramp_core::{JitError, JitResult};

    use super::{round_to_page, ExecutableMemory};

    fn page_size() -> usize {
        // SAFETY: sysconf is always safe to call.
        unsafe { libc::sysconf(libc::_SC_PAGESIZE) as usize }
    }

    /// Map `size` bytes of anonymous private memory and copy `code` in.
    fn map_copy(code: &[u8], size: usize, prot: libc::c_int) -> JitResult<*mut u8> {
        // SAFETY: mmap with MAP_ANONYMOUS | MAP_PRIVATE, no file backing.
        let ptr = unsafe {
            libc::mmap(
                ptr::null_mut(),
                size,
                prot,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };
        if ptr == libc::MAP_FAILED {
            return Err(JitError::last_os_error("mmap"));
        }
        let ptr = ptr as *mut u8;
        // SAFETY: the mapping is writable and at least code.len() bytes.
        unsafe { ptr::copy_nonoverlapping(code.as_ptr(), ptr, code.len()) };
        trace!("mapped {size} bytes at {ptr:p} for {} bytes of code", code.len());
        Ok(ptr)
    }

    fn unmap(ptr: *mut u8, size: usize) {
        // SAFETY: ptr/size describe a mapping owned by the caller.
        unsafe {
            libc::munmap(ptr as *mut libc::c_void, size);
        }
    }

    /// Read+write+execute anonymous mapping.
    #[derive(Debug)]
    pub struct RwxMapping {
        ptr: *mut u8,
        size: usize,
    }

    // SAFETY: the mapping is owned exclusively and immutable after acquire.
    unsafe impl Send for RwxMapping {}
    unsafe impl Sync for RwxMapping {}

    impl ExecutableMemory for RwxMapping {
        fn acquire(code: &[u8]) -> JitResult<Self> {
            let size = round_to_page(code.len(), page_size());
            let ptr = map_copy(
                code,
                size,
                libc::PROT_READ | libc::PROT_WRITE | libc::PROT_EXEC,
            )?;
            Ok(Self { ptr, size })
        }

        fn as_ptr(&self) -> *const u8 {
            self.ptr
        }

        fn capacity(&self) -> usize {
            self.size
        }
    }

    impl Drop for RwxMapping {
        fn drop(&mut self) {
            unmap(self.ptr, self.size);
        }
    }

    /// W^X mapping: written while read+write, then switched to
    /// read+execute before first use.
    #[derive(Debug)]
    pub struct WxMapping {
        ptr: *mut u8,
        size: usize,
    }

    // SAFETY: the mapping is owned exclusively and read-only after acquire.
    unsafe impl Send for WxMapping {}
    unsafe impl Sync for WxMapping {}

    impl ExecutableMemory for WxMapping {
        fn acquire(code: &[u8]) -> JitResult<Self> {
            let size = round_to_page(code.len(), page_size());
            let ptr = map_copy(code, size, libc::PROT_READ | libc::PROT_WRITE)?;
            // SAFETY: ptr/size describe the mapping created above.
            let ret = unsafe {
                libc::mprotect(
                    ptr as *mut libc::c_void,
                    size,
                    libc::PROT_READ | libc::PROT_EXEC,
                )
            };
            if ret != 0 {
                let err = JitError::last_os_error("mprotect");
                unmap(ptr, size);
                return Err(err);
            }
            Ok(Self { ptr, size })
        }

        fn as_ptr(&self) -> *const u8 {
            self.ptr
        }

        fn capacity(&self) -> usize {
            self.size
        }
    }

    impl Drop for WxMapping {
        fn drop(&mut self) {
            unmap(self.ptr, self.size);
        }
    }
}

#[cfg(windows)]
mod windows {
    use std::ptr;

    use log::trace;
    use tramp_core::{JitError, JitResult};
    use windows_sys::Win32::System::Diagnostics::Debug::FlushInstructionCache;
    use windows_sys::Win32::System::Memory::{
        VirtualAlloc, VirtualFree, VirtualProtect, MEM_COMMIT, MEM_RELEASE, MEM_RESERVE,
        PAGE_EXECUTE_READ, PAGE_PROTECTION_FLAGS, PAGE_READWRITE,
    };
    use windows_sys::Win32::System::SystemInformation::{GetSystemInfo, SYSTEM_INFO};
    use windows_sys::Win32::System::Threading::GetCurrentProcess;

    use super::{round_to_page, ExecutableMemory};

    fn page_size() -> usize {
        // SAFETY: GetSystemInfo fills the zeroed struct.
        unsafe {
            let mut info: SYSTEM_INFO = std::mem::zeroed();
            GetSystemInfo(&mut info);
            info.dwPageSize as usize
        }
    }

    /// `VirtualAlloc` read+write, copy, then `VirtualProtect` to
    /// read+execute.
    #[derive(Debug)]
    pub struct VirtualAllocMapping {
        ptr: *mut u8,
        size: usize,
    }

    // SAFETY: the block is owned exclusively and read-only after acquire.
    unsafe impl Send for VirtualAllocMapping {}
    unsafe impl Sync for VirtualAllocMapping {}

    impl ExecutableMemory for VirtualAllocMapping {
        fn acquire(code: &[u8]) -> JitResult<Self> {
            let size = round_to_page(code.len(), page_size());
            // SAFETY: fresh reservation, no address hint.
            let ptr = unsafe {
                VirtualAlloc(ptr::null(), size, MEM_COMMIT | MEM_RESERVE, PAGE_READWRITE)
            } as *mut u8;
            if ptr.is_null() {
                return Err(JitError::last_os_error("VirtualAlloc"));
            }
            let block = Self { ptr, size };

            // SAFETY: the block is writable and at least code.len() bytes.
            unsafe { ptr::copy_nonoverlapping(code.as_ptr(), ptr, code.len()) };

            let mut old: PAGE_PROTECTION_FLAGS = 0;
            // SAFETY: ptr/size describe the block allocated above.
            let ok = unsafe { VirtualProtect(ptr as *const _, size, PAGE_EXECUTE_READ, &mut old) };
            if ok == 0 {
                // `block` is released on return.
                return Err(JitError::last_os_error("VirtualProtect"));
            }
            // SAFETY: flushing our own process's freshly written code.
            unsafe { FlushInstructionCache(GetCurrentProcess(), ptr as *const _, size) };
            trace!("allocated {size} bytes at {ptr:p} for {} bytes of code", code.len());
            Ok(block)
        }

        fn as_ptr(&self) -> *const u8 {
            self.ptr
        }

        fn capacity(&self) -> usize {
            self.size
        }
    }

    impl Drop for VirtualAllocMapping {
        fn drop(&mut self) {
            // SAFETY: ptr is the base of a block owned by self.
            unsafe {
                VirtualFree(self.ptr as *mut _, 0, MEM_RELEASE);
            }
        }
    }
}
