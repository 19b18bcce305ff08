use crate::arg::ArgType;
use crate::error::{JitError, JitResult};

/// Maximum number of declared entry parameters.
pub const MAX_PARAMS: usize = 15;

/// Frame slot holding a copy of one declared entry parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HomeSlot {
    pub ty: ArgType,
    /// Distance below the frame pointer; the slot starts at `fp - offset`.
    pub offset: i32,
}

/// Frame slot reserved for one scratch allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScratchSlot {
    /// Requested size in bytes.
    pub size: u32,
    /// Distance below the frame pointer; the buffer starts at `fp - offset`.
    pub offset: i32,
}

/// Stack frame of one trampoline, below its saved frame pointer.
///
/// ```text
///   fp + 8*k ...   caller frame (return address, stack parameters)
///   fp             saved frame pointer
///   fp - 8         home slot 0        (8 bytes integer, 16 bytes floating)
///   ...            home slot n-1
///   ...            scratch 0 .. m-1   (each rounded up to 8 bytes)
///   sp = fp - size
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameLayout {
    params: Vec<HomeSlot>,
    scratch: Vec<ScratchSlot>,
    home_bytes: usize,
    scratch_bytes: usize,
}

impl FrameLayout {
    pub fn new(params: &[ArgType], scratch: &[u32]) -> JitResult<Self> {
        if params.len() > MAX_PARAMS {
            return Err(JitError::TooManyParameters {
                count: params.len(),
                limit: MAX_PARAMS,
            });
        }

        let mut cursor = 0usize;
        let mut homes = Vec::with_capacity(params.len());
        for &ty in params {
            cursor += ty.home_size();
            homes.push(HomeSlot {
                ty,
                offset: cursor as i32,
            });
        }
        let home_bytes = cursor;

        // Summed in u64: a 32-bit usize cannot hold an oversized request.
        let mut wide = cursor as u64;
        let mut slots = Vec::with_capacity(scratch.len());
        for &size in scratch {
            wide += (size as u64 + 7) & !7;
            if wide > i32::MAX as u64 {
                return Err(JitError::DisplacementRange {
                    size: usize::try_from(wide).unwrap_or(usize::MAX),
                });
            }
            slots.push(ScratchSlot {
                size,
                offset: wide as i32,
            });
        }
        let cursor = wide as usize;

        Ok(Self {
            params: homes,
            scratch: slots,
            home_bytes,
            scratch_bytes: cursor - home_bytes,
        })
    }

    pub fn params(&self) -> &[HomeSlot] {
        &self.params
    }

    pub fn param(&self, index: u8) -> Option<&HomeSlot> {
        self.params.get(index as usize)
    }

    pub fn scratch(&self) -> &[ScratchSlot] {
        &self.scratch
    }

    pub fn scratch_slot(&self, index: u8) -> Option<&ScratchSlot> {
        self.scratch.get(index as usize)
    }

    /// Bytes used by parameter home slots: 8 per integer-like and 16
    /// per floating parameter.
    pub fn home_bytes(&self) -> usize {
        self.home_bytes
    }

    pub fn scratch_bytes(&self) -> usize {
        self.scratch_bytes
    }

    /// Total stack adjustment below the saved frame pointer.
    pub fn size(&self) -> usize {
        self.home_bytes + self.scratch_bytes
    }
}
