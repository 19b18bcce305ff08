/// x86-64 registers usable by the trampoline encoder.
///
/// General-purpose registers come first in ModR/M and REX numbering,
/// followed by the SSE registers. `code()` yields the 4-bit encoding
/// number within the register's own file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Reg {
    Rax = 0,
    Rcx = 1,
    Rdx = 2,
    Rbx = 3,
    Rsp = 4,
    Rbp = 5,
    Rsi = 6,
    Rdi = 7,
    R8 = 8,
    R9 = 9,
    R10 = 10,
    R11 = 11,
    R12 = 12,
    R13 = 13,
    R14 = 14,
    R15 = 15,
    Xmm0 = 16,
    Xmm1 = 17,
    Xmm2 = 18,
    Xmm3 = 19,
    Xmm4 = 20,
    Xmm5 = 21,
    Xmm6 = 22,
    Xmm7 = 23,
    Xmm8 = 24,
    Xmm9 = 25,
    Xmm10 = 26,
    Xmm11 = 27,
    Xmm12 = 28,
    Xmm13 = 29,
    Xmm14 = 30,
    Xmm15 = 31,
}

impl Reg {
    /// Encoding number (0-15) within the register file.
    #[inline]
    pub const fn code(self) -> u8 {
        (self as u8) & 0xF
    }

    /// Low 3 bits of the register encoding (for ModR/M).
    #[inline]
    pub const fn low3(self) -> u8 {
        (self as u8) & 0x7
    }

    #[inline]
    pub const fn is_xmm(self) -> bool {
        (self as u8) >= 16
    }
}

/// Frame base register of every trampoline.
pub const FRAME_REG: Reg = Reg::Rbp;

/// Holds the callee address at each call site. Caller-saved and never
/// an argument register in either supported ABI.
pub const CALL_TARGET_REG: Reg = Reg::R11;

/// Temporary for memory-to-memory moves and address pushes.
pub const SCRATCH_REG: Reg = Reg::Rax;

pub const STACK_ALIGN: usize = 16;

/// Bytes between the frame pointer and the first caller stack
/// argument: saved frame pointer + return address.
pub const CALLER_ARGS_OFFSET: i32 = 16;
