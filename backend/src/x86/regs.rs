/// IA-32 registers usable by the trampoline encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Reg {
    Eax = 0,
    Ecx = 1,
    Edx = 2,
    Ebx = 3,
    Esp = 4,
    Ebp = 5,
    Esi = 6,
    Edi = 7,
    Xmm0 = 8,
    Xmm1 = 9,
    Xmm2 = 10,
    Xmm3 = 11,
    Xmm4 = 12,
    Xmm5 = 13,
    Xmm6 = 14,
    Xmm7 = 15,
}

impl Reg {
    /// 3-bit ModR/M encoding within the register file.
    #[inline]
    pub const fn code(self) -> u8 {
        (self as u8) & 0x7
    }

    #[inline]
    pub const fn is_xmm(self) -> bool {
        (self as u8) >= 8
    }
}

pub const FRAME_REG: Reg = Reg::Ebp;
pub const CALL_TARGET_REG: Reg = Reg::Eax;
pub const SCRATCH_REG: Reg = Reg::Eax;
pub const FLOAT_SCRATCH_REG: Reg = Reg::Xmm0;

/// Argument registers of the register-passing conventions.
pub const THISCALL_ARGS: &[Reg] = &[Reg::Ecx];
pub const FASTCALL_ARGS: &[Reg] = &[Reg::Ecx, Reg::Edx];

pub const STACK_ALIGN: usize = 16;

/// Bytes between the frame pointer and the first caller stack
/// argument: saved frame pointer + return address.
pub const CALLER_ARGS_OFFSET: i32 = 8;
