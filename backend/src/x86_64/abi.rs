use crate::classify::RegisterBudget;
use crate::x86_64::regs::Reg;

/// A native x86-64 calling convention.
#[derive(Debug)]
pub struct Abi {
    pub name: &'static str,
    pub int_args: &'static [Reg],
    pub float_args: &'static [Reg],
    /// Argument `i` uses register slot `i` of its class.
    pub positional: bool,
    /// Caller-reserved spill area for register arguments, directly
    /// above the return address.
    pub shadow_space: usize,
    /// AL carries an upper bound on vector registers used, for
    /// variadic callees.
    pub vector_count_in_al: bool,
}

impl Abi {
    pub fn budget(&self) -> RegisterBudget<'static, Reg> {
        RegisterBudget {
            int_regs: self.int_args,
            float_regs: self.float_args,
            positional: self.positional,
        }
    }
}

/// System V AMD64 ABI (Linux, BSD, macOS).
pub static SYSV: Abi = Abi {
    name: "x86-64 System V",
    int_args: &[Reg::Rdi, Reg::Rsi, Reg::Rdx, Reg::Rcx, Reg::R8, Reg::R9],
    float_args: &[
        Reg::Xmm0,
        Reg::Xmm1,
        Reg::Xmm2,
        Reg::Xmm3,
        Reg::Xmm4,
        Reg::Xmm5,
        Reg::Xmm6,
        Reg::Xmm7,
    ],
    positional: false,
    shadow_space: 0,
    vector_count_in_al: true,
};

/// Microsoft x64 calling convention (Windows).
pub static WIN64: Abi = Abi {
    name: "x86-64 Microsoft",
    int_args: &[Reg::Rcx, Reg::Rdx, Reg::R8, Reg::R9],
    float_args: &[Reg::Xmm0, Reg::Xmm1, Reg::Xmm2, Reg::Xmm3],
    positional: true,
    shadow_space: 32,
    vector_count_in_al: false,
};

#[cfg(windows)]
pub static HOST_ABI: &Abi = &WIN64;
#[cfg(not(windows))]
pub static HOST_ABI: &Abi = &SYSV;
