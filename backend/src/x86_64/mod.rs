pub mod abi;
pub mod emitter;
pub mod encoder;
pub mod regs;

pub use abi::{Abi, HOST_ABI, SYSV, WIN64};
pub use encoder::X86_64Encoder;
pub use regs::Reg;
