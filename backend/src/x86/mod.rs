pub mod emitter;
pub mod encoder;
pub mod regs;

pub use encoder::X86Encoder;
pub use regs::Reg;
