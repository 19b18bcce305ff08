pub mod classify;
pub mod x86;
pub mod x86_64;

pub use classify::{CallPlan, Placement, RegisterBudget};
pub use x86::X86Encoder;
pub use x86_64::X86_64Encoder;

use tramp_core::{Arg, CallConv, CodeBuffer, FrameLayout, JitResult, LiteralPool};

/// One native call to emit.
#[derive(Debug, Clone, Copy)]
pub struct CallSite<'a> {
    pub args: &'a [Arg],
    /// Absolute address of the callee.
    pub target: u64,
    pub conv: CallConv,
    pub far: bool,
}

/// Trait for trampoline instruction encoders.
///
/// Each (instruction set, native calling convention) pair implements
/// this trait to turn frame metadata and pending arguments into
/// machine code.
pub trait ArchEncoder {
    /// Short architecture name for diagnostics.
    fn name(&self) -> &'static str;

    /// Width of a native pointer in bytes.
    fn pointer_size(&self) -> usize;

    /// Emit the prologue: save the caller's frame pointer, allocate
    /// `frame`, and copy every declared parameter from its ABI
    /// location into its home slot.
    fn emit_prologue(&mut self, buf: &mut CodeBuffer, frame: &FrameLayout);

    /// Emit the epilogue: release the frame, restore the caller's
    /// frame pointer and return. The return registers are left as the
    /// last native call set them.
    fn emit_epilogue(&mut self, buf: &mut CodeBuffer, frame: &FrameLayout);

    /// Emit one native call. Literals that need a deferred load are
    /// recorded in `literals`.
    ///
    /// Argument indices must already be validated against `frame`.
    /// Returns an error only for requests rejected before any byte is
    /// written.
    fn emit_call(
        &mut self,
        buf: &mut CodeBuffer,
        frame: &FrameLayout,
        literals: &mut LiteralPool,
        call: &CallSite<'_>,
    ) -> JitResult<()>;
}
