use log::{debug, trace, warn};
use tramp_core::{
    Arg, ArgSource, ArgType, CallConv, CodeBuffer, FrameLayout, JitError, JitResult, LiteralPool,
};

use crate::classify::{CallPlan, Placement};
use crate::x86_64::abi::{Abi, HOST_ABI};
use crate::x86_64::emitter::*;
use crate::x86_64::regs::{
    Reg, CALLER_ARGS_OFFSET, CALL_TARGET_REG, FRAME_REG, SCRATCH_REG, STACK_ALIGN,
};
use crate::{ArchEncoder, CallSite};

/// x86-64 trampoline encoder for one native ABI.
///
/// Frame: `push rbp; mov rbp, rsp; sub rsp, frame.size()`. After the
/// prologue RSP is 16-byte aligned minus `frame.size()`, and every
/// call site pads so that RSP is 16-byte aligned at the `call`.
#[derive(Debug)]
pub struct X86_64Encoder {
    abi: &'static Abi,
    /// Number of calls emitted since the last prologue.
    calls: usize,
}

impl X86_64Encoder {
    /// Encoder for the host's native ABI.
    pub fn new() -> Self {
        Self::with_abi(HOST_ABI)
    }

    pub fn with_abi(abi: &'static Abi) -> Self {
        Self { abi, calls: 0 }
    }

    /// Classify a list of types against this ABI's argument registers.
    pub fn classify(&self, types: impl IntoIterator<Item = ArgType>) -> CallPlan<Reg> {
        CallPlan::classify_types(types, &self.abi.budget(), |_| true)
    }

    /// Push one argument as an 8-byte stack slot.
    fn push_arg(&self, buf: &mut CodeBuffer, frame: &FrameLayout, arg: &Arg) {
        match arg.source {
            ArgSource::Literal => {
                if arg.ty.size() <= 4 {
                    // Only the low bytes are significant in a narrow slot.
                    emit_push_imm(buf, arg.value as u32 as i32);
                } else if let Ok(imm) = i32::try_from(arg.value as i64) {
                    emit_push_imm(buf, imm);
                } else {
                    emit_mov_ri(buf, true, SCRATCH_REG, arg.value);
                    emit_push(buf, SCRATCH_REG);
                }
            }
            ArgSource::Forwarded(i) => {
                emit_push_mem(buf, FRAME_REG, -home_offset(frame, i));
            }
            ArgSource::Scratch(i) => {
                emit_lea(buf, SCRATCH_REG, FRAME_REG, -scratch_offset(frame, i));
                emit_push(buf, SCRATCH_REG);
            }
        }
    }

    /// Materialize one argument in its destination register.
    fn load_arg(
        &self,
        buf: &mut CodeBuffer,
        frame: &FrameLayout,
        literals: &mut LiteralPool,
        reg: Reg,
        arg: &Arg,
    ) {
        let double = arg.ty == ArgType::Double;
        match (arg.source, reg.is_xmm()) {
            (ArgSource::Literal, true) => {
                let patch = emit_sse_load_rip(buf, double, reg);
                literals.defer(&arg.literal_bytes(), patch, buf.offset());
            }
            (ArgSource::Literal, false) => {
                emit_mov_ri(buf, arg.ty.size() == 8, reg, arg.value);
            }
            (ArgSource::Forwarded(i), true) => {
                emit_sse_load(buf, double, reg, FRAME_REG, -home_offset(frame, i));
            }
            (ArgSource::Forwarded(i), false) => {
                let off = -home_offset(frame, i);
                match arg.ty {
                    ArgType::Byte => emit_load_zx(buf, OPC_MOVZBL, reg, FRAME_REG, off),
                    ArgType::Word => emit_load_zx(buf, OPC_MOVZWL, reg, FRAME_REG, off),
                    ArgType::DWord => emit_load(buf, false, reg, FRAME_REG, off),
                    _ => emit_load(buf, true, reg, FRAME_REG, off),
                }
            }
            (ArgSource::Scratch(i), false) => {
                emit_lea(buf, reg, FRAME_REG, -scratch_offset(frame, i));
            }
            (ArgSource::Scratch(_), true) => {
                panic!("scratch address classified into {reg:?}");
            }
        }
    }
}

impl Default for X86_64Encoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchEncoder for X86_64Encoder {
    fn name(&self) -> &'static str {
        self.abi.name
    }

    fn pointer_size(&self) -> usize {
        8
    }

    fn emit_prologue(&mut self, buf: &mut CodeBuffer, frame: &FrameLayout) {
        self.calls = 0;

        emit_push(buf, FRAME_REG);
        emit_mov_rr(buf, true, FRAME_REG, Reg::Rsp);
        if frame.size() > 0 {
            emit_arith_ri(buf, ArithOp::Sub, true, Reg::Rsp, frame_imm(frame));
        }

        // Home every declared parameter.
        let plan = self.classify(frame.params().iter().map(|s| s.ty));
        let mut stack_index = 0i32;
        for (slot, placement) in frame.params().iter().zip(plan.placements()) {
            match *placement {
                Placement::Reg(r) if r.is_xmm() => {
                    emit_sse_spill(buf, r, FRAME_REG, -slot.offset);
                }
                Placement::Reg(r) => {
                    emit_store(buf, true, r, FRAME_REG, -slot.offset);
                }
                Placement::Stack => {
                    let src =
                        CALLER_ARGS_OFFSET + self.abi.shadow_space as i32 + 8 * stack_index;
                    emit_load(buf, true, SCRATCH_REG, FRAME_REG, src);
                    emit_store(buf, true, SCRATCH_REG, FRAME_REG, -slot.offset);
                    stack_index += 1;
                }
            }
            trace!("home {} at rbp-{} from {:?}", slot.ty.name(), slot.offset, placement);
        }
        debug!(
            "{}: prologue, {} params, frame {} bytes",
            self.abi.name,
            frame.params().len(),
            frame.size()
        );
    }

    fn emit_epilogue(&mut self, buf: &mut CodeBuffer, frame: &FrameLayout) {
        if frame.size() > 0 {
            emit_arith_ri(buf, ArithOp::Add, true, Reg::Rsp, frame_imm(frame));
        }
        emit_pop(buf, FRAME_REG);
        emit_ret(buf);
    }

    fn emit_call(
        &mut self,
        buf: &mut CodeBuffer,
        frame: &FrameLayout,
        literals: &mut LiteralPool,
        call: &CallSite<'_>,
    ) -> JitResult<()> {
        if call.far {
            return Err(JitError::FarCallUnsupported { arch: "x86-64" });
        }
        if call.conv != CallConv::CDecl {
            warn!("{}: {:?} has no effect on x86-64", self.abi.name, call.conv);
        }

        let args = call.args;
        let plan = CallPlan::classify(args, &self.abi.budget(), |_| true);
        let stack_bytes = 8 * plan.stack_count();
        let pad = (STACK_ALIGN - (frame.size() + stack_bytes) % STACK_ALIGN) % STACK_ALIGN;

        if pad > 0 {
            emit_arith_ri(buf, ArithOp::Sub, true, Reg::Rsp, pad as i32);
        }
        for i in plan.stack_args_rev() {
            self.push_arg(buf, frame, &args[i]);
        }
        if self.abi.shadow_space > 0 {
            emit_arith_ri(buf, ArithOp::Sub, true, Reg::Rsp, self.abi.shadow_space as i32);
        }
        for (i, reg) in plan.register_args() {
            trace!("arg {i}: {} -> {reg:?}", args[i].ty.name());
            self.load_arg(buf, frame, literals, reg, &args[i]);
        }

        if self.abi.vector_count_in_al {
            let count = plan.float_reg_count(args) as u64;
            emit_mov_ri(buf, false, Reg::Rax, count);
        }
        emit_mov_ri(buf, true, CALL_TARGET_REG, call.target);
        emit_call_reg(buf, CALL_TARGET_REG);

        let cleanup = stack_bytes + pad + self.abi.shadow_space;
        if cleanup > 0 {
            emit_arith_ri(buf, ArithOp::Add, true, Reg::Rsp, cleanup as i32);
        }

        self.calls += 1;
        debug!(
            "{}: call #{} to {:#x}, {} args, {} on stack",
            self.abi.name,
            self.calls,
            call.target,
            args.len(),
            plan.stack_count()
        );
        Ok(())
    }
}

fn frame_imm(frame: &FrameLayout) -> i32 {
    // FrameLayout caps its size at i32::MAX.
    frame.size() as i32
}

fn home_offset(frame: &FrameLayout, index: u8) -> i32 {
    match frame.param(index) {
        Some(slot) => slot.offset,
        None => panic!("entry parameter {index} has no home slot"),
    }
}

fn scratch_offset(frame: &FrameLayout, index: u8) -> i32 {
    match frame.scratch_slot(index) {
        Some(slot) => slot.offset,
        None => panic!("scratch allocation {index} has no frame slot"),
    }
}
