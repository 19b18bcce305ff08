use log::{debug, trace};
use tramp_core::{
    Arg, ArgSource, ArgType, CallConv, CodeBuffer, FrameLayout, JitResult, LiteralPool,
};

use crate::classify::{CallPlan, Placement, RegisterBudget};
use crate::x86::emitter::*;
use crate::x86::regs::{
    Reg, CALLER_ARGS_OFFSET, CALL_TARGET_REG, FASTCALL_ARGS, FLOAT_SCRATCH_REG, FRAME_REG,
    SCRATCH_REG, STACK_ALIGN, THISCALL_ARGS,
};
use crate::{ArchEncoder, CallSite};

/// IA-32 trampoline encoder.
///
/// The trampoline itself is entered with the cdecl convention: every
/// declared parameter is read from the caller's stack. Floating-point
/// arguments never travel in registers on this target, so no literal
/// ever needs a deferred load.
#[derive(Debug, Default)]
pub struct X86Encoder {
    calls: usize,
}

impl X86Encoder {
    pub fn new() -> Self {
        Self { calls: 0 }
    }

    /// Register budget of a calling convention.
    pub fn budget(conv: CallConv) -> RegisterBudget<'static, Reg> {
        let int_regs: &'static [Reg] = match conv {
            CallConv::CDecl | CallConv::StdCall => &[],
            CallConv::ThisCall => THISCALL_ARGS,
            CallConv::FastCall => FASTCALL_ARGS,
        };
        RegisterBudget {
            int_regs,
            float_regs: &[],
            positional: false,
        }
    }

    /// Classify a call's arguments for `conv`. 64-bit integers always
    /// go on the stack.
    pub fn classify(args: &[Arg], conv: CallConv) -> CallPlan<Reg> {
        CallPlan::classify(args, &Self::budget(conv), |ty| ty != ArgType::QWord)
    }

    fn push_arg(&self, buf: &mut CodeBuffer, frame: &FrameLayout, arg: &Arg) {
        match arg.source {
            ArgSource::Literal => {
                if stack_size(arg.ty) == 8 {
                    emit_push_imm(buf, (arg.value >> 32) as u32 as i32);
                }
                emit_push_imm(buf, arg.value as u32 as i32);
            }
            ArgSource::Forwarded(i) => {
                let off = -home_offset(frame, i);
                if stack_size(arg.ty) == 8 {
                    emit_push_mem(buf, FRAME_REG, off + 4);
                }
                emit_push_mem(buf, FRAME_REG, off);
            }
            ArgSource::Scratch(i) => {
                emit_lea(buf, SCRATCH_REG, FRAME_REG, -scratch_offset(frame, i));
                emit_push(buf, SCRATCH_REG);
            }
        }
    }

    fn load_arg(&self, buf: &mut CodeBuffer, frame: &FrameLayout, reg: Reg, arg: &Arg) {
        match arg.source {
            ArgSource::Literal => emit_mov_ri(buf, reg, arg.value as u32),
            ArgSource::Forwarded(i) => {
                let off = -home_offset(frame, i);
                match arg.ty {
                    ArgType::Byte => emit_load_zx(buf, OPC_MOVZBL, reg, FRAME_REG, off),
                    ArgType::Word => emit_load_zx(buf, OPC_MOVZWL, reg, FRAME_REG, off),
                    _ => emit_load(buf, reg, FRAME_REG, off),
                }
            }
            ArgSource::Scratch(i) => {
                emit_lea(buf, reg, FRAME_REG, -scratch_offset(frame, i));
            }
        }
    }
}

impl ArchEncoder for X86Encoder {
    fn name(&self) -> &'static str {
        "x86"
    }

    fn pointer_size(&self) -> usize {
        4
    }

    fn emit_prologue(&mut self, buf: &mut CodeBuffer, frame: &FrameLayout) {
        self.calls = 0;

        emit_push(buf, FRAME_REG);
        emit_mov_rr(buf, FRAME_REG, Reg::Esp);
        if frame.size() > 0 {
            emit_arith_ri(buf, ArithOp::Sub, Reg::Esp, frame.size() as i32);
        }

        let mut src = CALLER_ARGS_OFFSET;
        for slot in frame.params() {
            let dst = -slot.offset;
            match slot.ty {
                ArgType::Float | ArgType::Double => {
                    let double = slot.ty == ArgType::Double;
                    emit_sse_load(buf, double, FLOAT_SCRATCH_REG, FRAME_REG, src);
                    emit_sse_store(buf, double, FLOAT_SCRATCH_REG, FRAME_REG, dst);
                }
                ty => {
                    emit_load(buf, SCRATCH_REG, FRAME_REG, src);
                    emit_store(buf, SCRATCH_REG, FRAME_REG, dst);
                    if stack_size(ty) == 8 {
                        emit_load(buf, SCRATCH_REG, FRAME_REG, src + 4);
                        emit_store(buf, SCRATCH_REG, FRAME_REG, dst + 4);
                    }
                }
            }
            trace!("home {} at ebp-{} from ebp+{}", slot.ty.name(), slot.offset, src);
            src += stack_size(slot.ty) as i32;
        }
        debug!(
            "x86: prologue, {} params, frame {} bytes",
            frame.params().len(),
            frame.size()
        );
    }

    fn emit_epilogue(&mut self, buf: &mut CodeBuffer, frame: &FrameLayout) {
        if frame.size() > 0 {
            emit_arith_ri(buf, ArithOp::Add, Reg::Esp, frame.size() as i32);
        }
        emit_pop(buf, FRAME_REG);
        emit_ret(buf);
    }

    fn emit_call(
        &mut self,
        buf: &mut CodeBuffer,
        frame: &FrameLayout,
        _literals: &mut LiteralPool,
        call: &CallSite<'_>,
    ) -> JitResult<()> {
        let args = call.args;
        let plan = Self::classify(args, call.conv);
        let stack_bytes: usize = plan.stack_args_rev().map(|i| stack_size(args[i].ty)).sum();
        // Entry ESP + 4 is 16-byte aligned; the saved EBP and the frame
        // sit between it and the outgoing arguments.
        let below = 8 + frame.size() + stack_bytes;
        let pad = (STACK_ALIGN - below % STACK_ALIGN) % STACK_ALIGN;

        if pad > 0 {
            emit_arith_ri(buf, ArithOp::Sub, Reg::Esp, pad as i32);
        }
        for i in plan.stack_args_rev() {
            self.push_arg(buf, frame, &args[i]);
        }
        for (i, placement) in plan.placements().iter().enumerate() {
            if let Placement::Reg(reg) = *placement {
                trace!("arg {i}: {} -> {reg:?}", args[i].ty.name());
                self.load_arg(buf, frame, reg, &args[i]);
            }
        }

        if call.far {
            emit_push_cs(buf);
        }
        emit_mov_ri(buf, CALL_TARGET_REG, call.target as u32);
        emit_call_reg(buf, CALL_TARGET_REG);

        let cleanup = if call.conv.callee_cleanup() {
            pad
        } else {
            stack_bytes + pad
        };
        if cleanup > 0 {
            emit_arith_ri(buf, ArithOp::Add, Reg::Esp, cleanup as i32);
        }

        self.calls += 1;
        debug!(
            "x86: {:?} call #{} to {:#x}, {} args, {} stack bytes",
            call.conv, self.calls, call.target, args.len(), stack_bytes
        );
        Ok(())
    }
}

/// Size of a cdecl stack slot for `ty`.
pub fn stack_size(ty: ArgType) -> usize {
    match ty {
        ArgType::QWord | ArgType::Double => 8,
        _ => 4,
    }
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
