#![allow(non_upper_case_globals)]

use tramp_core::{CodeBuffer, Displacement};

use crate::x86_64::regs::Reg;

// -- Prefix flags --

pub const P_EXT: u32 = 0x100; // 0x0F prefix
pub const P_REXW: u32 = 0x1000; // REX.W = 1
pub const P_SIMDF3: u32 = 0x20000; // 0xF3 prefix
pub const P_SIMDF2: u32 = 0x40000; // 0xF2 prefix

// -- Opcode constants (OPC_*) --

pub const OPC_ARITH_EvIb: u32 = 0x83;
pub const OPC_ARITH_EvIz: u32 = 0x81;

pub const OPC_MOVL_EvGv: u32 = 0x89;
pub const OPC_MOVL_GvEv: u32 = 0x8B;
pub const OPC_MOVL_EvIz: u32 = 0xC7;
pub const OPC_MOVL_Iv: u32 = 0xB8;
pub const OPC_XORL_EvGv: u32 = 0x31;

pub const OPC_MOVZBL: u32 = 0xB6 | P_EXT;
pub const OPC_MOVZWL: u32 = 0xB7 | P_EXT;

pub const OPC_MOVSS_VxWx: u32 = 0x10 | P_EXT | P_SIMDF3;
pub const OPC_MOVSD_VxWx: u32 = 0x10 | P_EXT | P_SIMDF2;
pub const OPC_MOVUPS_WxVx: u32 = 0x11 | P_EXT;

pub const OPC_LEA: u32 = 0x8D;
pub const OPC_GRP5: u32 = 0xFF;
pub const OPC_PUSH_r32: u32 = 0x50;
pub const OPC_POP_r32: u32 = 0x58;
pub const OPC_PUSH_Iz: u32 = 0x68;
pub const OPC_PUSH_Ib: u32 = 0x6A;
pub const OPC_RET: u32 = 0xC3;

/// Arithmetic sub-opcodes (used in /r field of 0x81/0x83).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ArithOp {
    Add = 0,
    Sub = 5,
}

/// Group 5 extension codes (used in /r field of 0xFF).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Ext5Op {
    CallN = 2,
    PushEv = 6,
}

#[inline]
fn rexw_flag(rexw: bool) -> u32 {
    if rexw {
        P_REXW
    } else {
        0
    }
}

// -- Core encoding functions --

/// Emit prefixes, REX and opcode. `r` and `rm` are raw 4-bit register
/// codes; pass 0 for unused fields.
pub fn emit_opc(buf: &mut CodeBuffer, opc: u32, r: u8, rm: u8) {
    let mut rex: u8 = 0;
    if opc & P_REXW != 0 {
        rex |= 0x08; // REX.W
    }
    if r >= 8 {
        rex |= 0x04; // REX.R
    }
    if rm >= 8 {
        rex |= 0x01; // REX.B
    }

    // Mandatory prefixes go before REX.
    if opc & P_SIMDF3 != 0 {
        buf.emit_u8(0xF3);
    } else if opc & P_SIMDF2 != 0 {
        buf.emit_u8(0xF2);
    }

    if rex != 0 {
        buf.emit_u8(0x40 | rex);
    }
    if opc & P_EXT != 0 {
        buf.emit_u8(0x0F);
    }
    buf.emit_u8(opc as u8);
}

/// Emit opcode + ModR/M for register-register operation.
pub fn emit_modrm(buf: &mut CodeBuffer, opc: u32, r: Reg, rm: Reg) {
    emit_opc(buf, opc, r.code(), rm.code());
    buf.emit_u8(0xC0 | (r.low3() << 3) | rm.low3());
}

/// Emit opcode + ModR/M with /r extension (for group opcodes).
pub fn emit_modrm_ext(buf: &mut CodeBuffer, opc: u32, ext: u8, rm: Reg) {
    emit_opc(buf, opc, ext, rm.code());
    buf.emit_u8(0xC0 | (ext << 3) | rm.low3());
}

/// ModR/M (+SIB) + displacement for [base + offset].
/// RBP/R13 need an explicit displacement, RSP/R12 need a SIB byte.
fn emit_mem_operand(buf: &mut CodeBuffer, r3: u8, base: Reg, offset: i32) {
    let b3 = base.low3();
    if offset == 0 && b3 != 5 {
        if b3 == 4 {
            buf.emit_u8((r3 << 3) | 0x04);
            buf.emit_u8(0x24);
        } else {
            buf.emit_u8((r3 << 3) | b3);
        }
        return;
    }
    let disp = Displacement::new(offset);
    if b3 == 4 {
        buf.emit_u8(disp.modrm_mod() | (r3 << 3) | 0x04);
        buf.emit_u8(0x24);
    } else {
        buf.emit_u8(disp.modrm_mod() | (r3 << 3) | b3);
    }
    disp.emit(buf);
}

/// Emit opcode + ModR/M + displacement for memory [base + offset].
pub fn emit_modrm_offset(buf: &mut CodeBuffer, opc: u32, r: Reg, base: Reg, offset: i32) {
    emit_opc(buf, opc, r.code(), base.code());
    emit_mem_operand(buf, r.low3(), base, offset);
}

/// Emit opcode + ModR/M with /r extension for memory [base + offset].
pub fn emit_modrm_ext_offset(buf: &mut CodeBuffer, opc: u32, ext: u8, base: Reg, offset: i32) {
    emit_opc(buf, opc, ext, base.code());
    emit_mem_operand(buf, ext, base, offset);
}

/// Emit opcode + ModR/M for [rip + disp32] with a zero placeholder.
/// Returns the offset of the displacement field.
pub fn emit_modrm_rip(buf: &mut CodeBuffer, opc: u32, r: Reg) -> usize {
    emit_opc(buf, opc, r.code(), 0);
    buf.emit_u8((r.low3() << 3) | 0x05);
    let patch = buf.offset();
    Displacement::wide(0).emit(buf);
    patch
}

// -- Arithmetic --

/// Emit arithmetic reg, imm (auto-selects imm8 vs imm32).
pub fn emit_arith_ri(buf: &mut CodeBuffer, op: ArithOp, rexw: bool, dst: Reg, imm: i32) {
    let w = rexw_flag(rexw);
    if (-128..=127).contains(&imm) {
        emit_modrm_ext(buf, OPC_ARITH_EvIb | w, op as u8, dst);
        buf.emit_u8(imm as u8);
    } else {
        emit_modrm_ext(buf, OPC_ARITH_EvIz | w, op as u8, dst);
        buf.emit_u32(imm as u32);
    }
}

// -- Data movement --

/// Emit MOV reg, reg (32-bit or 64-bit).
pub fn emit_mov_rr(buf: &mut CodeBuffer, rexw: bool, dst: Reg, src: Reg) {
    emit_modrm(buf, OPC_MOVL_EvGv | rexw_flag(rexw), src, dst);
}

/// Emit MOV reg, imm using the shortest form that preserves `val`.
/// 32-bit forms zero-extend into the full register.
pub fn emit_mov_ri(buf: &mut CodeBuffer, rexw: bool, reg: Reg, val: u64) {
    if val == 0 {
        emit_modrm(buf, OPC_XORL_EvGv, reg, reg);
    } else if !rexw || val <= u32::MAX as u64 {
        emit_opc(buf, OPC_MOVL_Iv + (reg.low3() as u32), 0, reg.code());
        buf.emit_u32(val as u32);
    } else if val as i64 >= i32::MIN as i64 && val as i64 <= i32::MAX as i64 {
        emit_modrm_ext(buf, OPC_MOVL_EvIz | P_REXW, 0, reg);
        buf.emit_u32(val as u32);
    } else {
        emit_opc(buf, (OPC_MOVL_Iv + (reg.low3() as u32)) | P_REXW, 0, reg.code());
        buf.emit_u64(val);
    }
}

/// Emit MOV reg, [base+offset] (load).
pub fn emit_load(buf: &mut CodeBuffer, rexw: bool, dst: Reg, base: Reg, offset: i32) {
    emit_modrm_offset(buf, OPC_MOVL_GvEv | rexw_flag(rexw), dst, base, offset);
}

/// Emit zero-extend load: MOVZBL/MOVZWL [base+offset].
pub fn emit_load_zx(buf: &mut CodeBuffer, opc: u32, dst: Reg, base: Reg, offset: i32) {
    emit_modrm_offset(buf, opc, dst, base, offset);
}

/// Emit MOV [base+offset], reg (store).
pub fn emit_store(buf: &mut CodeBuffer, rexw: bool, src: Reg, base: Reg, offset: i32) {
    emit_modrm_offset(buf, OPC_MOVL_EvGv | rexw_flag(rexw), src, base, offset);
}

/// Emit LEA dst, [base+offset].
pub fn emit_lea(buf: &mut CodeBuffer, dst: Reg, base: Reg, offset: i32) {
    emit_modrm_offset(buf, OPC_LEA | P_REXW, dst, base, offset);
}

// -- SSE --

/// Emit MOVSS/MOVSD xmm, [base+offset].
pub fn emit_sse_load(buf: &mut CodeBuffer, double: bool, dst: Reg, base: Reg, offset: i32) {
    assert!(dst.is_xmm(), "sse load into {dst:?}");
    let opc = if double { OPC_MOVSD_VxWx } else { OPC_MOVSS_VxWx };
    emit_modrm_offset(buf, opc, dst, base, offset);
}

/// Emit MOVSS/MOVSD xmm, [rip+disp32] with a placeholder displacement.
/// Returns the offset of the displacement field.
pub fn emit_sse_load_rip(buf: &mut CodeBuffer, double: bool, dst: Reg) -> usize {
    assert!(dst.is_xmm(), "sse load into {dst:?}");
    let opc = if double { OPC_MOVSD_VxWx } else { OPC_MOVSS_VxWx };
    emit_modrm_rip(buf, opc, dst)
}

/// Emit MOVUPS [base+offset], xmm (full 16-byte spill).
pub fn emit_sse_spill(buf: &mut CodeBuffer, src: Reg, base: Reg, offset: i32) {
    assert!(src.is_xmm(), "sse spill of {src:?}");
    emit_modrm_offset(buf, OPC_MOVUPS_WxVx, src, base, offset);
}

// -- Stack and control flow --

/// Emit PUSH reg.
pub fn emit_push(buf: &mut CodeBuffer, reg: Reg) {
    emit_opc(buf, OPC_PUSH_r32 + (reg.low3() as u32), 0, reg.code());
}

/// Emit POP reg.
pub fn emit_pop(buf: &mut CodeBuffer, reg: Reg) {
    emit_opc(buf, OPC_POP_r32 + (reg.low3() as u32), 0, reg.code());
}

/// Emit PUSH imm (sign-extended to 64 bits).
pub fn emit_push_imm(buf: &mut CodeBuffer, imm: i32) {
    if (-128..=127).contains(&imm) {
        buf.emit_u8(OPC_PUSH_Ib as u8);
        buf.emit_u8(imm as u8);
    } else {
        buf.emit_u8(OPC_PUSH_Iz as u8);
        buf.emit_u32(imm as u32);
    }
}

/// Emit PUSH qword [base+offset].
pub fn emit_push_mem(buf: &mut CodeBuffer, base: Reg, offset: i32) {
    emit_modrm_ext_offset(buf, OPC_GRP5, Ext5Op::PushEv as u8, base, offset);
}

/// Emit indirect CALL through register.
pub fn emit_call_reg(buf: &mut CodeBuffer, reg: Reg) {
    emit_modrm_ext(buf, OPC_GRP5, Ext5Op::CallN as u8, reg);
}

/// Emit RET.
pub fn emit_ret(buf: &mut CodeBuffer) {
    buf.emit_u8(OPC_RET as u8);
}
