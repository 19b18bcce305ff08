#![allow(non_upper_case_globals)]

//! IA-32 instruction encoding. Same opcode map as x86-64 without REX;
//! all operands are 32-bit.

use tramp_core::{CodeBuffer, Displacement};

use crate::x86::regs::Reg;

pub const P_EXT: u32 = 0x100; // 0x0F prefix
pub const P_SIMDF3: u32 = 0x20000; // 0xF3 prefix
pub const P_SIMDF2: u32 = 0x40000; // 0xF2 prefix

pub const OPC_ARITH_EvIb: u32 = 0x83;
pub const OPC_ARITH_EvIz: u32 = 0x81;
pub const OPC_MOVL_EvGv: u32 = 0x89;
pub const OPC_MOVL_GvEv: u32 = 0x8B;
pub const OPC_MOVL_Iv: u32 = 0xB8;
pub const OPC_XORL_EvGv: u32 = 0x31;
pub const OPC_MOVZBL: u32 = 0xB6 | P_EXT;
pub const OPC_MOVZWL: u32 = 0xB7 | P_EXT;
pub const OPC_MOVSS_VxWx: u32 = 0x10 | P_EXT | P_SIMDF3;
pub const OPC_MOVSD_VxWx: u32 = 0x10 | P_EXT | P_SIMDF2;
pub const OPC_MOVSS_WxVx: u32 = 0x11 | P_EXT | P_SIMDF3;
pub const OPC_MOVSD_WxVx: u32 = 0x11 | P_EXT | P_SIMDF2;
pub const OPC_LEA: u32 = 0x8D;
pub const OPC_GRP5: u32 = 0xFF;
pub const OPC_PUSH_r32: u32 = 0x50;
pub const OPC_POP_r32: u32 = 0x58;
pub const OPC_PUSH_Iz: u32 = 0x68;
pub const OPC_PUSH_Ib: u32 = 0x6A;
pub const OPC_PUSH_CS: u32 = 0x0E;
pub const OPC_RET: u32 = 0xC3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ArithOp {
    Add = 0,
    Sub = 5,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Ext5Op {
    CallN = 2,
    PushEv = 6,
}

pub fn emit_opc(buf: &mut CodeBuffer, opc: u32) {
    if opc & P_SIMDF3 != 0 {
        buf.emit_u8(0xF3);
    } else if opc & P_SIMDF2 != 0 {
        buf.emit_u8(0xF2);
    }
    if opc & P_EXT != 0 {
        buf.emit_u8(0x0F);
    }
    buf.emit_u8(opc as u8);
}

pub fn emit_modrm(buf: &mut CodeBuffer, opc: u32, r: Reg, rm: Reg) {
    emit_opc(buf, opc);
    buf.emit_u8(0xC0 | (r.code() << 3) | rm.code());
}

pub fn emit_modrm_ext(buf: &mut CodeBuffer, opc: u32, ext: u8, rm: Reg) {
    emit_opc(buf, opc);
    buf.emit_u8(0xC0 | (ext << 3) | rm.code());
}

fn emit_mem_operand(buf: &mut CodeBuffer, r3: u8, base: Reg, offset: i32) {
    let b3 = base.code();
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

pub fn emit_modrm_offset(buf: &mut CodeBuffer, opc: u32, r: Reg, base: Reg, offset: i32) {
    emit_opc(buf, opc);
    emit_mem_operand(buf, r.code(), base, offset);
}

pub fn emit_modrm_ext_offset(buf: &mut CodeBuffer, opc: u32, ext: u8, base: Reg, offset: i32) {
    emit_opc(buf, opc);
    emit_mem_operand(buf, ext, base, offset);
}

pub fn emit_arith_ri(buf: &mut CodeBuffer, op: ArithOp, dst: Reg, imm: i32) {
    if (-128..=127).contains(&imm) {
        emit_modrm_ext(buf, OPC_ARITH_EvIb, op as u8, dst);
        buf.emit_u8(imm as u8);
    } else {
        emit_modrm_ext(buf, OPC_ARITH_EvIz, op as u8, dst);
        buf.emit_u32(imm as u32);
    }
}

pub fn emit_mov_rr(buf: &mut CodeBuffer, dst: Reg, src: Reg) {
    emit_modrm(buf, OPC_MOVL_EvGv, src, dst);
}

pub fn emit_mov_ri(buf: &mut CodeBuffer, reg: Reg, val: u32) {
    if val == 0 {
        emit_modrm(buf, OPC_XORL_EvGv, reg, reg);
    } else {
        buf.emit_u8((OPC_MOVL_Iv + reg.code() as u32) as u8);
        buf.emit_u32(val);
    }
}

pub fn emit_load(buf: &mut CodeBuffer, dst: Reg, base: Reg, offset: i32) {
    emit_modrm_offset(buf, OPC_MOVL_GvEv, dst, base, offset);
}

pub fn emit_load_zx(buf: &mut CodeBuffer, opc: u32, dst: Reg, base: Reg, offset: i32) {
    emit_modrm_offset(buf, opc, dst, base, offset);
}

pub fn emit_store(buf: &mut CodeBuffer, src: Reg, base: Reg, offset: i32) {
    emit_modrm_offset(buf, OPC_MOVL_EvGv, src, base, offset);
}

pub fn emit_lea(buf: &mut CodeBuffer, dst: Reg, base: Reg, offset: i32) {
    emit_modrm_offset(buf, OPC_LEA, dst, base, offset);
}

/// MOVSS/MOVSD xmm, [base+offset].
pub fn emit_sse_load(buf: &mut CodeBuffer, double: bool, dst: Reg, base: Reg, offset: i32) {
    assert!(dst.is_xmm(), "sse load into {dst:?}");
    let opc = if double { OPC_MOVSD_VxWx } else { OPC_MOVSS_VxWx };
    emit_modrm_offset(buf, opc, dst, base, offset);
}

/// MOVSS/MOVSD [base+offset], xmm.
pub fn emit_sse_store(buf: &mut CodeBuffer, double: bool, src: Reg, base: Reg, offset: i32) {
    assert!(src.is_xmm(), "sse store of {src:?}");
    let opc = if double { OPC_MOVSD_WxVx } else { OPC_MOVSS_WxVx };
    emit_modrm_offset(buf, opc, src, base, offset);
}

pub fn emit_push(buf: &mut CodeBuffer, reg: Reg) {
    buf.emit_u8((OPC_PUSH_r32 + reg.code() as u32) as u8);
}

pub fn emit_pop(buf: &mut CodeBuffer, reg: Reg) {
    buf.emit_u8((OPC_POP_r32 + reg.code() as u32) as u8);
}

pub fn emit_push_imm(buf: &mut CodeBuffer, imm: i32) {
    if (-128..=127).contains(&imm) {
        buf.emit_u8(OPC_PUSH_Ib as u8);
        buf.emit_u8(imm as u8);
    } else {
        buf.emit_u8(OPC_PUSH_Iz as u8);
        buf.emit_u32(imm as u32);
    }
}

/// PUSH dword [base+offset].
pub fn emit_push_mem(buf: &mut CodeBuffer, base: Reg, offset: i32) {
    emit_modrm_ext_offset(buf, OPC_GRP5, Ext5Op::PushEv as u8, base, offset);
}

/// PUSH CS: with a following near call, builds a far return frame.
pub fn emit_push_cs(buf: &mut CodeBuffer) {
    buf.emit_u8(OPC_PUSH_CS as u8);
}

pub fn emit_call_reg(buf: &mut CodeBuffer, reg: Reg) {
    emit_modrm_ext(buf, OPC_GRP5, Ext5Op::CallN as u8, reg);
}

pub fn emit_ret(buf: &mut CodeBuffer) {
    buf.emit_u8(OPC_RET as u8);
}
