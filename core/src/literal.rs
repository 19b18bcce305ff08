use crate::code_buffer::CodeBuffer;

/// A literal referenced by an already-emitted instruction whose
/// displacement is still a placeholder.
///
/// The displacement field is a 32-bit value relative to the end of
/// the referencing instruction (x86-64 RIP-relative addressing).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedLiteral {
    /// Raw little-endian bytes of the literal.
    pub bytes: Vec<u8>,
    /// Offset of the first byte after the referencing instruction.
    pub insn_end: usize,
    /// Offset of the 32-bit placeholder displacement.
    pub patch_offset: usize,
}

/// Where a literal ended up after resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedLiteral {
    pub offset: usize,
    pub width: usize,
    pub patch_offset: usize,
    pub disp: i32,
}

/// Supplement table: literals that are appended after the code.
///
/// Resolution is two-phase. While emitting, encoders call `defer` for
/// every literal load they write with a placeholder displacement.
/// After the epilogue, `resolve` appends all literal bytes to the tail
/// of the buffer in insertion order and patches every placeholder.
#[derive(Debug, Default, Clone)]
pub struct LiteralPool {
    pending: Vec<UnresolvedLiteral>,
}

impl LiteralPool {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
        }
    }

    /// Record a literal whose placeholder sits at `patch_offset` and
    /// whose referencing instruction ends at `insn_end`.
    pub fn defer(&mut self, bytes: &[u8], patch_offset: usize, insn_end: usize) {
        debug_assert!(patch_offset + 4 <= insn_end);
        self.pending.push(UnresolvedLiteral {
            bytes: bytes.to_vec(),
            insn_end,
            patch_offset,
        });
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn pending(&self) -> &[UnresolvedLiteral] {
        &self.pending
    }

    /// Drop all unresolved entries without emitting them.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Append every literal to `buf` and patch its placeholder.
    /// Consumes the pending entries.
    pub fn resolve(&mut self, buf: &mut CodeBuffer) -> Vec<ResolvedLiteral> {
        let mut out = Vec::with_capacity(self.pending.len());
        for lit in self.pending.drain(..) {
            let offset = buf.offset();
            buf.emit_bytes(&lit.bytes);
            let disp = offset as i64 - lit.insn_end as i64;
            assert!(
                (i32::MIN as i64..=i32::MAX as i64).contains(&disp),
                "literal displacement out of i32 range"
            );
            let disp = disp as i32;
            buf.patch_u32(lit.patch_offset, disp as u32);
            out.push(ResolvedLiteral {
                offset,
                width: lit.bytes.len(),
                patch_offset: lit.patch_offset,
                disp,
            });
        }
        out
    }
}
