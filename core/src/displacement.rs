use crate::code_buffer::CodeBuffer;

/// Signed memory displacement, fixed to an 8-bit or 32-bit encoding
/// once chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Displacement {
    Disp8(i8),
    Disp32(i32),
}

impl Displacement {
    /// Pick the shortest encoding that holds `offset`.
    pub fn new(offset: i32) -> Self {
        match i8::try_from(offset) {
            Ok(d) => Displacement::Disp8(d),
            Err(_) => Displacement::Disp32(offset),
        }
    }

    /// Always use the 32-bit form, e.g. for patchable placeholders.
    pub fn wide(offset: i32) -> Self {
        Displacement::Disp32(offset)
    }

    /// Encoded size in bytes.
    pub fn size(self) -> usize {
        match self {
            Displacement::Disp8(_) => 1,
            Displacement::Disp32(_) => 4,
        }
    }

    /// ModR/M `mod` field selecting this displacement width.
    pub fn modrm_mod(self) -> u8 {
        match self {
            Displacement::Disp8(_) => 0x40,
            Displacement::Disp32(_) => 0x80,
        }
    }

    pub fn emit(self, buf: &mut CodeBuffer) {
        match self {
            Displacement::Disp8(d) => buf.emit_u8(d as u8),
            Displacement::Disp32(d) => buf.emit_u32(d as u32),
        }
    }
}
