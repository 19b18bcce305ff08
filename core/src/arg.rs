/// Primitive type of one call argument or declared entry parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ArgType {
    Byte,
    Word,
    DWord,
    QWord,
    Pointer,
    /// Address of a trampoline-local scratch buffer.
    ScratchAddress,
    Float,
    Double,
}

impl ArgType {
    /// Payload width in bytes.
    pub const fn size(self) -> usize {
        match self {
            ArgType::Byte => 1,
            ArgType::Word => 2,
            ArgType::DWord | ArgType::Float => 4,
            ArgType::QWord | ArgType::Pointer | ArgType::ScratchAddress | ArgType::Double => 8,
        }
    }

    /// Whether the value travels in a floating-point register class.
    #[inline]
    pub const fn is_float(self) -> bool {
        matches!(self, ArgType::Float | ArgType::Double)
    }

    /// Size of the frame slot a declared parameter of this type is
    /// homed into: one GPR spill or one full XMM spill.
    #[inline]
    pub const fn home_size(self) -> usize {
        if self.is_float() {
            16
        } else {
            8
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            ArgType::Byte => "byte",
            ArgType::Word => "word",
            ArgType::DWord => "dword",
            ArgType::QWord => "qword",
            ArgType::Pointer => "ptr",
            ArgType::ScratchAddress => "scratch",
            ArgType::Float => "float",
            ArgType::Double => "double",
        }
    }
}

/// Where the value of a pending argument comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgSource {
    /// The payload is the value itself.
    Literal,
    /// The value is the trampoline's own entry parameter at this index.
    Forwarded(u8),
    /// The value is the address of the scratch allocation at this index.
    Scratch(u8),
}

/// One pending argument of the next native call.
///
/// `value` holds the raw payload, zero-extended to 64 bits. For
/// floating types it holds the IEEE-754 bit pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arg {
    pub ty: ArgType,
    pub source: ArgSource,
    pub value: u64,
}

impl Arg {
    pub fn literal(ty: ArgType, value: u64) -> Self {
        Self {
            ty,
            source: ArgSource::Literal,
            value,
        }
    }

    pub fn byte(v: u8) -> Self {
        Self::literal(ArgType::Byte, v as u64)
    }

    pub fn word(v: u16) -> Self {
        Self::literal(ArgType::Word, v as u64)
    }

    pub fn dword(v: u32) -> Self {
        Self::literal(ArgType::DWord, v as u64)
    }

    pub fn qword(v: u64) -> Self {
        Self::literal(ArgType::QWord, v)
    }

    pub fn ptr(v: u64) -> Self {
        Self::literal(ArgType::Pointer, v)
    }

    pub fn float(v: f32) -> Self {
        Self::literal(ArgType::Float, v.to_bits() as u64)
    }

    pub fn double(v: f64) -> Self {
        Self::literal(ArgType::Double, v.to_bits())
    }

    /// Forward entry parameter `index`, which was declared as `ty`.
    pub fn forwarded(ty: ArgType, index: u8) -> Self {
        Self {
            ty,
            source: ArgSource::Forwarded(index),
            value: 0,
        }
    }

    pub fn scratch(index: u8) -> Self {
        Self {
            ty: ArgType::ScratchAddress,
            source: ArgSource::Scratch(index),
            value: index as u64,
        }
    }

    #[inline]
    pub fn is_float(&self) -> bool {
        self.ty.is_float()
    }

    /// The literal payload truncated to the type's width, as little-endian bytes.
    pub fn literal_bytes(&self) -> Vec<u8> {
        self.value.to_le_bytes()[..self.ty.size()].to_vec()
    }
}

/// Native calling convention of a call site.
///
/// The conventions differ in implicit-receiver handling and in who
/// removes stack arguments after the call. Only IA-32 distinguishes
/// them; the 64-bit target has a single native convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CallConv {
    /// Arguments on the stack, caller cleans up.
    #[default]
    CDecl,
    /// Arguments on the stack, callee cleans up.
    StdCall,
    /// Receiver in ECX, remaining arguments on the stack, callee cleans up.
    ThisCall,
    /// First two integer arguments in ECX/EDX, callee cleans up.
    FastCall,
}

impl CallConv {
    /// Whether the callee pops its own stack arguments.
    pub const fn callee_cleanup(self) -> bool {
        !matches!(self, CallConv::CDecl)
    }
}
