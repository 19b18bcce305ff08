use log::{debug, trace};
use tramp_backend::{ArchEncoder, CallSite};
use tramp_core::{
    dump_assembly, Arg, ArgType, CallConv, CodeBuffer, FrameLayout, JitError, JitResult,
    LiteralPool, MAX_PARAMS,
};

use crate::program::Program;

/// Scratch indices are 8-bit.
const MAX_SCRATCH: usize = u8::MAX as usize + 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Declarations open, nothing emitted.
    Idle,
    /// Between `begin()` and `end()`.
    Building,
    /// `end()` emitted; waiting for `flush()`.
    Finished,
}

/// Builds one trampoline at a time:
/// declare, `begin`, (`push_*`... `func_call`)*, `end`, `flush`.
///
/// ```ignore
/// let mut jit = JitCompiler::create().unwrap();
/// jit.declare_parameters(&[ArgType::DWord])?;
/// jit.begin()?;
/// jit.push_forwarded(0)?;
/// jit.push_dword(7)?;
/// jit.func_call(callee as *const (), CallConv::CDecl, false)?;
/// jit.end()?;
/// let program = jit.flush()?.unwrap();
/// ```
pub struct JitCompiler {
    encoder: Box<dyn ArchEncoder>,
    buf: CodeBuffer,
    literals: LiteralPool,
    params: Vec<ArgType>,
    scratch: Vec<u32>,
    frame: FrameLayout,
    args: Vec<Arg>,
    state: State,
}

impl JitCompiler {
    /// Compiler for the host architecture, or `None` on a host no
    /// encoder targets.
    pub fn create() -> Option<Self> {
        host_encoder().map(Self::with_encoder)
    }

    /// Compiler driving an arbitrary encoder. The produced bytes are
    /// only executable on a matching host.
    pub fn with_encoder(encoder: Box<dyn ArchEncoder>) -> Self {
        Self {
            encoder,
            buf: CodeBuffer::new(),
            literals: LiteralPool::new(),
            params: Vec::new(),
            scratch: Vec::new(),
            frame: FrameLayout::default(),
            args: Vec::new(),
            state: State::Idle,
        }
    }

    pub fn arch_name(&self) -> &'static str {
        self.encoder.name()
    }

    /// Set the trampoline's own parameter list, replacing any previous
    /// declaration.
    pub fn declare_parameters(&mut self, types: &[ArgType]) -> JitResult<()> {
        self.check_open()?;
        if types.len() > MAX_PARAMS {
            return Err(JitError::TooManyParameters {
                count: types.len(),
                limit: MAX_PARAMS,
            });
        }
        self.params = types.to_vec();
        Ok(())
    }

    pub fn parameters(&self) -> &[ArgType] {
        &self.params
    }

    /// Reserve a `size`-byte buffer in the trampoline's frame and
    /// return its index.
    pub fn declare_scratch(&mut self, size: u32) -> JitResult<u8> {
        self.check_open()?;
        if self.scratch.len() >= MAX_SCRATCH {
            return Err(JitError::TooManyScratch { limit: MAX_SCRATCH });
        }
        self.scratch.push(size);
        Ok((self.scratch.len() - 1) as u8)
    }

    fn check_open(&self) -> JitResult<()> {
        match self.state {
            State::Idle => Ok(()),
            State::Building | State::Finished => Err(JitError::FrameFrozen),
        }
    }

    /// Freeze the declarations and emit the prologue.
    pub fn begin(&mut self) -> JitResult<()> {
        match self.state {
            State::Idle => {}
            State::Building => return Err(JitError::AlreadyBuilding),
            State::Finished => return Err(JitError::Unflushed),
        }
        self.frame = FrameLayout::new(&self.params, &self.scratch)?;
        self.encoder.emit_prologue(&mut self.buf, &self.frame);
        self.state = State::Building;
        debug!(
            "{}: begin, {} params, {} scratch, frame {} bytes",
            self.encoder.name(),
            self.params.len(),
            self.scratch.len(),
            self.frame.size()
        );
        Ok(())
    }

    fn push(&mut self, arg: Arg) -> JitResult<()> {
        if self.state != State::Building {
            return Err(JitError::NotBuilding);
        }
        trace!("push {:?}", arg);
        self.args.push(arg);
        Ok(())
    }

    pub fn push_byte(&mut self, v: u8) -> JitResult<()> {
        self.push(Arg::byte(v))
    }

    pub fn push_word(&mut self, v: u16) -> JitResult<()> {
        self.push(Arg::word(v))
    }

    pub fn push_dword(&mut self, v: u32) -> JitResult<()> {
        self.push(Arg::dword(v))
    }

    pub fn push_qword(&mut self, v: u64) -> JitResult<()> {
        self.push(Arg::qword(v))
    }

    pub fn push_ptr<T>(&mut self, p: *const T) -> JitResult<()> {
        self.push(Arg::ptr(p as usize as u64))
    }

    /// Pointer-width unsigned integer.
    pub fn push_usize(&mut self, v: usize) -> JitResult<()> {
        if self.encoder.pointer_size() == 4 {
            self.push(Arg::dword(v as u32))
        } else {
            self.push(Arg::qword(v as u64))
        }
    }

    /// Pointer-width signed integer.
    pub fn push_isize(&mut self, v: isize) -> JitResult<()> {
        self.push_usize(v as usize)
    }

    pub fn push_float(&mut self, v: f32) -> JitResult<()> {
        self.push(Arg::float(v))
    }

    pub fn push_double(&mut self, v: f64) -> JitResult<()> {
        self.push(Arg::double(v))
    }

    /// Forward the trampoline's own parameter `index`, with its
    /// declared type.
    pub fn push_forwarded(&mut self, index: u8) -> JitResult<()> {
        let ty = match self.params.get(index as usize) {
            Some(&ty) => ty,
            None => {
                return Err(JitError::ParameterIndex {
                    index,
                    declared: self.params.len(),
                })
            }
        };
        self.push(Arg::forwarded(ty, index))
    }

    /// Pass the address of scratch allocation `index`.
    pub fn push_scratch(&mut self, index: u8) -> JitResult<()> {
        if index as usize >= self.scratch.len() {
            return Err(JitError::ScratchIndex {
                index,
                declared: self.scratch.len(),
            });
        }
        self.push(Arg::scratch(index))
    }

    /// Arguments pushed since the last `func_call`.
    pub fn pending_args(&self) -> &[Arg] {
        &self.args
    }

    /// Emit a call to `target` consuming every pending argument in push
    /// order. The pending list is empty afterward, whatever the outcome.
    pub fn func_call(&mut self, target: *const (), conv: CallConv, far: bool) -> JitResult<()> {
        let args = std::mem::take(&mut self.args);
        if self.state != State::Building {
            return Err(JitError::NotBuilding);
        }
        let call = CallSite {
            args: &args,
            target: target as usize as u64,
            conv,
            far,
        };
        self.encoder
            .emit_call(&mut self.buf, &self.frame, &mut self.literals, &call)
    }

    /// Emit the epilogue and append every deferred literal.
    ///
    /// Arguments pushed after the last `func_call` are an error: they
    /// are discarded and the trampoline stays open, so a second `end()`
    /// finishes it.
    pub fn end(&mut self) -> JitResult<()> {
        if self.state != State::Building {
            return Err(JitError::NotBuilding);
        }
        if !self.args.is_empty() {
            let count = self.args.len();
            self.args.clear();
            return Err(JitError::PendingArgs { count });
        }
        self.encoder.emit_epilogue(&mut self.buf, &self.frame);
        let resolved = self.literals.resolve(&mut self.buf);
        self.state = State::Finished;
        debug!(
            "{}: end, {} bytes, {} literals",
            self.encoder.name(),
            self.buf.offset(),
            resolved.len()
        );
        Ok(())
    }

    /// Copy the finished trampoline into executable memory.
    ///
    /// Returns `Ok(None)` and changes nothing when the buffer is empty.
    /// On success the compiler is ready for a new trampoline.
    pub fn flush(&mut self) -> JitResult<Option<Program>> {
        if self.buf.is_empty() {
            return Ok(None);
        }
        if self.state == State::Building {
            return Err(JitError::Unfinished);
        }
        let program = Program::new(self.buf.as_slice())?;
        debug!("{}: flush, {} bytes", self.encoder.name(), program.len());
        self.reset();
        Ok(Some(program))
    }

    /// Discard everything and return to the declaration phase.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.literals.clear();
        self.params.clear();
        self.scratch.clear();
        self.args.clear();
        self.frame = FrameLayout::default();
        self.state = State::Idle;
    }

    /// Bytes emitted so far.
    pub fn assembly(&self) -> &[u8] {
        self.buf.as_slice()
    }

    /// Hex dump of the bytes emitted so far.
    pub fn dump_assembly(&self, bytes_per_line: usize) -> String {
        dump_assembly(self.buf.as_slice(), bytes_per_line)
    }
}

/// Encoder for the architecture this crate is built for.
#[cfg(target_arch = "x86_64")]
pub fn host_encoder() -> Option<Box<dyn ArchEncoder>> {
    Some(Box::new(tramp_backend::X86_64Encoder::new()))
}

#[cfg(target_arch = "x86")]
pub fn host_encoder() -> Option<Box<dyn ArchEncoder>> {
    Some(Box::new(tramp_backend::X86Encoder::new()))
}

#[cfg(not(any(target_arch = "x86_64", target_arch = "x86")))]
pub fn host_encoder() -> Option<Box<dyn ArchEncoder>> {
    None
}
