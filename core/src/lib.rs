//! Architecture-neutral pieces of the trampoline compiler: the
//! argument model, the code buffer, frame layout, deferred literals
//! and the error type.

pub mod arg;
pub mod code_buffer;
pub mod displacement;
pub mod dump;
pub mod error;
pub mod frame;
pub mod literal;

pub use arg::{Arg, ArgSource, ArgType, CallConv};
pub use code_buffer::CodeBuffer;
pub use displacement::Displacement;
pub use dump::dump_assembly;
pub use error::{JitError, JitResult};
pub use frame::{FrameLayout, HomeSlot, ScratchSlot, MAX_PARAMS};
pub use literal::{LiteralPool, ResolvedLiteral, UnresolvedLiteral};
