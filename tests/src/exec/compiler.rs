use tramp_backend::x86_64::SYSV;
use tramp_backend::{X86Encoder, X86_64Encoder};
use tramp_core::{ArgType, CallConv, JitError};
use tramp_exec::JitCompiler;

extern "C" fn nop() {}

fn sysv() -> JitCompiler {
    JitCompiler::with_encoder(Box::new(X86_64Encoder::with_abi(&SYSV)))
}

fn build_simple(jit: &mut JitCompiler) {
    jit.declare_parameters(&[ArgType::DWord, ArgType::Float]).unwrap();
    let s = jit.declare_scratch(32).unwrap();
    jit.begin().unwrap();
    jit.push_forwarded(0).unwrap();
    jit.push_scratch(s).unwrap();
    jit.push_double(3.25).unwrap();
    jit.push_forwarded(1).unwrap();
    jit.func_call(nop as *const (), CallConv::CDecl, false).unwrap();
    jit.end().unwrap();
}

#[test]
fn test_flush_empty_is_idempotent() {
    let mut jit = sysv();
    assert!(jit.flush().unwrap().is_none());
    assert!(jit.flush().unwrap().is_none());
    assert!(jit.assembly().is_empty());
}

#[test]
fn test_flush_before_end() {
    let mut jit = sysv();
    jit.begin().unwrap();
    assert!(matches!(jit.flush(), Err(JitError::Unfinished)));
    jit.end().unwrap();
    assert!(jit.flush().unwrap().is_some());
}

#[test]
fn test_begin_requires_flush() {
    let mut jit = sysv();
    jit.begin().unwrap();
    jit.end().unwrap();
    assert!(matches!(jit.begin(), Err(JitError::Unflushed)));
    assert!(matches!(jit.declare_scratch(8), Err(JitError::FrameFrozen)));
}

#[test]
fn test_flush_resets_for_reuse() {
    let mut jit = sysv();
    build_simple(&mut jit);
    let first = jit.flush().unwrap().unwrap();
    assert!(jit.assembly().is_empty());
    assert!(jit.parameters().is_empty());

    build_simple(&mut jit);
    let second = jit.flush().unwrap().unwrap();
    assert_eq!(first.code(), second.code());
    assert_ne!(first.as_ptr(), second.as_ptr());
}

#[test]
fn test_deterministic_output() {
    let mut a = sysv();
    let mut b = sysv();
    build_simple(&mut a);
    build_simple(&mut b);
    assert_eq!(a.assembly(), b.assembly());
    assert_eq!(a.dump_assembly(8), b.dump_assembly(8));
}

#[test]
fn test_index_errors() {
    let mut jit = sysv();
    jit.declare_parameters(&[ArgType::DWord]).unwrap();
    jit.declare_scratch(4).unwrap();
    jit.begin().unwrap();
    assert!(matches!(
        jit.push_forwarded(1),
        Err(JitError::ParameterIndex {
            index: 1,
            declared: 1
        })
    ));
    assert!(matches!(
        jit.push_scratch(3),
        Err(JitError::ScratchIndex {
            index: 3,
            declared: 1
        })
    ));
    assert!(jit.pending_args().is_empty());
}

#[test]
fn test_far_call_clears_pending() {
    let mut jit = sysv();
    jit.begin().unwrap();
    jit.push_dword(1).unwrap();
    jit.push_float(2.0).unwrap();
    let err = jit.func_call(nop as *const (), CallConv::CDecl, true);
    assert!(matches!(err, Err(JitError::FarCallUnsupported { .. })));
    assert!(jit.pending_args().is_empty());
    jit.end().unwrap();
}

#[test]
fn test_too_many_parameters() {
    let mut jit = sysv();
    let params = [ArgType::Byte; 16];
    assert!(matches!(
        jit.declare_parameters(&params),
        Err(JitError::TooManyParameters { count: 16, .. })
    ));
}

#[test]
fn test_pointer_width_integers() {
    let mut jit = JitCompiler::with_encoder(Box::new(X86Encoder::new()));
    jit.begin().unwrap();
    jit.push_usize(5).unwrap();
    jit.push_isize(-1).unwrap();
    let tys: Vec<ArgType> = jit.pending_args().iter().map(|a| a.ty).collect();
    assert_eq!(tys, vec![ArgType::DWord, ArgType::DWord]);
    assert_eq!(jit.pending_args()[1].value, 0xFFFF_FFFF);

    let mut jit = sysv();
    jit.begin().unwrap();
    jit.push_usize(5).unwrap();
    assert_eq!(jit.pending_args()[0].ty, ArgType::QWord);
}

#[test]
fn test_trampoline_ends_with_literals() {
    let mut jit = sysv();
    jit.begin().unwrap();
    jit.push_float(0.5).unwrap();
    jit.func_call(nop as *const (), CallConv::CDecl, false).unwrap();
    jit.end().unwrap();
    let code = jit.assembly();
    assert_eq!(&code[code.len() - 4..], &0.5f32.to_le_bytes());
    assert_eq!(code[code.len() - 5], 0xC3);
}

#[test]
fn test_dump_assembly_matches_bytes() {
    let mut jit = sysv();
    jit.begin().unwrap();
    jit.end().unwrap();
    assert_eq!(jit.assembly(), &[0x55, 0x48, 0x89, 0xE5, 0x5D, 0xC3]);
    assert_eq!(jit.dump_assembly(4), "0x55 0x48 0x89 0xE5\n0x5D 0xC3");
}
