//! End-to-end: build trampolines for the host, flush and invoke them,
//! and compare against direct calls.
#![cfg(all(target_arch = "x86_64", unix))]

use std::cell::RefCell;

use tramp_core::{ArgType, CallConv};
use tramp_exec::{JitCompiler, Program};

#[derive(Debug, Clone, PartialEq)]
enum Record {
    Nine {
        a: u8,
        b: u16,
        c: u64,
        d: u32,
        f: f32,
        g: f64,
        h: u32,
        i: u64,
    },
    Floats(f32, f64),
}

thread_local! {
    static RECORDS: RefCell<Vec<Record>> = const { RefCell::new(Vec::new()) };
}

fn take_records() -> Vec<Record> {
    RECORDS.with(|r| std::mem::take(&mut *r.borrow_mut()))
}

/// Records its arguments and writes `d` into the buffer at `e`.
#[allow(clippy::too_many_arguments)]
extern "C" fn sink9(a: u8, b: u16, c: u64, d: u32, e: *mut u8, f: f32, g: f64, h: u32, i: u64) {
    unsafe { std::ptr::copy_nonoverlapping(d.to_le_bytes().as_ptr(), e, 4) };
    RECORDS.with(|r| {
        r.borrow_mut().push(Record::Nine {
            a,
            b,
            c,
            d,
            f,
            g,
            h,
            i,
        })
    });
}

extern "C" fn sink_floats(x: f32, y: f64) {
    RECORDS.with(|r| r.borrow_mut().push(Record::Floats(x, y)));
}

fn host() -> JitCompiler {
    let _ = env_logger::builder().is_test(true).try_init();
    JitCompiler::create().unwrap()
}

fn flush(jit: &mut JitCompiler) -> Program {
    jit.flush().unwrap().unwrap()
}

#[test]
fn test_mixed_scenario() {
    let mut out = [0u8; 4];
    let mut jit = host();
    jit.declare_parameters(&[ArgType::DWord, ArgType::Float, ArgType::Double])
        .unwrap();
    let scratch = jit.declare_scratch(16).unwrap();
    jit.begin().unwrap();

    jit.push_byte(0xAB).unwrap();
    jit.push_word(0xBEEF).unwrap();
    jit.push_qword(0x0123_4567_89AB_CDEF).unwrap();
    jit.push_forwarded(0).unwrap();
    jit.push_scratch(scratch).unwrap();
    jit.push_float(-0.75).unwrap();
    jit.push_double(1e100).unwrap();
    jit.push_dword(0xDEAD_BEEF).unwrap();
    jit.push_qword(u64::MAX).unwrap();
    jit.func_call(sink9 as *const (), CallConv::CDecl, false).unwrap();

    jit.push_ptr(out.as_mut_ptr()).unwrap();
    jit.push_scratch(scratch).unwrap();
    jit.push_usize(4).unwrap();
    jit.func_call(libc::memcpy as *const (), CallConv::CDecl, false)
        .unwrap();

    jit.push_forwarded(1).unwrap();
    jit.push_forwarded(2).unwrap();
    jit.func_call(sink_floats as *const (), CallConv::CDecl, false)
        .unwrap();
    jit.end().unwrap();

    let program = flush(&mut jit);
    let entry: extern "C" fn(u32, f32, f64) = unsafe { std::mem::transmute(program.entry_point()) };
    entry(28, 2.3, 4.5);
    let jitted = take_records();
    let jitted_out = out;

    // Same calls made directly.
    let mut buf = [0u8; 16];
    let mut direct_out = [0u8; 4];
    sink9(
        0xAB,
        0xBEEF,
        0x0123_4567_89AB_CDEF,
        28,
        buf.as_mut_ptr(),
        -0.75,
        1e100,
        0xDEAD_BEEF,
        u64::MAX,
    );
    direct_out.copy_from_slice(&buf[..4]);
    sink_floats(2.3, 4.5);
    let direct = take_records();

    assert_eq!(jitted, direct);
    assert_eq!(jitted_out, direct_out);
    assert_eq!(u32::from_le_bytes(jitted_out), 28);
}

extern "C" fn add(a: u32, b: u32) -> u32 {
    a.wrapping_add(b)
}

#[test]
fn test_returns_last_result() {
    let mut jit = host();
    jit.declare_parameters(&[ArgType::DWord, ArgType::DWord]).unwrap();
    jit.begin().unwrap();
    jit.push_dword(1000).unwrap();
    jit.push_dword(1).unwrap();
    jit.func_call(add as *const (), CallConv::CDecl, false).unwrap();
    jit.push_forwarded(0).unwrap();
    jit.push_forwarded(1).unwrap();
    jit.func_call(add as *const (), CallConv::CDecl, false).unwrap();
    jit.end().unwrap();

    let program = flush(&mut jit);
    let entry: extern "C" fn(u32, u32) -> u32 = unsafe { std::mem::transmute(program.entry_point()) };
    assert_eq!(entry(40, 2), 42);
    assert_eq!(entry(u32::MAX, 1), 0);
}

#[allow(clippy::too_many_arguments)]
extern "C" fn sum8(a: u64, b: u64, c: u64, d: u64, e: u64, f: u64, g: u64, h: u64) -> u64 {
    a + 2 * b + 3 * c + 4 * d + 5 * e + 6 * f + 7 * g + 8 * h
}

#[test]
fn test_stack_parameters_forwarded() {
    let mut jit = host();
    jit.declare_parameters(&[ArgType::QWord; 8]).unwrap();
    jit.begin().unwrap();
    for i in 0..8 {
        jit.push_forwarded(i).unwrap();
    }
    jit.func_call(sum8 as *const (), CallConv::CDecl, false).unwrap();
    jit.end().unwrap();

    let program = flush(&mut jit);
    let entry: extern "C" fn(u64, u64, u64, u64, u64, u64, u64, u64) -> u64 =
        unsafe { std::mem::transmute(program.entry_point()) };
    assert_eq!(entry(1, 1, 1, 1, 1, 1, 1, 1), 36);
    assert_eq!(entry(8, 7, 6, 5, 4, 3, 2, 1), sum8(8, 7, 6, 5, 4, 3, 2, 1));
}

#[allow(clippy::too_many_arguments)]
extern "C" fn weigh10(
    a: f64,
    b: f32,
    c: f64,
    d: f32,
    e: f64,
    f: f32,
    g: f64,
    h: f32,
    i: f64,
    j: f32,
) -> f64 {
    a + 2.0 * b as f64
        + 3.0 * c
        + 4.0 * d as f64
        + 5.0 * e
        + 6.0 * f as f64
        + 7.0 * g
        + 8.0 * h as f64
        + 9.0 * i
        + 10.0 * j as f64
}

#[test]
fn test_float_literals_spill_to_stack() {
    let mut jit = host();
    jit.begin().unwrap();
    for i in 0..10 {
        let v = i as f64 + 0.5;
        if i % 2 == 0 {
            jit.push_double(v).unwrap();
        } else {
            jit.push_float(v as f32).unwrap();
        }
    }
    jit.func_call(weigh10 as *const (), CallConv::CDecl, false)
        .unwrap();
    jit.end().unwrap();

    let program = flush(&mut jit);
    let entry: extern "C" fn() -> f64 = unsafe { std::mem::transmute(program.entry_point()) };
    let expected = weigh10(0.5, 1.5, 2.5, 3.5, 4.5, 5.5, 6.5, 7.5, 8.5, 9.5);
    assert_eq!(entry(), expected);
}

extern "C" fn narrow(a: u8, b: u16, c: u8, d: u16) -> u32 {
    ((a as u32) << 24) | ((b as u32) << 8) | c as u32 | ((d as u32) << 16)
}

#[test]
fn test_narrow_forwarding() {
    let mut jit = host();
    jit.declare_parameters(&[ArgType::Byte, ArgType::Word]).unwrap();
    jit.begin().unwrap();
    jit.push_forwarded(0).unwrap();
    jit.push_forwarded(1).unwrap();
    jit.push_byte(0x11).unwrap();
    jit.push_word(0x2222).unwrap();
    jit.func_call(narrow as *const (), CallConv::CDecl, false).unwrap();
    jit.end().unwrap();

    let program = flush(&mut jit);
    let entry: extern "C" fn(u8, u16) -> u32 = unsafe { std::mem::transmute(program.entry_point()) };
    assert_eq!(entry(0x7F, 0x1234), narrow(0x7F, 0x1234, 0x11, 0x2222));
}

extern "C" fn fill(buf: *mut u64, n: usize) {
    for k in 0..n {
        unsafe { *buf.add(k) = k as u64 * 3 };
    }
}

extern "C" fn total(buf: *const u64, n: usize) -> u64 {
    (0..n).map(|k| unsafe { *buf.add(k) }).sum()
}

#[test]
fn test_scratch_shared_between_calls() {
    let mut jit = host();
    let a = jit.declare_scratch(8 * 10).unwrap();
    let b = jit.declare_scratch(3).unwrap();
    jit.begin().unwrap();
    jit.push_scratch(b).unwrap();
    jit.push_usize(0).unwrap();
    jit.func_call(fill as *const (), CallConv::CDecl, false).unwrap();
    jit.push_scratch(a).unwrap();
    jit.push_usize(10).unwrap();
    jit.func_call(fill as *const (), CallConv::CDecl, false).unwrap();
    jit.push_scratch(a).unwrap();
    jit.push_usize(10).unwrap();
    jit.func_call(total as *const (), CallConv::CDecl, false).unwrap();
    jit.end().unwrap();

    let program = flush(&mut jit);
    let entry: extern "C" fn() -> u64 = unsafe { std::mem::transmute(program.entry_point()) };
    assert_eq!(entry(), 135);
}

#[test]
fn test_program_reentrant_across_threads() {
    let mut jit = host();
    jit.declare_parameters(&[ArgType::DWord, ArgType::DWord]).unwrap();
    jit.begin().unwrap();
    jit.push_forwarded(1).unwrap();
    jit.push_forwarded(0).unwrap();
    jit.func_call(add as *const (), CallConv::CDecl, false).unwrap();
    jit.end().unwrap();
    let program = std::sync::Arc::new(flush(&mut jit));

    let handles: Vec<_> = (0..4u32)
        .map(|t| {
            let program = program.clone();
            std::thread::spawn(move || {
                let entry: extern "C" fn(u32, u32) -> u32 =
                    unsafe { std::mem::transmute(program.entry_point()) };
                (0..1000).all(|i| entry(i, t) == i + t)
            })
        })
        .collect();
    for h in handles {
        assert!(h.join().unwrap());
    }
}
