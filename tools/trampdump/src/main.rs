//! tramp-dump: build a demo trampoline and print its machine code.
//!
//! The demo forwards a (u32, f32, f64) entry signature into a nine
//! argument call, a `memcpy`-shaped call and a float/float call, the
//! same shape the execution tests run on the host.

use std::fs;
use std::io::{self, BufWriter, Write};
use std::process;

use clap::{Parser, ValueEnum};
use log::info;
use tramp_backend::x86_64::{SYSV, WIN64};
use tramp_backend::{ArchEncoder, X86Encoder, X86_64Encoder};
use tramp_core::{ArgType, CallConv, JitResult};
use tramp_exec::{host_encoder, JitCompiler};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Arch {
    /// Encoder of the running host.
    Host,
    #[value(name = "x86-64-sysv")]
    X86_64Sysv,
    #[value(name = "x86-64-win64")]
    X86_64Win64,
    X86,
}

#[derive(Debug, Parser)]
#[command(name = "tramp-dump", about = "Dump the machine code of a demo trampoline")]
struct Args {
    /// Target encoder.
    #[arg(long, value_enum, default_value_t = Arch::Host)]
    arch: Arch,

    /// Bytes per line of the hex dump (0: one line).
    #[arg(long, default_value_t = 16)]
    bytes_per_line: usize,

    /// Output to file (default: stdout).
    #[arg(short, long)]
    output: Option<String>,

    /// Output raw machine code bytes.
    #[arg(long)]
    raw: bool,

    /// Disassemble via objdump.
    #[arg(long)]
    disas: bool,
}

extern "C" fn demo_sink(
    _a: u8,
    _b: u16,
    _c: u64,
    _d: u32,
    _e: *mut u8,
    _f: f32,
    _g: f64,
    _h: u32,
    _i: u64,
) {
}

extern "C" fn demo_floats(_x: f32, _y: f64) {}

fn encoder_for(arch: Arch) -> Option<Box<dyn ArchEncoder>> {
    match arch {
        Arch::Host => host_encoder(),
        Arch::X86_64Sysv => Some(Box::new(X86_64Encoder::with_abi(&SYSV))),
        Arch::X86_64Win64 => Some(Box::new(X86_64Encoder::with_abi(&WIN64))),
        Arch::X86 => Some(Box::new(X86Encoder::new())),
    }
}

fn build_demo(jit: &mut JitCompiler) -> JitResult<()> {
    jit.declare_parameters(&[ArgType::DWord, ArgType::Float, ArgType::Double])?;
    let buf = jit.declare_scratch(64)?;
    jit.begin()?;

    jit.push_byte(0x12)?;
    jit.push_word(0x3456)?;
    jit.push_qword(0x0123_4567_89ab_cdef)?;
    jit.push_forwarded(0)?;
    jit.push_scratch(buf)?;
    jit.push_forwarded(1)?;
    jit.push_double(0.5)?;
    jit.push_dword(42)?;
    jit.push_qword(u64::MAX)?;
    jit.func_call(demo_sink as *const (), CallConv::CDecl, false)?;

    jit.push_scratch(buf)?;
    jit.push_ptr(demo_floats as *const ())?;
    jit.push_usize(16)?;
    jit.func_call(memcpy_like as *const (), CallConv::CDecl, false)?;

    jit.push_forwarded(1)?;
    jit.push_forwarded(2)?;
    jit.func_call(demo_floats as *const (), CallConv::CDecl, false)?;

    jit.end()
}

extern "C" fn memcpy_like(_dst: *mut u8, _src: *const u8, _n: usize) -> *mut u8 {
    std::ptr::null_mut()
}

fn disassemble(code: &[u8], arch: Arch) {
    let machine = match arch {
        Arch::X86 => "i386",
        _ => "i386:x86-64",
    };
    let tmp = std::env::temp_dir().join("tramp-dump-tmp.bin");
    if let Err(e) = fs::write(&tmp, code) {
        eprintln!("cannot write {}: {e}", tmp.display());
        return;
    }
    let status = process::Command::new("objdump")
        .args(["-b", "binary", "-m", machine, "-D"])
        .arg(&tmp)
        .status();
    match status {
        Ok(s) if s.success() => {}
        Ok(s) => eprintln!("objdump exited with {s}"),
        Err(e) => eprintln!("failed to run objdump: {e}"),
    }
    let _ = fs::remove_file(&tmp);
}

fn open_output(path: &Option<String>) -> Box<dyn Write> {
    match path {
        Some(path) => {
            let f = fs::File::create(path).unwrap_or_else(|e| {
                eprintln!("cannot create {path}: {e}");
                process::exit(1);
            });
            Box::new(BufWriter::new(f))
        }
        None => Box::new(BufWriter::new(io::stdout().lock())),
    }
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let encoder = encoder_for(args.arch).unwrap_or_else(|| {
        eprintln!("no trampoline encoder for this host");
        process::exit(1);
    });
    let mut jit = JitCompiler::with_encoder(encoder);
    if let Err(e) = build_demo(&mut jit) {
        eprintln!("build error: {e}");
        process::exit(1);
    }
    info!("{}: {} bytes", jit.arch_name(), jit.assembly().len());

    let code = jit.assembly();
    if args.disas {
        disassemble(code, args.arch);
        return;
    }

    let mut out = open_output(&args.output);
    let result = if args.raw {
        out.write_all(code)
    } else {
        writeln!(out, "{}", jit.dump_assembly(args.bytes_per_line))
    };
    if let Err(e) = result.and_then(|_| out.flush()) {
        eprintln!("write error: {e}");
        process::exit(1);
    }
}
