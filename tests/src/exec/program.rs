use tramp_exec::{ExecutableMemory, Program, RwxMapping, WxMapping};

// mov eax, 42; ret
const RET_42: [u8; 6] = [0xB8, 0x2A, 0x00, 0x00, 0x00, 0xC3];

fn call_u32<M: ExecutableMemory>(p: &Program<M>) -> u32 {
    let f: extern "C" fn() -> u32 = unsafe { std::mem::transmute(p.entry_point()) };
    f()
}

#[test]
fn test_wx_mapping_executes() {
    let p = Program::<WxMapping>::new(&RET_42).unwrap();
    assert_eq!(p.len(), RET_42.len());
    assert_eq!(p.code(), &RET_42);
    assert_eq!(call_u32(&p), 42);
}

#[test]
fn test_rwx_mapping_executes() {
    let p = Program::<RwxMapping>::new(&RET_42).unwrap();
    assert_eq!(call_u32(&p), 42);
}

#[test]
fn test_mapping_is_page_rounded() {
    let p: Program = Program::new(&RET_42).unwrap();
    let cap = p.memory().capacity();
    assert!(cap >= RET_42.len());
    assert_eq!(cap % 4096, 0);
    assert_eq!(p.as_ptr() as usize % 4096, 0);
}

#[test]
fn test_many_programs() {
    let mut live = Vec::new();
    for i in 0..1000u32 {
        let mut code = RET_42;
        code[1..5].copy_from_slice(&i.to_le_bytes());
        let p: Program = Program::new(&code).unwrap();
        assert_eq!(call_u32(&p), i);
        if i % 100 == 0 {
            live.push((i, p));
        }
    }
    // Earlier programs survive later ones being dropped.
    for (i, p) in &live {
        assert_eq!(call_u32(p), *i);
    }
}

/// Mapping count and total size of anonymous executable mappings.
#[cfg(target_os = "linux")]
fn exec_mappings() -> (usize, u64) {
    let maps = std::fs::read_to_string("/proc/self/maps").unwrap();
    let mut bytes = 0;
    for line in maps.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() > 5 || !fields[1].contains('x') {
            continue;
        }
        let (start, end) = fields[0].split_once('-').unwrap();
        let start = u64::from_str_radix(start, 16).unwrap();
        let end = u64::from_str_radix(end, 16).unwrap();
        bytes += end - start;
    }
    (maps.lines().count(), bytes)
}

#[cfg(target_os = "linux")]
#[test]
fn test_dropped_programs_release_mappings() {
    // Warm up so lazily created allocator mappings are not counted.
    drop(Program::<WxMapping>::new(&RET_42).unwrap());
    let (lines_before, bytes_before) = exec_mappings();
    for i in 0..1000u32 {
        let mut code = RET_42;
        code[1..5].copy_from_slice(&i.to_le_bytes());
        let p = Program::<WxMapping>::new(&code).unwrap();
        assert_eq!(call_u32(&p), i);
    }
    let (lines_after, bytes_after) = exec_mappings();
    // Other tests map concurrently; a leak would add 1000 pages.
    assert!(
        lines_after <= lines_before + 128,
        "{lines_before} mappings before, {lines_after} after"
    );
    assert!(
        bytes_after <= bytes_before + 128 * 4096,
        "{bytes_before} executable bytes before, {bytes_after} after"
    );
}

#[test]
fn test_program_outlives_compiler() {
    extern "C" fn seven() -> u32 {
        7
    }
    let program = {
        let mut jit = tramp_exec::JitCompiler::create().unwrap();
        jit.begin().unwrap();
        jit.func_call(seven as *const (), tramp_core::CallConv::CDecl, false)
            .unwrap();
        jit.end().unwrap();
        jit.flush().unwrap().unwrap()
    };
    assert_eq!(call_u32(&program), 7);
}

#[test]
fn test_program_is_shareable() {
    let p: Program = Program::new(&RET_42).unwrap();
    let p = std::sync::Arc::new(p);
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let p = p.clone();
            std::thread::spawn(move || call_u32(&*p))
        })
        .collect();
    for h in handles {
        assert_eq!(h.join().unwrap(), 42);
    }
}
