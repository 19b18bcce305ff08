use tramp_core::{ArgType, FrameLayout, JitError, MAX_PARAMS};

const ALL: [ArgType; 8] = [
    ArgType::Byte,
    ArgType::Word,
    ArgType::DWord,
    ArgType::QWord,
    ArgType::Pointer,
    ArgType::ScratchAddress,
    ArgType::Float,
    ArgType::Double,
];

#[test]
fn test_empty_frame() {
    let f = FrameLayout::new(&[], &[]).unwrap();
    assert_eq!(f.size(), 0);
    assert!(f.params().is_empty());
    assert!(f.param(0).is_none());
    assert!(f.scratch_slot(0).is_none());
}

#[test]
fn test_home_bytes_per_class() {
    // Every prefix of every rotation of ALL.
    for rot in 0..ALL.len() {
        let mut types = ALL.to_vec();
        types.rotate_left(rot);
        for n in 0..=types.len() {
            let params = &types[..n];
            let f = FrameLayout::new(params, &[]).unwrap();
            let floats = params.iter().filter(|t| t.is_float()).count();
            let ints = n - floats;
            assert_eq!(f.home_bytes(), 8 * ints + 16 * floats);
            assert_eq!(f.size(), f.home_bytes());
        }
    }
}

#[test]
fn test_slots_do_not_overlap() {
    let f = FrameLayout::new(&ALL, &[1, 8, 9, 100]).unwrap();
    let mut ranges: Vec<(i32, i32)> = f
        .params()
        .iter()
        .map(|s| (s.offset, s.offset - s.ty.home_size() as i32))
        .collect();
    for s in f.scratch() {
        assert_eq!(s.offset % 8, 0);
        ranges.push((s.offset, s.offset - s.size as i32));
    }
    // Each slot [fp-hi, fp-lo) sits strictly below the previous one.
    let mut prev_hi = 0;
    for (hi, lo) in ranges {
        assert!(lo >= prev_hi, "slot {hi}..{lo} overlaps");
        assert!(hi as usize <= f.size());
        prev_hi = hi;
    }
}

#[test]
fn test_scratch_rounding() {
    let f = FrameLayout::new(&[ArgType::DWord], &[1, 8, 9]).unwrap();
    assert_eq!(f.scratch_bytes(), 8 + 8 + 16);
    assert_eq!(f.scratch_slot(2).unwrap().size, 9);
    assert_eq!(f.scratch_slot(2).unwrap().offset, 40);
    assert_eq!(f.size(), 40);
}

#[test]
fn test_max_params() {
    let params = [ArgType::QWord; MAX_PARAMS];
    assert!(FrameLayout::new(&params, &[]).is_ok());
    let params = [ArgType::QWord; MAX_PARAMS + 1];
    assert!(matches!(
        FrameLayout::new(&params, &[]),
        Err(JitError::TooManyParameters { .. })
    ));
}

#[test]
fn test_oversized_scratch() {
    assert!(matches!(
        FrameLayout::new(&[], &[u32::MAX]),
        Err(JitError::DisplacementRange { .. })
    ));
}
