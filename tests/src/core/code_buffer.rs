use tramp_core::{dump_assembly, CodeBuffer};

#[test]
fn test_emit_and_read() {
    let mut buf = CodeBuffer::new();
    buf.emit_u8(0x90); // NOP
    buf.emit_u32(0xDEADBEEF);
    assert_eq!(buf.offset(), 5);
    assert_eq!(buf.as_slice()[0], 0x90);
    assert_eq!(buf.read_u32(1), 0xDEADBEEF);
}

#[test]
fn test_patch() {
    let mut buf = CodeBuffer::new();
    buf.emit_u32(0);
    buf.patch_u32(0, 0x12345678);
    assert_eq!(buf.read_u32(0), 0x12345678);
    assert_eq!(buf.as_slice(), &[0x78, 0x56, 0x34, 0x12]);
}

#[test]
fn test_little_endian_widths() {
    let mut buf = CodeBuffer::with_capacity(16);
    buf.emit_u16(0xBEEF);
    buf.emit_u64(0x0102_0304_0506_0708);
    assert_eq!(
        buf.as_slice(),
        &[0xEF, 0xBE, 0x08, 0x07, 0x06, 0x05, 0x04, 0x03, 0x02, 0x01]
    );
}

#[test]
fn test_clear() {
    let mut buf = CodeBuffer::new();
    buf.emit_bytes(&[1, 2, 3]);
    buf.clear();
    assert!(buf.is_empty());
    assert_eq!(buf.offset(), 0);
}

#[test]
fn test_dump_of_buffer() {
    let mut buf = CodeBuffer::new();
    buf.emit_bytes(&[0xab, 0x0c, 0xff]);
    assert_eq!(dump_assembly(buf.as_slice(), 1), "0xAB\n0x0C\n0xFF");
    assert_eq!(dump_assembly(buf.as_slice(), 16), "0xAB 0x0C 0xFF");
}
