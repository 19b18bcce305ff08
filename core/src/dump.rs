//! Hex dump of generated code for diagnostics.

use std::fmt::Write;

/// Format `code` as `0xNN` tokens separated by spaces, with a line
/// break after every `bytes_per_line` bytes (`0` keeps one line).
pub fn dump_assembly(code: &[u8], bytes_per_line: usize) -> String {
    let mut out = String::with_capacity(code.len() * 5);
    for (i, byte) in code.iter().enumerate() {
        // Writing to a String cannot fail.
        let _ = write!(out, "0x{byte:02X}");
        if i + 1 < code.len() {
            if bytes_per_line > 0 && (i + 1) % bytes_per_line == 0 {
                out.push('\n');
            } else {
                out.push(' ');
            }
        }
    }
    out
}
