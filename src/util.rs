//! Small helpers for diagnostics.

use std::fmt::Write;

/// Offset-annotated hex dump, 16 bytes per line with an ASCII column.
pub fn hex_dump(bytes: &[u8], start_offset: u64) -> String {
    let mut out = String::new();
    for (i, chunk) in bytes.chunks(16).enumerate() {
        let offset = start_offset + (i as u64) * 16;
        let hexs = chunk.iter().map(|b| hex::encode([*b])).collect::<Vec<_>>().join(" ");
        let ascii: String = chunk
            .iter()
            .map(|&c| if (32..=126).contains(&c) { c as char } else { '.' })
            .collect();
        // writing to a String cannot fail
        let _ = writeln!(out, "{offset:08x}  {hexs:<47}  |{ascii}|");
    }
    out
}
