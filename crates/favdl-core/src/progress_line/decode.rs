//! Byte-to-text decoding for one output line.

use encoding_rs::GBK;

/// Decode a raw line: UTF-8 first, then GBK, then lossy UTF-8 as a last resort.
pub fn decode_line(bytes: &[u8]) -> String {
    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }
    let (text, had_errors) = GBK.decode_without_bom_handling(bytes);
    if !had_errors {
        return text.into_owned();
    }
    String::from_utf8_lossy(bytes).into_owned()
}
