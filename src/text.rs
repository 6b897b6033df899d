//! Byte offset helpers for C++ source buffers.
//!
//! Lines and columns are 1-indexed and columns count bytes, matching the
//! `file:line:col` convention of C++ compiler diagnostics.

/// Convert a byte offset to a 1-indexed `(line, column)` pair.
///
/// Offsets past the end of `content` clamp to the end.
pub fn line_col(content: &[u8], offset: usize) -> (usize, usize) {
    let offset = offset.min(content.len());
    let before = &content[..offset];

    let line = before.iter().filter(|&&b| b == b'\n').count() + 1;
    let line_start = before
        .iter()
        .rposition(|&b| b == b'\n')
        .map_or(0, |pos| pos + 1);

    (line, offset - line_start + 1)
}

fn is_ident_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}

/// Length in bytes of the token starting at `offset`.
///
/// Recognises identifier/keyword/number runs and treats anything else as a
/// single-byte punctuator. Returns `None` at end of input or on whitespace,
/// since a source location never points at either.
pub fn token_len(bytes: &[u8], offset: usize) -> Option<usize> {
    let first = *bytes.get(offset)?;

    if first.is_ascii_whitespace() {
        return None;
    }

    if is_ident_byte(first) {
        let len = bytes[offset..]
            .iter()
            .take_while(|&&b| is_ident_byte(b))
            .count();
        return Some(len);
    }

    // A UTF-8 lead byte takes its continuation bytes along. Anything else,
    // including bytes of other encodings, is one byte wide.
    if first >= 0xC0 {
        let continuation = bytes[offset + 1..]
            .iter()
            .take(3)
            .take_while(|&&b| b & 0xC0 == 0x80)
            .count();
        return Some(1 + continuation);
    }
    Some(1)
}

/// Offset immediately after the token starting at `offset`.
pub fn end_of_token(content: &[u8], offset: usize) -> Option<usize> {
    token_len(content, offset).map(|len| offset + len)
}
