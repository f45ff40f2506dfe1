//! Text extraction primitives for source lines.
//!
//! Everything works on raw bytes so sources in any ASCII-compatible encoding
//! (Latin-1, CP1251, UTF-8) pass through untouched.

/// Return the bytes between the first and last `"` on a line.
///
/// `None` when the line holds fewer than two quote characters.
pub fn between_quotes(line: &[u8]) -> Option<&[u8]> {
    let first = line.iter().position(|&b| b == b'"')?;
    let last = line.iter().rposition(|&b| b == b'"')?;
    if last <= first {
        return None;
    }
    Some(&line[first + 1..last])
}

/// Split content into lines keeping each line's terminator.
///
/// Joining the result reproduces the input byte for byte.
pub fn lines_inclusive(content: &[u8]) -> impl Iterator<Item = &[u8]> {
    content.split_inclusive(|&b| b == b'\n')
}

/// Offset of the first occurrence of `needle` in `haystack`.
pub fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

pub fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    find(haystack, needle).is_some()
}

/// Replace every non-overlapping occurrence of `from` with `to`.
pub fn replace_all(line: &[u8], from: &[u8], to: &[u8]) -> Vec<u8> {
    if from.is_empty() {
        return line.to_vec();
    }

    let mut out = Vec::with_capacity(line.len());
    let mut rest = line;
    while let Some(at) = find(rest, from) {
        out.extend_from_slice(&rest[..at]);
        out.extend_from_slice(to);
        rest = &rest[at + from.len()..];
    }
    out.extend_from_slice(rest);
    out
}
