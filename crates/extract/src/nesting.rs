//! Pre-parse nesting check.
//!
//! `syn` parses nested expressions recursively, so a short run of unmatched
//! brackets or stacked prefix operators can exhaust the thread stack, and a
//! stack overflow aborts the process instead of unwinding. This scan walks
//! the raw text once, without recursion, and reports when the nesting goes
//! past a limit. String, char and comment contents are skipped.

/// Deepest bracket nesting, or longest run of prefix operators, accepted
/// before parsing.
pub const MAX_NESTING: usize = 64;

/// `true` when `source` nests `([{` deeper than `limit`, or stacks more than
/// `limit` prefix operators (`! - * &`) in a row.
pub(crate) fn exceeds(source: &str, limit: usize) -> bool {
    let bytes = source.as_bytes();
    let mut depth = 0usize;
    let mut prefix_run = 0usize;
    let mut i = 0;

    while let Some(&b) = bytes.get(i) {
        let next = bytes.get(i + 1).copied();
        match b {
            b'/' if next == Some(b'/') => {
                i = skip_line(bytes, i);
                continue;
            },
            b'/' if next == Some(b'*') => {
                i = skip_block_comment(bytes, i);
                continue;
            },
            b'"' => {
                i = skip_string(bytes, i + 1);
                prefix_run = 0;
                continue;
            },
            b'r' if raw_string_hashes(bytes, i).is_some() => {
                i = skip_raw_string(bytes, i);
                prefix_run = 0;
                continue;
            },
            b'\'' => {
                i = skip_char_or_lifetime(source, i);
                prefix_run = 0;
                continue;
            },
            b'(' | b'[' | b'{' => {
                depth += 1;
                if depth > limit {
                    return true;
                }
                prefix_run = 0;
            },
            b')' | b']' | b'}' => {
                depth = depth.saturating_sub(1);
                prefix_run = 0;
            },
            b'!' | b'-' | b'*' | b'&' => {
                prefix_run += 1;
                if prefix_run > limit {
                    return true;
                }
            },
            b if b.is_ascii_whitespace() => {},
            _ => prefix_run = 0,
        }
        i += 1;
    }
    false
}

fn skip_line(bytes: &[u8], start: usize) -> usize {
    bytes[start..]
        .iter()
        .position(|&b| b == b'\n')
        .map_or(bytes.len(), |offset| start + offset + 1)
}

/// Block comments nest in Rust.
fn skip_block_comment(bytes: &[u8], start: usize) -> usize {
    let mut level = 0usize;
    let mut i = start;
    while let Some(&b) = bytes.get(i) {
        let next = bytes.get(i + 1).copied();
        if b == b'/' && next == Some(b'*') {
            level += 1;
            i += 2;
        } else if b == b'*' && next == Some(b'/') {
            level = level.saturating_sub(1);
            i += 2;
            if level == 0 {
                return i;
            }
        } else {
            i += 1;
        }
    }
    bytes.len()
}

/// `start` is just past the opening quote.
fn skip_string(bytes: &[u8], start: usize) -> usize {
    let mut i = start;
    while let Some(&b) = bytes.get(i) {
        match b {
            b'\\' => i += 2,
            b'"' => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

/// Hash count of a raw string starting at `r` (`r"`, `r#"`, `br"`, ...).
fn raw_string_hashes(bytes: &[u8], r: usize) -> Option<usize> {
    let ident_char = |b: u8| b.is_ascii_alphanumeric() || b == b'_';
    let before = r.checked_sub(1).and_then(|p| bytes.get(p)).copied();
    let prefixed_ok = match before {
        None => true,
        Some(b'b' | b'c') => r
            .checked_sub(2)
            .and_then(|p| bytes.get(p))
            .is_none_or(|&b| !ident_char(b)),
        Some(b) => !ident_char(b),
    };
    if !prefixed_ok {
        return None;
    }
    let hashes = bytes[r + 1..].iter().take_while(|&&b| b == b'#').count();
    (bytes.get(r + 1 + hashes) == Some(&b'"')).then_some(hashes)
}

fn skip_raw_string(bytes: &[u8], r: usize) -> usize {
    let Some(hashes) = raw_string_hashes(bytes, r) else {
        return r + 1;
    };
    let mut i = r + hashes + 2;
    while let Some(&b) = bytes.get(i) {
        if b == b'"'
            && bytes
                .get(i + 1..i + 1 + hashes)
                .is_some_and(|tail| tail.iter().all(|&t| t == b'#'))
        {
            return i + 1 + hashes;
        }
        i += 1;
    }
    bytes.len()
}

/// `'x'`, `'\n'`, `'\u{..}'` are skipped whole; a lifetime only loses its quote.
fn skip_char_or_lifetime(source: &str, quote: usize) -> usize {
    let bytes = source.as_bytes();
    if bytes.get(quote + 1) == Some(&b'\\') {
        return bytes
            .get(quote + 3..)
            .and_then(|rest| rest.iter().position(|&b| b == b'\''))
            .map_or(bytes.len(), |offset| quote + 3 + offset + 1);
    }
    match source.get(quote + 1..).and_then(|rest| rest.chars().next()) {
        Some(c) if bytes.get(quote + 1 + c.len_utf8()) == Some(&b'\'') => {
            quote + 2 + c.len_utf8()
        },
        _ => quote + 1,
    }
}
