//! UTF-8 safe string helpers.
//!
//! Message bodies pushed to LINE are limited by character count, and the
//! texts involved are mostly Japanese. Everything here counts Unicode scalar
//! values (chars) and never slices by byte index.

/// Return the first `n` characters of `s` as a `String` (no ellipsis).
pub fn prefix_chars(s: &str, n: usize) -> String {
    s.chars().take(n).collect()
}

/// Return a preview of `s` up to `n` characters. If `s` is longer than `n`
/// characters, the returned string will include a trailing ellipsis `...`.
pub fn preview(s: &str, n: usize) -> String {
    let mut prefix = prefix_chars(s, n);
    if s.chars().count() > n {
        prefix.push_str("...");
    }
    prefix
}

/// Trim surrounding whitespace, then keep at most `max_chars` characters.
///
/// Returns `None` when nothing is left after trimming.
pub fn trim_to_chars(s: &str, max_chars: usize) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(prefix_chars(trimmed, max_chars))
}
