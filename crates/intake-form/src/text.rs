//! Text decoding and truncation helpers shared by the tokenizers.

/// Decode raw bytes according to the configured charset.
///
/// `latin1`, `iso-8859-1`, and `binary` map each byte to the corresponding
/// code point; anything else decodes as UTF-8, replacing invalid sequences.
pub(crate) fn decode_text(bytes: &[u8], charset: &str) -> String {
    if charset.eq_ignore_ascii_case("latin1")
        || charset.eq_ignore_ascii_case("iso-8859-1")
        || charset.eq_ignore_ascii_case("binary")
    {
        bytes.iter().map(|&b| char::from(b)).collect()
    } else {
        String::from_utf8_lossy(bytes).into_owned()
    }
}

/// Truncate a string to at most `max` bytes, backing off to a char boundary.
pub(crate) fn truncate_to(mut s: String, max: usize) -> String {
    if s.len() > max {
        let mut end = max;
        while end > 0 && !s.is_char_boundary(end) {
            end -= 1;
        }
        s.truncate(end);
    }
    s
}
