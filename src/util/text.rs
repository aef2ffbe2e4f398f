/// Number of Unicode scalar values (code points) in `s`.
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Clip `s` to at most `max_chars` code points. Returns the input untouched
/// when it already fits.
pub fn clip_chars(s: String, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => {
            let mut s = s;
            s.truncate(byte_idx);
            s
        }
        None => s,
    }
}

/// First line of `s`, cut to `max_chars` code points. A `...` suffix marks
/// that something was hidden, either more characters or more lines.
pub fn preview_line(s: &str, max_chars: usize) -> String {
    let first = s.split('\n').next().unwrap_or("");
    let has_more_lines = s.contains('\n');
    if char_len(first) <= max_chars && !has_more_lines {
        return first.to_string();
    }
    let clipped = clip_chars(first.to_string(), max_chars);
    format!("{}...", clipped.trim_end())
}
