use std::borrow::Cow;

pub const ELLIPSIS: &str = "...";

/// Cuts `text` to at most `ceiling` characters, ending in `...` when cut.
pub fn truncate_to_ceiling(text: &str, ceiling: usize) -> Cow<'_, str> {
    if text.chars().count() <= ceiling {
        return Cow::Borrowed(text);
    }
    let keep = ceiling.saturating_sub(ELLIPSIS.len());
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(ELLIPSIS);
    Cow::Owned(out)
}

/// Short single-line preview for log lines.
pub fn preview(text: &str, max_chars: usize) -> String {
    let flat = text.replace('\n', " ");
    match flat.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &flat[..idx]),
        None => flat,
    }
}
