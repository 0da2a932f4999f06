const MAX_TITLE_LENGTH: usize = 120;
const MAX_ERROR_LENGTH: usize = 2_000;

/// Cut `text` to at most `max` characters, marking the cut with `...`.
fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        None => text.to_string(),
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
    }
}

pub fn truncate_title(title: &str) -> String {
    truncate_chars(title.trim(), MAX_TITLE_LENGTH)
}

pub fn truncate_error(error: &str) -> String {
    truncate_chars(error, MAX_ERROR_LENGTH)
}
