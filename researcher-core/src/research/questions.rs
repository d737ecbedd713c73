//! Follow-up question extraction from numbered-list model output.

use regex::Regex;
use std::sync::LazyLock;

static NUMBERED_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\s+(.+)$").expect("numbered line pattern is valid"));

/// Pull the items of a numbered list out of free text.
///
/// Only lines shaped like `<digits>. <content>` are kept, in order, with the
/// prefix removed and surrounding whitespace trimmed. Everything else is
/// ignored. No cap is applied: the model may return more or fewer items
/// than were asked for.
pub fn extract(raw_text: &str) -> Vec<String> {
    raw_text
        .lines()
        .filter_map(|line| {
            NUMBERED_LINE
                .captures(line.trim())
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().trim().to_string())
        })
        .filter(|q| !q.is_empty())
        .collect()
}
