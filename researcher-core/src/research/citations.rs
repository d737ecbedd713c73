//! Citation resolution for synthesized reports.
//!
//! `[SourceName]` markers become anchors pointing at the matching source,
//! and a `References:` section, when present, is rebuilt from the full
//! source list.

use crate::search::SearchResult;
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::LazyLock;

/// Either an already-linked citation (left alone) or a bare `[Name]` marker.
static CITATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<a [^>]*>\[[^\]]+\]</a>|\[([^\]]+)\]").expect("citation pattern is valid")
});

static HEADING_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#+\s*$").expect("heading prefix pattern is valid"));

const REFERENCES_MARKER: &str = "References:";

/// Resolve citation markers in `report` against `sources`.
///
/// Names match case-insensitively; when two sources share a name the later
/// one wins. Unknown markers stay as plain bracket text. If the report has a
/// `References:` delimiter, everything after the first one is replaced by a
/// numbered list of every source in order. Running this on its own output
/// with the same sources changes nothing.
pub fn link(report: &str, sources: &[SearchResult]) -> String {
    let by_name: HashMap<String, &SearchResult> = sources
        .iter()
        .map(|s| (s.source_name.to_lowercase(), s))
        .collect();

    let linked = CITATION.replace_all(report, |caps: &Captures| {
        let whole = &caps[0];
        let Some(name) = caps.get(1) else {
            return whole.to_string();
        };
        match by_name.get(&name.as_str().to_lowercase()) {
            Some(source) => anchor(&source.url, &format!("[{}]", source.source_name)),
            None => whole.to_string(),
        }
    });

    match linked.find(REFERENCES_MARKER) {
        Some(idx) => rebuild_references(&linked[..idx], sources),
        None => linked.into_owned(),
    }
}

fn anchor(url: &str, text: &str) -> String {
    format!(r#"<a href="{url}" target="_blank">{text}</a>"#)
}

/// Join the report body with a regenerated reference list.
///
/// A markdown heading prefix such as `## ` on the delimiter line stays
/// attached to the delimiter. Any other text before the delimiter is kept
/// as part of the body.
fn rebuild_references(body: &str, sources: &[SearchResult]) -> String {
    let line_start = body.rfind('\n').map(|i| i + 1).unwrap_or(0);
    let (content, prefix) = if HEADING_PREFIX.is_match(&body[line_start..]) {
        (body[..line_start].trim_end(), &body[line_start..])
    } else {
        (body.trim_end(), "")
    };

    let references = sources
        .iter()
        .enumerate()
        .map(|(i, s)| format!("{}. {}", i + 1, anchor(&s.url, &s.title)))
        .collect::<Vec<_>>()
        .join("\n");

    if content.is_empty() {
        format!("{prefix}{REFERENCES_MARKER}\n{references}")
    } else {
        format!("{content}\n\n{prefix}{REFERENCES_MARKER}\n{references}")
    }
}
