use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

static CARD_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[([^\[\]]+)\]\]").expect("valid regex"));

/// Extract `[[Card Name]]` mentions in order of appearance. Names are trimmed;
/// blank ones are dropped; repeats are kept.
pub fn extract_tags(text: &str) -> Vec<String> {
    CARD_TAG_RE
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .filter(|name| !name.is_empty())
        .map(String::from)
        .collect()
}

/// Normalized form of a card name, used for dedup and cache keys.
pub fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Collapse repeats case-insensitively, keeping the first spelling and order.
pub fn unique_tags(tags: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    tags.into_iter()
        .filter(|tag| seen.insert(normalize(tag)))
        .collect()
}
