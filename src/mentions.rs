//! `@[display](id)` mention markup in comment text.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

fn mention_regex() -> &'static Regex {
    static MENTION_REGEX: OnceLock<Regex> = OnceLock::new();
    MENTION_REGEX.get_or_init(|| {
        Regex::new(r"@\[([^\]\n]+)\]\(([^)\s]+)\)").expect("Failed to compile mention regex")
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mention {
    pub id: String,
    pub display: String,
}

/// User ids are stored in canonical uuid form (lowercase, hyphenated) so they
/// match ids taken from request paths. Anything else is kept as written.
fn normalize_id(raw: &str) -> String {
    uuid::Uuid::parse_str(raw)
        .map(|id| id.to_string())
        .unwrap_or_else(|_| raw.to_string())
}

/// Extract mentions in order of first appearance. A user mentioned twice is
/// kept once, with the display text of the first occurrence.
pub fn parse_mentions(text: &str) -> Vec<Mention> {
    let mut mentions: Vec<Mention> = Vec::new();
    for caps in mention_regex().captures_iter(text) {
        let display = caps[1].trim();
        let id = normalize_id(caps[2].trim());
        if display.is_empty() || mentions.iter().any(|m| m.id == id) {
            continue;
        }
        mentions.push(Mention {
            id,
            display: display.to_string(),
        });
    }
    mentions
}
