//! Checks that a translation kept the embedded HTML tags and placeholder
//! tokens of its input.

use regex::Regex;
use std::sync::OnceLock;

static TAG_REGEX: OnceLock<Regex> = OnceLock::new();
static PLACEHOLDER_REGEX: OnceLock<Regex> = OnceLock::new();

fn tag_regex() -> &'static Regex {
    TAG_REGEX.get_or_init(|| {
        Regex::new(r"<(/?)([a-zA-Z][a-zA-Z0-9-]*)\b[^>]*?(/?)>").expect("valid tag regex")
    })
}

fn placeholder_regex() -> &'static Regex {
    PLACEHOLDER_REGEX.get_or_init(|| {
        Regex::new(r"\{\{?\s*[A-Za-z0-9_.]+\s*\}?\}").expect("valid placeholder regex")
    })
}

/// Tag names with their kind, e.g. `<p>` -> "p", `</p>` -> "/p", `<br/>` -> "br/".
/// Sorted so that reordering inside a sentence is allowed.
fn extract_tags(text: &str) -> Vec<String> {
    let mut tags: Vec<String> = tag_regex()
        .captures_iter(text)
        .map(|c| {
            format!(
                "{}{}{}",
                &c[1],
                c[2].to_ascii_lowercase(),
                &c[3]
            )
        })
        .collect();
    tags.sort();
    tags
}

fn extract_placeholders(text: &str) -> Vec<String> {
    let mut tokens: Vec<String> = placeholder_regex()
        .find_iter(text)
        .map(|m| m.as_str().chars().filter(|c| !c.is_whitespace()).collect())
        .collect();
    tokens.sort();
    tokens
}

/// Describe what markup was lost or invented, or `None` if everything survived.
pub fn find_mismatch(original: &str, translated: &str) -> Option<String> {
    let original_tags = extract_tags(original);
    let translated_tags = extract_tags(translated);
    if original_tags != translated_tags {
        return Some(format!(
            "tags differ: original {:?}, translation {:?}",
            original_tags, translated_tags
        ));
    }

    let original_tokens = extract_placeholders(original);
    let translated_tokens = extract_placeholders(translated);
    if original_tokens != translated_tokens {
        return Some(format!(
            "placeholders differ: original {:?}, translation {:?}",
            original_tokens, translated_tokens
        ));
    }

    None
}
