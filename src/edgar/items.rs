//! Item sections ("Item 2", "Item 9.01", ...) of 10-Q and 8-K documents.

use crate::domain::model::FilingSection;
use regex::Regex;
use std::sync::LazyLock;

static SCRIPT_STYLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<(script|style)[^>]*>.*?</(script|style)>").unwrap());
static BLOCK_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<\s*(br|/p|/div|/tr|/li|/h[1-6]|/table|/title)[^>]*>").unwrap()
});
static ANY_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());
static NUMERIC_ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#(x[0-9a-fA-F]+|[0-9]+);").unwrap());
static ITEM_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^item\s+(\d+[a-z]?(?:\.\d+)?)\b").unwrap());

fn decode_entities(text: &str) -> String {
    let text = NUMERIC_ENTITY.replace_all(text, |caps: &regex::Captures| {
        let raw = &caps[1];
        let code = match raw.strip_prefix('x').or_else(|| raw.strip_prefix('X')) {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => raw.parse::<u32>().ok(),
        };
        code.and_then(char::from_u32)
            .map(|c| if c == '\u{a0}' { ' ' } else { c })
            .map(String::from)
            .unwrap_or_default()
    });
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Plain text with one logical block per line.
pub fn html_to_text(html: &str) -> String {
    let text = SCRIPT_STYLE.replace_all(html, "");
    let text = BLOCK_TAG.replace_all(&text, "\n");
    let text = ANY_TAG.replace_all(&text, " ");
    let text = decode_entities(&text);

    text.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn canonical_item(number: &str) -> String {
    format!("Item {}", number.to_uppercase())
}

fn headings(text: &str) -> Vec<(usize, String)> {
    let mut found = Vec::new();
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        if let Some(caps) = ITEM_HEADING.captures(line.trim_start()) {
            found.push((offset, canonical_item(&caps[1])));
        }
        offset += line.len();
    }
    found
}

fn normalize_item_name(item: &str) -> String {
    match ITEM_HEADING.captures(item.trim()) {
        Some(caps) => canonical_item(&caps[1]),
        None => item.trim().to_string(),
    }
}

/// Distinct item headings in document order.
pub fn available_items(text: &str) -> Vec<String> {
    let mut items: Vec<String> = Vec::new();
    for (_, item) in headings(text) {
        if !items.contains(&item) {
            items.push(item);
        }
    }
    items
}

/// Text of `item` up to the next item heading.
///
/// A heading can appear several times (table of contents, then the body); the longest
/// span is taken to be the body.
pub fn extract_item(text: &str, item: &str) -> Option<FilingSection> {
    let wanted = normalize_item_name(item);
    let found = headings(text);

    found
        .iter()
        .enumerate()
        .filter(|(_, (_, name))| *name == wanted)
        .map(|(i, (start, _))| {
            let end = found.get(i + 1).map(|(next, _)| *next).unwrap_or(text.len());
            text[*start..end].trim()
        })
        .max_by_key(|section| section.len())
        .map(|section| FilingSection {
            item: item.trim().to_string(),
            text: section.to_string(),
        })
}

/// Case-insensitive, non-overlapping occurrences of `phrase`.
pub fn count_phrase(text: &str, phrase: &str) -> usize {
    if phrase.is_empty() {
        return 0;
    }
    text.to_lowercase().matches(&phrase.to_lowercase()).count()
}
