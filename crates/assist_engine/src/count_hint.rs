use std::sync::LazyLock;

use ego_tree::NodeRef;
use regex::Regex;
use scraper::{ElementRef, Node};

use crate::config::DetectorConfig;
use crate::page::PageDocument;

static COUNT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(\d{1,6})\s*件",
        r"全\s*(\d{1,6})",
        r"(?i)(\d{1,6})\s*(?:rows|items|records|messages|results)\b",
        r"(?i)\b(?:total|of)\s*:?\s*(\d{1,6})\b",
    ]
    .into_iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

fn skip_subtree(element: ElementRef<'_>, panel_id: &str) -> bool {
    matches!(element.value().name(), "script" | "style" | "noscript" | "template")
        || (!panel_id.is_empty() && element.value().id() == Some(panel_id))
}

fn collect_text(node: NodeRef<'_, Node>, panel_id: &str, out: &mut String) {
    match node.value() {
        Node::Text(text) => {
            out.push_str(text);
            out.push(' ');
        }
        Node::Element(_) => {
            if let Some(element) = ElementRef::wrap(node) {
                if skip_subtree(element, panel_id) {
                    return;
                }
            }
            for child in node.children() {
                collect_text(child, panel_id, out);
            }
        }
        _ => {
            for child in node.children() {
                collect_text(child, panel_id, out);
            }
        }
    }
}

/// Visible body text, without scripts and without the assist panel.
pub fn body_text(document: &PageDocument, panel_id: &str) -> String {
    let mut out = String::new();
    collect_text(*document.body(), panel_id, &mut out);
    out
}

/// Largest plausible record count stated in `text`.
pub fn scrape_count(text: &str, min: u32, max: u32) -> Option<u32> {
    COUNT_PATTERNS
        .iter()
        .flat_map(|re| re.captures_iter(text))
        .filter_map(|caps| caps.get(1)?.as_str().parse::<u32>().ok())
        .filter(|n| (min..=max).contains(n))
        .max()
}

pub fn displayed_count_hint(document: &PageDocument, config: &DetectorConfig) -> Option<u32> {
    scrape_count(
        &body_text(document, &config.panel_id),
        config.min_displayed_count,
        config.max_displayed_count,
    )
}
