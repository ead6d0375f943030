//! Markup-level helpers shared by the scorers: attribute access, visibility,
//! size hints and ancestor lookups over `scraper` element references.

use scraper::ElementRef;

const DEFAULT_TEXTAREA_ROWS: u32 = 2;
const DEFAULT_TEXTAREA_COLS: u32 = 20;
const DEFAULT_INPUT_SIZE: u32 = 20;
const CHAR_WIDTH_PX: u32 = 8;
const LINE_HEIGHT_PX: u32 = 16;
const INPUT_HEIGHT_PX: u32 = 20;

/// Attribute value lowercased, empty when absent.
pub fn attr_lower(element: ElementRef<'_>, name: &str) -> String {
    element
        .value()
        .attr(name)
        .map(str::to_lowercase)
        .unwrap_or_default()
}

pub fn tag(element: ElementRef<'_>) -> &str {
    element.value().name()
}

pub fn is_frame_element(element: ElementRef<'_>) -> bool {
    matches!(tag(element), "iframe" | "frame")
}

pub fn is_content_editable(element: ElementRef<'_>) -> bool {
    match element.value().attr("contenteditable") {
        Some(value) => {
            let value = value.trim().to_ascii_lowercase();
            value.is_empty() || value == "true" || value == "plaintext-only"
        }
        None => false,
    }
}

/// Text-entry controls a reply could be written into.
pub fn is_text_field(element: ElementRef<'_>) -> bool {
    match tag(element) {
        "textarea" => true,
        "input" => matches!(
            attr_lower(element, "type").as_str(),
            "" | "text" | "search" | "email"
        ),
        _ => is_content_editable(element),
    }
}

pub fn is_checkbox(element: ElementRef<'_>) -> bool {
    tag(element) == "input" && attr_lower(element, "type") == "checkbox"
}

pub fn is_submit_control(element: ElementRef<'_>) -> bool {
    match tag(element) {
        "button" => matches!(attr_lower(element, "type").as_str(), "" | "submit"),
        "input" => matches!(attr_lower(element, "type").as_str(), "submit" | "image"),
        _ => false,
    }
}

/// Value as written in the markup: textarea/contenteditable text, input `value`.
pub fn markup_value(element: ElementRef<'_>) -> String {
    match tag(element) {
        "input" => element.value().attr("value").unwrap_or_default().to_owned(),
        _ => element.text().collect(),
    }
}

/// Whitespace-collapsed text content.
pub fn text_of(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn style_declares(element: ElementRef<'_>, property: &str, value: &str) -> bool {
    let style: String = attr_lower(element, "style")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    style
        .split(';')
        .any(|decl| decl.strip_prefix(property).and_then(|v| v.strip_prefix(':')) == Some(value))
}

fn hides_itself(element: ElementRef<'_>) -> bool {
    element.value().attr("hidden").is_some()
        || style_declares(element, "display", "none")
        || style_declares(element, "visibility", "hidden")
}

/// Markup-derived visibility: the element and none of its ancestors are hidden.
pub fn is_visible(element: ElementRef<'_>) -> bool {
    if tag(element) == "input" && attr_lower(element, "type") == "hidden" {
        return false;
    }
    !std::iter::once(element)
        .chain(ancestors(element))
        .any(hides_itself)
}

pub fn ancestors(element: ElementRef<'_>) -> impl Iterator<Item = ElementRef<'_>> {
    element.ancestors().filter_map(ElementRef::wrap)
}

pub fn closest<'a>(element: ElementRef<'a>, tag_name: &str) -> Option<ElementRef<'a>> {
    ancestors(element).find(|el| tag(*el) == tag_name)
}

/// Nearest `data-type` marker on the element or an ancestor.
pub fn nearest_data_type(element: ElementRef<'_>) -> Option<String> {
    std::iter::once(element)
        .chain(ancestors(element))
        .find_map(|el| el.value().attr("data-type").map(str::to_lowercase))
}

/// Pixel length from an inline style declaration such as `width: 320px`.
pub fn inline_px(element: ElementRef<'_>, property: &str) -> Option<u32> {
    let style = attr_lower(element, "style");
    style.split(';').find_map(|decl| {
        let (name, value) = decl.split_once(':')?;
        if name.trim() != property {
            return None;
        }
        let value = value.trim().strip_suffix("px")?;
        value.trim().parse::<f32>().ok().map(|v| v.max(0.0) as u32)
    })
}

/// Declared width in px from the `width` attribute or inline style; percentages are ignored.
pub fn declared_width(element: ElementRef<'_>) -> Option<u32> {
    if let Some(px) = inline_px(element, "width") {
        return Some(px);
    }
    let raw = element.value().attr("width")?.trim();
    if raw.ends_with('%') {
        return None;
    }
    raw.trim_end_matches("px").parse().ok()
}

fn numeric_attr(element: ElementRef<'_>, name: &str) -> Option<u32> {
    element.value().attr(name)?.trim().parse().ok()
}

/// Approximate rendered area in px², from `rows`/`cols`, `size`, or inline dimensions.
pub fn size_hint(element: ElementRef<'_>) -> u32 {
    let (width, height) = match tag(element) {
        "textarea" => (
            numeric_attr(element, "cols").unwrap_or(DEFAULT_TEXTAREA_COLS) * CHAR_WIDTH_PX,
            numeric_attr(element, "rows").unwrap_or(DEFAULT_TEXTAREA_ROWS) * LINE_HEIGHT_PX,
        ),
        "input" => (
            numeric_attr(element, "size").unwrap_or(DEFAULT_INPUT_SIZE) * CHAR_WIDTH_PX,
            INPUT_HEIGHT_PX,
        ),
        _ => (
            DEFAULT_TEXTAREA_COLS * CHAR_WIDTH_PX,
            DEFAULT_TEXTAREA_ROWS * LINE_HEIGHT_PX,
        ),
    };
    let width = inline_px(element, "width").unwrap_or(width);
    let height = inline_px(element, "height").unwrap_or(height);
    width.saturating_mul(height)
}
