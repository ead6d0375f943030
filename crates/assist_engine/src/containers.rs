//! List-container scoring: finds "the" listing table of a document.
//!
//! Every `table` is a candidate. Its rows are the `tr` elements whose nearest
//! table ancestor is the candidate itself, so nested tables are scored on
//! their own. Header rows (only `th` cells) are counted as header text, not
//! as data rows.

use scraper::ElementRef;

use crate::candidates::is_inside_panel;
use crate::config::{ContainerScoring, DetectorConfig};
use crate::dom;
use crate::model::{CandidateVerdict, ListContainerCandidate};
use crate::page::{DocIndex, ElementHandle, PageDocument};

fn is_header_row(row: ElementRef<'_>) -> bool {
    let mut cells = row
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|el| matches!(dom::tag(*el), "td" | "th"))
        .peekable();
    cells.peek().is_some() && cells.all(|cell| dom::tag(cell) == "th")
}

fn own_rows(table: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    table
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|el| dom::tag(*el) == "tr")
        .filter(|row| dom::closest(*row, "table").map(|t| t.id()) == Some(table.id()))
        .collect()
}

/// Data rows of a table in document order.
pub fn data_rows(table: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    own_rows(table)
        .into_iter()
        .filter(|row| !is_header_row(*row))
        .collect()
}

fn header_text(table: ElementRef<'_>) -> String {
    let rows = own_rows(table);
    let headers: Vec<String> = rows
        .iter()
        .filter(|row| is_header_row(**row))
        .map(|row| dom::text_of(*row))
        .collect();
    if headers.is_empty() {
        rows.first().map(|row| dom::text_of(*row)).unwrap_or_default()
    } else {
        headers.join(" ")
    }
}

fn has_marker(row: ElementRef<'_>, rules: &ContainerScoring) -> bool {
    let class = dom::attr_lower(row, "class");
    let id = dom::attr_lower(row, "id");
    let row_marked = rules
        .row_class_markers
        .iter()
        .any(|m| class.split_whitespace().any(|c| c == m.to_lowercase()))
        || rules
            .row_id_prefixes
            .iter()
            .any(|p| !p.is_empty() && id.starts_with(&p.to_lowercase()));
    row_marked
        || row
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(|el| matches!(dom::tag(*el), "td" | "th"))
            .any(|cell| {
                let class = dom::attr_lower(cell, "class");
                rules
                    .cell_class_markers
                    .iter()
                    .any(|m| class.contains(&m.to_lowercase()))
            })
}

fn describe_table(table: ElementRef<'_>) -> String {
    let mut out = "table".to_owned();
    if let Some(id) = table.value().attr("id") {
        out.push('#');
        out.push_str(id);
    }
    for class in table.value().attr("class").unwrap_or_default().split_whitespace() {
        out.push('.');
        out.push_str(class);
    }
    out
}

/// Scores one table. `Err` carries the reason a table cannot be a listing.
pub fn score_container(
    table: ElementRef<'_>,
    rules: &ContainerScoring,
) -> Result<ScoredTable, String> {
    if let Some(width) = dom::declared_width(table) {
        if width < rules.min_width_px {
            return Err(format!("too narrow ({width}px)"));
        }
    }
    let rows = data_rows(table);
    let row_count = rows.len();
    let mut score = if row_count < rules.min_rows {
        -rules.below_min_rows_penalty
    } else {
        (row_count as i32 * rules.points_per_row).min(rules.max_row_points)
    };

    let rows_with_checkbox = rows
        .iter()
        .filter(|row| {
            row.descendants()
                .filter_map(ElementRef::wrap)
                .any(dom::is_checkbox)
        })
        .count();
    if row_count > 0 {
        score += rules.checkbox_weight * rows_with_checkbox as i32 / row_count as i32;
    }

    let has_known_marker_cell = rows.iter().any(|row| has_marker(*row, rules));
    if has_known_marker_cell {
        score += rules.marker_bonus;
    }

    let class = dom::attr_lower(table, "class");
    if rules
        .container_class_markers
        .iter()
        .any(|m| class.split_whitespace().any(|c| c.contains(&m.to_lowercase())))
    {
        score += rules.container_class_bonus;
    }

    let header = header_text(table).to_lowercase();
    let hits = rules
        .header_vocabulary
        .iter()
        .filter(|word| header.contains(&word.to_lowercase()))
        .count() as i32;
    score += (hits * rules.header_points).min(rules.max_header_points);

    Ok(ScoredTable {
        row_count,
        has_checkboxes: rows_with_checkbox > 0,
        has_known_marker_cell,
        header_vocabulary_hit: hits > 0,
        score,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoredTable {
    pub row_count: usize,
    pub has_checkboxes: bool,
    pub has_known_marker_cell: bool,
    pub header_vocabulary_hit: bool,
    pub score: i32,
}

#[derive(Debug, Clone, Default)]
pub struct ContainerSelection {
    /// Best container, only when it clears the acceptance threshold.
    pub accepted: Option<ListContainerCandidate>,
    pub verdicts: Vec<CandidateVerdict>,
}

pub fn select_container(
    document: &PageDocument,
    doc: DocIndex,
    config: &DetectorConfig,
) -> ContainerSelection {
    let rules = &config.containers;
    let mut selection = ContainerSelection::default();
    let mut best: Option<ListContainerCandidate> = None;

    for table in document
        .body()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|el| dom::tag(*el) == "table")
    {
        if is_inside_panel(table, &config.panel_id) {
            continue;
        }
        let description = describe_table(table);
        match score_container(table, rules) {
            Ok(scored) => {
                selection.verdicts.push(CandidateVerdict {
                    description: description.clone(),
                    score: Some(scored.score),
                    rejection: None,
                });
                let candidate = ListContainerCandidate {
                    container: document.handle(doc, table),
                    description,
                    row_count: scored.row_count,
                    has_checkboxes: scored.has_checkboxes,
                    has_known_marker_cell: scored.has_known_marker_cell,
                    header_vocabulary_hit: scored.header_vocabulary_hit,
                    score: scored.score,
                };
                if best.as_ref().is_none_or(|b| candidate.score > b.score) {
                    best = Some(candidate);
                }
            }
            Err(reason) => selection.verdicts.push(CandidateVerdict {
                description,
                score: None,
                rejection: Some(reason),
            }),
        }
    }

    selection.accepted = best.filter(|b| b.score >= rules.acceptance_threshold);
    selection
}

/// Rows of an accepted container, resolved against its document.
pub fn container_rows<'a>(
    document: &'a PageDocument,
    container: &ElementHandle,
) -> Vec<ElementRef<'a>> {
    if document.generation() != container.generation {
        return Vec::new();
    }
    document
        .element(container.node)
        .map(data_rows)
        .unwrap_or_default()
}
