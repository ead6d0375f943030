use std::collections::HashSet;

use ego_tree::NodeId;
use scraper::{ElementRef, Selector};

use crate::analyze::AnalysisError;
use crate::candidates::{is_inside_panel, rank_inputs, ScoringScope};
use crate::config::DetectorConfig;
use crate::containers::container_rows;
use crate::model::{CandidateVerdict, FrameRole, ListContainerCandidate, RowResult, RowStrategy};
use crate::page::{DocIndex, PageDocument};

#[derive(Debug, Clone)]
pub struct RowCollection {
    pub rows: Vec<RowResult>,
    pub strategy: RowStrategy,
    pub bare_row_count: usize,
    pub verdicts: Vec<CandidateVerdict>,
}

impl RowCollection {
    fn chosen(&self) -> usize {
        self.rows.iter().filter(|r| r.chosen_input.is_some()).count()
    }
}

/// Per-row best input inside the container; each input is claimed once.
fn collect_from_container(
    document: &PageDocument,
    doc: DocIndex,
    container: &ListContainerCandidate,
    config: &DetectorConfig,
    verdicts: &mut Vec<CandidateVerdict>,
) -> Vec<RowResult> {
    let mut claimed: HashSet<NodeId> = HashSet::new();
    container_rows(document, &container.container)
        .into_iter()
        .enumerate()
        .map(|(row_index, row)| {
            let ranking = rank_inputs(document, doc, row, config, ScoringScope::Rows);
            let chosen = ranking
                .ordered()
                .into_iter()
                .find(|c| !claimed.contains(&c.element.node))
                .cloned();
            if let Some(c) = &chosen {
                claimed.insert(c.element.node);
            }
            verdicts.extend(ranking.verdicts);
            RowResult {
                row_index,
                chosen_input: chosen,
            }
        })
        .collect()
}

/// Every positively scored input in the document body, as one row each.
fn collect_from_document(
    document: &PageDocument,
    doc: DocIndex,
    config: &DetectorConfig,
    verdicts: &mut Vec<CandidateVerdict>,
) -> Vec<RowResult> {
    let ranking = rank_inputs(document, doc, document.body(), config, ScoringScope::Rows);
    let rows = ranking
        .accepted
        .iter()
        .filter(|c| c.score > 0)
        .enumerate()
        .map(|(row_index, c)| RowResult {
            row_index,
            chosen_input: Some(c.clone()),
        })
        .collect();
    verdicts.extend(ranking.verdicts);
    rows
}

/// Rows matched by the structural row markers, deduplicated.
pub fn bare_row_count(
    document: &PageDocument,
    config: &DetectorConfig,
) -> Result<usize, AnalysisError> {
    let mut seen: HashSet<NodeId> = HashSet::new();
    for css in &config.bare_row_selectors {
        let selector = Selector::parse(css).map_err(|err| AnalysisError::Selector {
            selector: css.clone(),
            message: err.to_string(),
        })?;
        for row in document.html().select(&selector) {
            if !is_inside_panel(row, &config.panel_id) {
                seen.insert(row.id());
            }
        }
    }
    Ok(seen.len())
}

/// Container rows first, a document-wide scan for listing frames second,
/// and a bare structural row count last.
pub fn collect_rows(
    document: &PageDocument,
    doc: DocIndex,
    container: Option<&ListContainerCandidate>,
    role: FrameRole,
    config: &DetectorConfig,
) -> Result<RowCollection, AnalysisError> {
    let mut verdicts = Vec::new();
    let container_rows = container
        .map(|c| collect_from_container(document, doc, c, config, &mut verdicts))
        .unwrap_or_default();

    let primary = RowCollection {
        rows: container_rows,
        strategy: RowStrategy::Container,
        bare_row_count: 0,
        verdicts: Vec::new(),
    };
    if primary.chosen() > 0 {
        return Ok(RowCollection { verdicts, ..primary });
    }
    let container_row_count = primary.rows.len();

    if role == FrameRole::Listing {
        let scanned = collect_from_document(document, doc, config, &mut verdicts);
        if !scanned.is_empty() {
            return Ok(RowCollection {
                rows: scanned,
                strategy: RowStrategy::DocumentScan,
                bare_row_count: 0,
                verdicts,
            });
        }
    }

    let bare = bare_row_count(document, config)?.max(container_row_count);
    if bare == 0 {
        return Ok(RowCollection {
            rows: Vec::new(),
            strategy: RowStrategy::None,
            bare_row_count: 0,
            verdicts,
        });
    }
    Ok(RowCollection {
        rows: (0..bare)
            .map(|row_index| RowResult {
                row_index,
                chosen_input: None,
            })
            .collect(),
        strategy: RowStrategy::BareCount,
        bare_row_count: bare,
        verdicts,
    })
}
