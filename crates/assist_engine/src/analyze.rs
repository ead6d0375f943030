use assist_logging::assist_debug;
use thiserror::Error;

use crate::candidates::{rank_inputs, ScoringScope};
use crate::classify::classify_frame;
use crate::config::DetectorConfig;
use crate::containers::select_container;
use crate::count_hint::displayed_count_hint;
use crate::model::{DocumentHandle, DocumentReport};
use crate::page::Page;
use crate::rows::collect_rows;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("document {0} is not part of the page")]
    MissingDocument(usize),
    #[error("invalid row selector '{selector}': {message}")]
    Selector { selector: String, message: String },
}

/// Runs scoring, row collection and count scraping for one reachable document.
pub fn analyze_document(
    page: &Page,
    handle: &DocumentHandle,
    config: &DetectorConfig,
) -> Result<DocumentReport, AnalysisError> {
    let frame_role = classify_frame(
        handle.address.as_deref(),
        handle.frame_name.as_deref(),
        &config.frames,
    );
    let mut report = DocumentReport::empty(handle.clone(), frame_role);
    let Some(doc) = handle.doc.filter(|_| handle.reachable) else {
        return Ok(report);
    };
    let document = page.document(doc).ok_or(AnalysisError::MissingDocument(doc))?;

    let selection = select_container(document, doc, config);
    let rows = collect_rows(
        document,
        doc,
        selection.accepted.as_ref(),
        frame_role,
        config,
    )?;

    let reply_input = match rows.rows.iter().find_map(|r| r.chosen_input.clone()) {
        Some(first) => Some(first),
        None => rank_inputs(document, doc, document.body(), config, ScoringScope::Document)
            .best()
            .filter(|c| c.score > 0)
            .cloned(),
    };

    report.candidates = selection.verdicts;
    report.candidates.extend(rows.verdicts);
    report.container = selection.accepted;
    report.rows = rows.rows;
    report.strategy = rows.strategy;
    report.bare_row_count = rows.bare_row_count;
    report.reply_input = reply_input;
    report.displayed_count_hint = displayed_count_hint(document, config);

    assist_debug!(
        "{}: role={:?} rows={} chosen={} bare={} hint={:?}",
        handle.label(),
        frame_role,
        report.rows.len(),
        report.chosen_rows(),
        report.bare_row_count,
        report.displayed_count_hint
    );
    Ok(report)
}

/// Analyzes every enumerated document. A failing document is kept with its
/// error recorded and no candidates.
pub fn analyze_all(
    page: &Page,
    handles: &[DocumentHandle],
    config: &DetectorConfig,
) -> Vec<DocumentReport> {
    handles
        .iter()
        .map(|handle| {
            analyze_document(page, handle, config).unwrap_or_else(|err| {
                let role = classify_frame(
                    handle.address.as_deref(),
                    handle.frame_name.as_deref(),
                    &config.frames,
                );
                let mut report = DocumentReport::empty(handle.clone(), role);
                report.error = Some(err.to_string());
                report
            })
        })
        .collect()
}
