//! Cross-frame reconciliation: picks one winning document per pass.
//!
//! Among documents offering at least one writable target, the order is:
//! a listing frame with chosen rows, then non-compose over compose, then
//! more chosen inputs, then closeness to the displayed-count hint, then
//! container score. Equal candidates keep the one enumerated first.

use std::cmp::Ordering;

use assist_core::PageMode;

use crate::model::{DetectionResult, DocumentReport, FrameRole, RowResult, RowStrategy};

/// Maximum displayed-count hint across all documents.
pub fn page_count_hint(reports: &[DocumentReport]) -> Option<u32> {
    reports.iter().filter_map(|r| r.displayed_count_hint).max()
}

/// Distance between the rows a document found (with or without inputs) and
/// the displayed count.
fn hint_distance(report: &DocumentReport, hint: Option<u32>) -> Option<u64> {
    let rows = report.rows.len().max(report.chosen_input_count());
    hint.map(|h| (rows as i64 - i64::from(h)).unsigned_abs())
}

/// `Greater` when `a` should win over `b`.
pub fn compare_reports(a: &DocumentReport, b: &DocumentReport, hint: Option<u32>) -> Ordering {
    let listing = |r: &DocumentReport| r.frame_role == FrameRole::Listing && r.chosen_rows() > 0;
    let non_compose = |r: &DocumentReport| r.frame_role != FrameRole::Compose;

    listing(a)
        .cmp(&listing(b))
        .then_with(|| non_compose(a).cmp(&non_compose(b)))
        .then_with(|| a.chosen_input_count().cmp(&b.chosen_input_count()))
        .then_with(|| match (hint_distance(a, hint), hint_distance(b, hint)) {
            (Some(da), Some(db)) => db.cmp(&da),
            _ => Ordering::Equal,
        })
        .then_with(|| a.container_score().cmp(&b.container_score()))
}

/// Index of the winning report, if any document offers a writable target.
pub fn select_winner(reports: &[DocumentReport], hint: Option<u32>) -> Option<usize> {
    let mut winner: Option<usize> = None;
    for (index, report) in reports.iter().enumerate() {
        if report.chosen_input_count() == 0 {
            continue;
        }
        match winner {
            Some(current)
                if compare_reports(report, &reports[current], hint) != Ordering::Greater => {}
            _ => winner = Some(index),
        }
    }
    winner
}

fn page_mode_of(report: &DocumentReport) -> PageMode {
    let chosen = report.chosen_rows();
    if chosen > 0 && (report.frame_role == FrameRole::Listing || chosen >= 2) {
        PageMode::Listing
    } else if report.reply_input.is_some() {
        PageMode::SingleRecord
    } else {
        PageMode::Other
    }
}

fn scope_of(report: &DocumentReport) -> String {
    let label = report.handle.label();
    match (&report.strategy, &report.container) {
        (RowStrategy::Container, Some(container)) => format!("{label} / {}", container.description),
        (RowStrategy::DocumentScan, _) => format!("{label} / document scan"),
        (RowStrategy::BareCount, _) => format!("{label} / bare rows"),
        _ => label,
    }
}

/// Builds the published result from per-document reports. Timestamp and
/// pass id are left for the caller.
pub fn reconcile(reports: &[DocumentReport]) -> DetectionResult {
    let hint = page_count_hint(reports);

    if let Some(index) = select_winner(reports, hint) {
        let report = &reports[index];
        let page_mode = page_mode_of(report);
        let (row_results, reply_input) = match page_mode {
            PageMode::Listing => {
                let rows: Vec<RowResult> = report.rows.clone();
                let first = rows.iter().find_map(|r| r.chosen_input.clone());
                (rows, first)
            }
            _ => (Vec::new(), report.reply_input.clone()),
        };
        let chosen = row_results.iter().filter(|r| r.chosen_input.is_some()).count();
        let mismatch_warning = match (page_mode, hint) {
            (PageMode::Listing, Some(h)) if h as usize != chosen => Some(format!(
                "page shows {h} records but {chosen} reply fields were found"
            )),
            _ => None,
        };
        return DetectionResult {
            page_mode,
            chosen_document: Some(report.handle.clone()),
            row_results,
            reply_input,
            displayed_count_hint: hint,
            mismatch_warning,
            scope_description: scope_of(report),
            timestamp_ms: 0,
            pass_id: 0,
        };
    }

    let bare = reports
        .iter()
        .filter(|r| r.bare_row_count > 0)
        .fold(None, |best: Option<&DocumentReport>, r| match best {
            Some(b) if b.bare_row_count >= r.bare_row_count => Some(b),
            _ => Some(r),
        });
    if let Some(report) = bare {
        return DetectionResult {
            page_mode: PageMode::Listing,
            chosen_document: Some(report.handle.clone()),
            row_results: report.rows.clone(),
            reply_input: None,
            displayed_count_hint: hint,
            mismatch_warning: Some(format!(
                "{} rows rendered but reply fields not yet available",
                report.bare_row_count
            )),
            scope_description: scope_of(report),
            timestamp_ms: 0,
            pass_id: 0,
        };
    }

    let unreachable = reports.iter().filter(|r| !r.handle.reachable).count();
    DetectionResult {
        page_mode: PageMode::Other,
        chosen_document: None,
        row_results: Vec::new(),
        reply_input: None,
        displayed_count_hint: hint,
        mismatch_warning: hint.map(|h| {
            format!(
                "page shows {h} records but no reply fields are reachable \
                 ({unreachable} unreadable frames)"
            )
        }),
        scope_description: "not found".to_owned(),
        timestamp_ms: 0,
        pass_id: 0,
    }
}
