use assist_core::{PageMode, SchedulerView};
use scraper::ElementRef;
use serde::Serialize;

use crate::dom;
use crate::model::{
    CandidateVerdict, DetectionResult, DocumentReport, DocumentRole, FrameRole, RowStrategy,
};
use crate::page::Page;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowSnapshot {
    pub row_index: usize,
    pub input: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultSnapshot {
    pub page_mode: PageMode,
    pub chosen_document: Option<String>,
    pub rows: Vec<RowSnapshot>,
    pub reply_input: Option<String>,
    pub displayed_count_hint: Option<u32>,
    pub mismatch_warning: Option<String>,
    pub scope_description: String,
    pub timestamp_ms: u64,
    pub pass_id: u64,
}

impl From<&DetectionResult> for ResultSnapshot {
    fn from(result: &DetectionResult) -> Self {
        Self {
            page_mode: result.page_mode,
            chosen_document: result.chosen_document.as_ref().map(|d| d.label()),
            rows: result
                .row_results
                .iter()
                .map(|r| RowSnapshot {
                    row_index: r.row_index,
                    input: r.chosen_input.as_ref().map(|c| c.describe()),
                })
                .collect(),
            reply_input: result.reply_input.as_ref().map(|c| c.describe()),
            displayed_count_hint: result.displayed_count_hint,
            mismatch_warning: result.mismatch_warning.clone(),
            scope_description: result.scope_description.clone(),
            timestamp_ms: result.timestamp_ms,
            pass_id: result.pass_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentDiagnostics {
    pub label: String,
    pub role: DocumentRole,
    pub frame_role: FrameRole,
    pub reachable: bool,
    pub depth: usize,
    pub address: Option<String>,
    pub container: Option<String>,
    pub container_score: Option<i32>,
    pub strategy: RowStrategy,
    pub rows: usize,
    pub chosen_inputs: Vec<String>,
    pub bare_row_count: usize,
    pub displayed_count_hint: Option<u32>,
    pub candidates: Vec<CandidateVerdict>,
    pub error: Option<String>,
}

impl From<&DocumentReport> for DocumentDiagnostics {
    fn from(report: &DocumentReport) -> Self {
        Self {
            label: report.handle.label(),
            role: report.handle.role,
            frame_role: report.frame_role,
            reachable: report.handle.reachable,
            depth: report.handle.depth,
            address: report.handle.address.clone(),
            container: report.container.as_ref().map(|c| c.description.clone()),
            container_score: report.container.as_ref().map(|c| c.score),
            strategy: report.strategy,
            rows: report.rows.len(),
            chosen_inputs: report
                .rows
                .iter()
                .filter_map(|r| r.chosen_input.as_ref().map(|c| c.describe()))
                .collect(),
            bare_row_count: report.bare_row_count,
            displayed_count_hint: report.displayed_count_hint,
            candidates: report.candidates.clone(),
            error: report.error.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSnapshot {
    pub document: String,
    pub name: String,
    pub id: String,
    pub class: String,
}

/// Copyable troubleshooting snapshot. Not persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    pub result: ResultSnapshot,
    pub scheduler: SchedulerView,
    pub stopped: bool,
    pub address: Option<String>,
    pub documents: Vec<DocumentDiagnostics>,
    pub textareas: Vec<FieldSnapshot>,
}

impl Diagnostics {
    pub fn collect(
        page: &Page,
        result: &DetectionResult,
        reports: &[DocumentReport],
        scheduler: SchedulerView,
    ) -> Self {
        let textareas = reports
            .iter()
            .filter(|r| r.handle.reachable)
            .filter_map(|r| Some((r.handle.label(), page.document(r.handle.doc?)?)))
            .flat_map(|(label, document)| {
                document
                    .body()
                    .descendants()
                    .filter_map(ElementRef::wrap)
                    .filter(|el| dom::tag(*el) == "textarea")
                    .map(|el| FieldSnapshot {
                        document: label.clone(),
                        name: el.value().attr("name").unwrap_or_default().to_owned(),
                        id: el.value().attr("id").unwrap_or_default().to_owned(),
                        class: el.value().attr("class").unwrap_or_default().to_owned(),
                    })
                    .collect::<Vec<_>>()
            })
            .collect();

        Self {
            result: ResultSnapshot::from(result),
            stopped: scheduler.phase == assist_core::Phase::Stopped,
            scheduler,
            address: page.address().map(str::to_owned),
            documents: reports.iter().map(DocumentDiagnostics::from).collect(),
            textareas,
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
