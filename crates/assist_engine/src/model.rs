use assist_core::{PageMode, PassSummary};
use ego_tree::NodeId;

use crate::page::{DocIndex, ElementHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentRole {
    Main,
    Frame,
}

/// One entry of the frame enumeration, recreated every pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentHandle {
    /// `None` when the frame content is not readable.
    pub doc: Option<DocIndex>,
    /// Frame element inside its parent document; `None` for the main document.
    pub frame_element: Option<(DocIndex, NodeId)>,
    pub role: DocumentRole,
    pub address: Option<String>,
    /// `name` or `id` of the frame element.
    pub frame_name: Option<String>,
    pub reachable: bool,
    pub depth: usize,
    /// Position in enumeration order.
    pub ordinal: usize,
}

impl DocumentHandle {
    pub fn label(&self) -> String {
        let place = match self.role {
            DocumentRole::Main => "main".to_owned(),
            DocumentRole::Frame => format!("frame[{}]", self.ordinal),
        };
        match (&self.address, &self.frame_name) {
            (Some(address), _) => format!("{place} {address}"),
            (None, Some(name)) => format!("{place} name={name}"),
            (None, None) => place,
        }
    }
}

/// Role of a document in the site's sub-application layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameRole {
    Listing,
    Compose,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputCandidate {
    pub element: ElementHandle,
    pub tag: String,
    pub name: String,
    pub id: String,
    pub css_class: String,
    pub placeholder: String,
    pub is_visible: bool,
    pub size_hint: u32,
    pub score: i32,
}

impl InputCandidate {
    pub fn describe(&self) -> String {
        let mut out = self.tag.clone();
        if !self.id.is_empty() {
            out.push('#');
            out.push_str(&self.id);
        }
        if !self.name.is_empty() {
            out.push_str(&format!("[name={}]", self.name));
        }
        for class in self.css_class.split_whitespace() {
            out.push('.');
            out.push_str(class);
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListContainerCandidate {
    pub container: ElementHandle,
    pub description: String,
    pub row_count: usize,
    pub has_checkboxes: bool,
    pub has_known_marker_cell: bool,
    pub header_vocabulary_hit: bool,
    pub score: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowResult {
    pub row_index: usize,
    pub chosen_input: Option<InputCandidate>,
}

/// How the rows of a document were obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowStrategy {
    Container,
    DocumentScan,
    BareCount,
    None,
}

/// A candidate that was looked at, with its verdict.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct CandidateVerdict {
    pub description: String,
    pub score: Option<i32>,
    pub rejection: Option<String>,
}

/// Everything one document produced during a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentReport {
    pub handle: DocumentHandle,
    pub frame_role: FrameRole,
    pub container: Option<ListContainerCandidate>,
    pub rows: Vec<RowResult>,
    pub strategy: RowStrategy,
    pub reply_input: Option<InputCandidate>,
    pub bare_row_count: usize,
    pub displayed_count_hint: Option<u32>,
    pub candidates: Vec<CandidateVerdict>,
    pub error: Option<String>,
}

impl DocumentReport {
    pub fn empty(handle: DocumentHandle, frame_role: FrameRole) -> Self {
        Self {
            handle,
            frame_role,
            container: None,
            rows: Vec::new(),
            strategy: RowStrategy::None,
            reply_input: None,
            bare_row_count: 0,
            displayed_count_hint: None,
            candidates: Vec::new(),
            error: None,
        }
    }

    pub fn chosen_rows(&self) -> usize {
        self.rows.iter().filter(|r| r.chosen_input.is_some()).count()
    }

    /// Writable targets this document offers: its chosen rows, or its single
    /// reply input when no row produced one.
    pub fn chosen_input_count(&self) -> usize {
        match self.chosen_rows() {
            0 => usize::from(self.reply_input.is_some()),
            n => n,
        }
    }

    pub fn container_score(&self) -> i32 {
        self.container.as_ref().map_or(0, |c| c.score)
    }
}

/// The reconciled, published state. Replaced wholesale after every pass.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DetectionResult {
    pub page_mode: PageMode,
    pub chosen_document: Option<DocumentHandle>,
    pub row_results: Vec<RowResult>,
    pub reply_input: Option<InputCandidate>,
    pub displayed_count_hint: Option<u32>,
    pub mismatch_warning: Option<String>,
    pub scope_description: String,
    pub timestamp_ms: u64,
    pub pass_id: u64,
}

impl DetectionResult {
    pub fn chosen_row_count(&self) -> usize {
        self.row_results
            .iter()
            .filter(|r| r.chosen_input.is_some())
            .count()
    }

    pub fn bare_row_count(&self) -> usize {
        if self.reply_input.is_none() && self.page_mode == PageMode::Listing {
            self.row_results.len()
        } else {
            0
        }
    }

    pub fn summary(&self) -> PassSummary {
        PassSummary {
            page_mode: self.page_mode,
            row_count: self.chosen_row_count(),
            bare_row_count: self.bare_row_count(),
            reply_input_found: self.reply_input.is_some(),
            displayed_count_hint: self.displayed_count_hint,
        }
    }
}
