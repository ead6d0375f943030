//! Reply assist engine: page model, discovery heuristics, insertion and the
//! session driver that executes scheduler effects.
mod analyze;
mod candidates;
mod classify;
mod collaborators;
mod config;
mod containers;
mod count_hint;
mod decode;
mod diagnostics;
pub mod dom;
mod engine;
mod exclusion;
mod fetch;
mod frames;
mod insert;
mod messages;
mod model;
mod page;
mod persist;
mod reconcile;
mod rows;
mod session;
mod timers;
mod types;

pub use analyze::{analyze_all, analyze_document, AnalysisError};
pub use candidates::{
    is_compose_form_field, rank_inputs, score_attributes, score_input, Ranking, Rejection,
    ScoringScope,
};
pub use classify::classify_frame;
pub use collaborators::{
    load_messages, load_sheet_url, save_messages, save_sheet_url, settings_key, store_setting,
    MemorySettings, NoticeLevel, Notifier, NullNotifier, NullPanel, PanelHost, RecordingNotifier,
    SettingsStore, MESSAGES_KEY, SHEET_URL_KEY,
};
pub use config::{
    ConfigError, ContainerScoring, DetectorConfig, ExclusionRules, FramePatterns, InputScoring,
    Weighted,
};
pub use containers::{
    container_rows, data_rows, score_container, select_container, ContainerSelection, ScoredTable,
};
pub use count_hint::{body_text, displayed_count_hint, scrape_count};
pub use decode::{decode_text, DecodeError, DecodedText};
pub use diagnostics::{Diagnostics, DocumentDiagnostics, FieldSnapshot, ResultSnapshot, RowSnapshot};
pub use engine::{load_sheet, SheetLoaderHandle};
pub use exclusion::{exclusion_match, is_excluded, ExclusionMatch, FieldAttributes};
pub use fetch::{ChannelProgressSink, FetchSettings, Fetcher, NullSink, ProgressSink, SheetFetcher};
pub use frames::{enumerate_documents, FrameWatchers};
pub use insert::{insert_batch, insert_single, BatchReport, InsertError, InsertOutcome};
pub use messages::{
    normalize_sheet_url, parse_csv, parse_direct_input, CsvOptions, MessageSourceError,
};
pub use model::{
    CandidateVerdict, DetectionResult, DocumentHandle, DocumentReport, DocumentRole, FrameRole,
    InputCandidate, ListContainerCandidate, RowResult, RowStrategy,
};
pub use page::{
    is_same_origin, resolve_address, DocIndex, ElementHandle, FrameContent, FrameSlot, Page,
    PageDocument, MAIN_DOCUMENT,
};
pub use persist::{AtomicFileWriter, PersistError};
pub use reconcile::{compare_reports, page_count_hint, reconcile, select_winner};
pub use rows::{bare_row_count, collect_rows, RowCollection};
pub use session::Session;
pub use timers::{Clock, ManualClock, SystemClock, TimerQueue};
pub use types::{FailureKind, FetchError, LoadId, SheetDownload, SheetEvent};
