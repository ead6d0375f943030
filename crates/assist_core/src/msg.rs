use crate::{PassOrigin, PassSummary, TimerKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Initial load of a page the tool runs on.
    Started { address: Option<String> },
    /// DOM mutation inside a watched scope.
    Mutation { from_panel: bool },
    /// A watched frame element loaded new content.
    FrameContentChanged,
    /// Address changed through the history API, interception, or polling.
    UrlChanged { address: String },
    /// Operator pressed "detect again".
    ManualDetect,
    /// A timer armed through `Effect::ArmTimer` elapsed.
    TimerFired(TimerKind),
    /// A reconciliation pass ran to completion.
    PassCompleted {
        origin: PassOrigin,
        summary: PassSummary,
    },
    /// Stop the tool. Idempotent.
    Stop,
    /// Fallback for placeholder wiring.
    NoOp,
}
