use serde::Serialize;

use crate::PassOrigin;

/// Side effects requested by [`crate::update`]; the host driver executes them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Run one full reconciliation pass and report back with `Msg::PassCompleted`.
    RunPass { origin: PassOrigin },
    /// Arm (or re-arm, replacing any pending deadline) a timer.
    ArmTimer { timer: TimerKind, delay_ms: u64 },
    CancelTimer(TimerKind),
    CancelAllTimers,
    /// Disconnect every mutation watcher and frame listener.
    DisconnectWatchers,
    /// Check that the panel collaborator is still mounted.
    VerifyPanel,
    /// Compare the live address against the last known one.
    CheckUrl,
}

/// One slot per kind: arming a kind that is already pending moves its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerKind {
    StagedRetry,
    Debounce,
    HealthCheck,
    UrlPoll,
}
