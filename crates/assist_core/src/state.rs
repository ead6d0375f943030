use serde::Serialize;

use crate::{Effect, PassOrigin, PassSummary, SchedulerConfig, TimerKind};

/// `idle -> staged-retry(k) -> settled`, re-enterable on any trigger; `stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case", tag = "phase")]
pub enum Phase {
    #[default]
    Idle,
    StagedRetry { attempt: usize },
    Settled,
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SchedulerState {
    config: SchedulerConfig,
    phase: Phase,
    started: bool,
    pass_in_flight: bool,
    rerun_requested: bool,
    last_summary: Option<PassSummary>,
    last_address: Option<String>,
    passes_completed: u64,
}

/// Read-only projection used by diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchedulerView {
    pub phase: Phase,
    pub started: bool,
    pub pass_in_flight: bool,
    pub passes_completed: u64,
    pub last_summary: Option<PassSummary>,
    pub last_address: Option<String>,
}

impl SchedulerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SchedulerConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_stopped(&self) -> bool {
        self.phase == Phase::Stopped
    }

    pub fn last_address(&self) -> Option<&str> {
        self.last_address.as_deref()
    }

    pub fn view(&self) -> SchedulerView {
        SchedulerView {
            phase: self.phase,
            started: self.started,
            pass_in_flight: self.pass_in_flight,
            passes_completed: self.passes_completed,
            last_summary: self.last_summary,
            last_address: self.last_address.clone(),
        }
    }

    pub(crate) fn is_started(&self) -> bool {
        self.started
    }

    pub(crate) fn mark_started(&mut self, address: Option<String>) {
        self.started = true;
        self.last_address = address;
    }

    /// Returns false when the address is unchanged.
    pub(crate) fn record_address(&mut self, address: String) -> bool {
        if self.last_address.as_deref() == Some(address.as_str()) {
            return false;
        }
        self.last_address = Some(address);
        true
    }

    pub(crate) fn last_summary(&self) -> Option<PassSummary> {
        self.last_summary
    }

    pub(crate) fn timer_effect(&self, timer: TimerKind) -> Effect {
        let delay_ms = match timer {
            TimerKind::StagedRetry => self.config.staged_delay(0).unwrap_or(0),
            TimerKind::Debounce => self.config.debounce_ms,
            TimerKind::HealthCheck => self.config.health_check_ms,
            TimerKind::UrlPoll => self.config.url_poll_ms,
        };
        Effect::ArmTimer { timer, delay_ms }
    }

    /// (Re-)enters the staged retry sequence at its first attempt.
    pub(crate) fn enter_staged_retry(&mut self) -> Vec<Effect> {
        self.phase = Phase::StagedRetry { attempt: 0 };
        vec![self.timer_effect(TimerKind::StagedRetry)]
    }

    /// Moves past `attempt`, or settles when the sequence is exhausted.
    pub(crate) fn advance_staged_retry(&mut self, attempt: usize) -> Vec<Effect> {
        let next = attempt + 1;
        match self.config.staged_delay(next) {
            Some(delay_ms) => {
                self.phase = Phase::StagedRetry { attempt: next };
                vec![Effect::ArmTimer {
                    timer: TimerKind::StagedRetry,
                    delay_ms,
                }]
            }
            None => {
                self.phase = Phase::Settled;
                Vec::new()
            }
        }
    }

    /// Starts a pass now, or coalesces the request when one is already running.
    pub(crate) fn request_pass(&mut self, origin: PassOrigin) -> Vec<Effect> {
        if !self.pass_in_flight {
            self.pass_in_flight = true;
            return vec![Effect::RunPass { origin }];
        }
        match origin {
            // Keep the staged slot alive so the attempt counter still advances.
            PassOrigin::StagedRetry => vec![Effect::ArmTimer {
                timer: TimerKind::StagedRetry,
                delay_ms: self.config.debounce_ms,
            }],
            PassOrigin::Mutation | PassOrigin::Health => {
                self.rerun_requested = true;
                Vec::new()
            }
        }
    }

    /// Records a finished pass; returns the previously published summary.
    pub(crate) fn finish_pass(&mut self, summary: PassSummary) -> Option<PassSummary> {
        self.pass_in_flight = false;
        self.passes_completed += 1;
        self.last_summary.replace(summary)
    }

    pub(crate) fn take_rerun_request(&mut self) -> bool {
        std::mem::take(&mut self.rerun_requested)
    }

    pub(crate) fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }

    pub(crate) fn staged_attempts(&self) -> usize {
        self.config.staged_attempts()
    }
}
