use assist_logging::{assist_debug, assist_info, assist_warn};

use crate::{Effect, Msg, PassOrigin, PassSummary, Phase, SchedulerState, TimerKind};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: SchedulerState, msg: Msg) -> (SchedulerState, Vec<Effect>) {
    if state.is_stopped() {
        // Terminal: every later message, including a repeated Stop, is a no-op.
        return (state, Vec::new());
    }

    let effects = match msg {
        Msg::Started { address } => {
            if state.is_started() {
                return (state, Vec::new());
            }
            state.mark_started(address);
            let mut effects = state.enter_staged_retry();
            effects.push(state.timer_effect(TimerKind::HealthCheck));
            effects.push(state.timer_effect(TimerKind::UrlPoll));
            effects
        }
        Msg::Mutation { from_panel: true } => Vec::new(),
        Msg::Mutation { from_panel: false } | Msg::FrameContentChanged => {
            if !state.is_started() {
                return (state, Vec::new());
            }
            vec![state.timer_effect(TimerKind::Debounce)]
        }
        Msg::UrlChanged { address } => {
            if !state.is_started() || !state.record_address(address) {
                return (state, Vec::new());
            }
            assist_info!(
                "Address changed to {:?}; restarting staged detection",
                state.last_address()
            );
            state.enter_staged_retry()
        }
        Msg::ManualDetect => {
            if !state.is_started() {
                return (state, Vec::new());
            }
            state.enter_staged_retry()
        }
        Msg::TimerFired(timer) => on_timer(&mut state, timer),
        Msg::PassCompleted { origin, summary } => on_pass_completed(&mut state, origin, summary),
        Msg::Stop => {
            state.set_phase(Phase::Stopped);
            vec![Effect::CancelAllTimers, Effect::DisconnectWatchers]
        }
        Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn on_timer(state: &mut SchedulerState, timer: TimerKind) -> Vec<Effect> {
    match timer {
        TimerKind::StagedRetry => match state.phase() {
            Phase::StagedRetry { .. } => state.request_pass(PassOrigin::StagedRetry),
            _ => Vec::new(),
        },
        TimerKind::Debounce => state.request_pass(PassOrigin::Mutation),
        TimerKind::HealthCheck => {
            let mut effects = vec![state.timer_effect(TimerKind::HealthCheck)];
            if matches!(state.phase(), Phase::StagedRetry { .. }) {
                return effects;
            }
            let unhealthy = state
                .last_summary()
                .map_or(true, |summary| summary.is_unhealthy());
            if unhealthy {
                assist_debug!("Health check: published result unhealthy, re-running detection");
                effects.extend(state.request_pass(PassOrigin::Health));
            }
            effects.push(Effect::VerifyPanel);
            effects
        }
        TimerKind::UrlPoll => vec![state.timer_effect(TimerKind::UrlPoll), Effect::CheckUrl],
    }
}

fn on_pass_completed(
    state: &mut SchedulerState,
    origin: PassOrigin,
    summary: PassSummary,
) -> Vec<Effect> {
    let previous = state.finish_pass(summary);
    let mut effects = Vec::new();

    match state.phase() {
        Phase::StagedRetry { attempt } => {
            if summary.is_converged() {
                assist_info!("Detection converged on staged attempt {}", attempt + 1);
                state.set_phase(Phase::Settled);
                effects.push(Effect::CancelTimer(TimerKind::StagedRetry));
            } else if origin == PassOrigin::StagedRetry {
                effects.extend(state.advance_staged_retry(attempt));
                if state.phase() == Phase::Settled {
                    assist_warn!(
                        "Staged detection retries exhausted after {} attempts \
                         (rows={}, bare_rows={}, reply_input={})",
                        state.staged_attempts(),
                        summary.row_count,
                        summary.bare_row_count,
                        summary.reply_input_found
                    );
                }
            }
        }
        Phase::Idle | Phase::Settled => {
            let mode_changed = previous.is_some_and(|prev| prev.page_mode != summary.page_mode);
            if mode_changed && !summary.is_converged() {
                assist_info!(
                    "Page mode changed to {:?}; entering staged detection",
                    summary.page_mode
                );
                // This pass counts as the first attempt of the new sequence.
                effects.extend(state.advance_staged_retry(0));
            }
        }
        Phase::Stopped => {}
    }

    if state.take_rerun_request() {
        effects.push(state.timer_effect(TimerKind::Debounce));
    }
    effects
}
