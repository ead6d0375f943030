//! The host-side driver of the detection scheduler.
//!
//! `Session` owns the page, the timer queue and the published result. It
//! feeds messages to [`assist_core::update`], executes the returned effects
//! and fires due timers until nothing is left to do. All work happens on the
//! caller's thread; a pass always completes before the next message is
//! handled.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use assist_core::{
    update, Effect, Msg, PassOrigin, PassSummary, SchedulerConfig, SchedulerState, SchedulerView,
    TimerKind,
};
use assist_logging::{assist_debug, assist_info, assist_warn, enter_pass};
use ego_tree::NodeId;

use crate::analyze::analyze_all;
use crate::collaborators::{NoticeLevel, Notifier, NullNotifier, NullPanel, PanelHost};
use crate::config::DetectorConfig;
use crate::diagnostics::Diagnostics;
use crate::frames::{enumerate_documents, FrameWatchers};
use crate::insert::{self, BatchReport, InsertError, InsertOutcome};
use crate::model::{DetectionResult, DocumentReport};
use crate::page::{DocIndex, FrameContent, Page};
use crate::reconcile::reconcile;
use crate::timers::{Clock, SystemClock, TimerQueue};

pub struct Session {
    page: Page,
    config: DetectorConfig,
    scheduler: SchedulerState,
    timers: TimerQueue,
    clock: Box<dyn Clock>,
    watchers: FrameWatchers,
    panel: Box<dyn PanelHost>,
    notifier: Box<dyn Notifier>,
    result: Arc<DetectionResult>,
    reports: Vec<DocumentReport>,
    inbox: VecDeque<Msg>,
    passes_run: u64,
}

impl Session {
    pub fn new(page: Page) -> Self {
        Self {
            page,
            config: DetectorConfig::default(),
            scheduler: SchedulerState::new(),
            timers: TimerQueue::new(),
            clock: Box::new(SystemClock::new()),
            watchers: FrameWatchers::new(),
            panel: Box::new(NullPanel),
            notifier: Box::new(NullNotifier),
            result: Arc::new(DetectionResult::default()),
            reports: Vec::new(),
            inbox: VecDeque::new(),
            passes_run: 0,
        }
    }

    pub fn with_config(mut self, config: DetectorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_scheduler_config(mut self, config: SchedulerConfig) -> Self {
        self.scheduler = SchedulerState::with_config(config);
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_panel(mut self, panel: impl PanelHost + 'static) -> Self {
        self.panel = Box::new(panel);
        self
    }

    pub fn with_notifier(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifier = Box::new(notifier);
        self
    }

    pub fn start(&mut self) {
        self.watchers.reconnect();
        let address = self.page.address().map(str::to_owned);
        self.dispatch(Msg::Started { address });
    }

    /// Idempotent. The published result is frozen afterwards.
    pub fn stop(&mut self) {
        self.dispatch(Msg::Stop);
    }

    pub fn is_stopped(&self) -> bool {
        self.scheduler.is_stopped()
    }

    pub fn trigger_manual_detect(&mut self) {
        self.dispatch(Msg::ManualDetect);
    }

    /// A mutation observed at `target` inside document `doc`.
    pub fn on_mutation(&mut self, doc: DocIndex, target: NodeId) {
        if self.watchers.is_disconnected() {
            return;
        }
        let from_panel = self.page.is_inside_id(doc, target, &self.config.panel_id);
        self.dispatch(Msg::Mutation { from_panel });
    }

    /// Re-renders a document and reports the mutation.
    pub fn rerender(&mut self, doc: DocIndex, html: &str) {
        if self.page.replace_html(doc, html) && !self.watchers.is_disconnected() {
            self.dispatch(Msg::Mutation { from_panel: false });
        }
    }

    /// History API navigation or an intercepted programmatic one.
    pub fn on_navigation(&mut self, address: &str) {
        self.page.navigate(address, None);
        self.dispatch(Msg::UrlChanged {
            address: address.to_owned(),
        });
    }

    /// A frame element of `parent` loaded content. Only frames that carry an
    /// armed listener trigger detection.
    pub fn on_frame_content_changed(
        &mut self,
        parent: DocIndex,
        frame: NodeId,
        content: FrameContent,
    ) {
        let armed = self.watchers.fire(&self.page, parent, frame);
        self.page.attach_frame(parent, frame, content);
        if armed {
            self.dispatch(Msg::FrameContentChanged);
        }
    }

    /// Fires every timer that is due on the session clock.
    pub fn tick(&mut self) {
        self.drain();
    }

    pub fn next_deadline_ms(&self) -> Option<u64> {
        self.timers.next_deadline()
    }

    pub fn insert_single(&mut self, text: &str) -> Result<InsertOutcome, InsertError> {
        if self.is_stopped() {
            return Err(InsertError::Stopped);
        }
        let result = Arc::clone(&self.result);
        let outcome = insert::insert_single(&mut self.page, &result, text, &self.config.exclusion);
        match &outcome {
            Ok(InsertOutcome::Inserted) => {
                assist_info!("Inserted reply into {}", describe_target(&result));
                self.notifier.notify(NoticeLevel::Info, "Reply inserted");
            }
            Ok(InsertOutcome::Skipped) => {
                assist_info!("Reply field already has text; nothing inserted");
                self.notifier
                    .notify(NoticeLevel::Warning, "Reply field already has text; nothing inserted");
            }
            Err(err) => {
                assist_warn!("Insert refused: {}", err);
                self.notifier.notify(NoticeLevel::Error, &err.to_string());
            }
        }
        outcome
    }

    pub fn insert_batch(&mut self, messages: &[String]) -> Result<BatchReport, InsertError> {
        if self.is_stopped() {
            return Err(InsertError::Stopped);
        }
        let result = Arc::clone(&self.result);
        if result.row_results.is_empty() {
            self.notifier
                .notify(NoticeLevel::Error, &InsertError::NoTarget.to_string());
            return Err(InsertError::NoTarget);
        }
        let report =
            insert::insert_batch(&mut self.page, &result, messages, &self.config.exclusion);
        assist_info!(
            "Batch insert: inserted={} skipped={} remaining={}",
            report.inserted,
            report.skipped,
            report.remaining
        );
        let level = if report.inserted > 0 {
            NoticeLevel::Info
        } else {
            NoticeLevel::Warning
        };
        self.notifier.notify(
            level,
            &format!(
                "Inserted {}, skipped {}, {} messages left",
                report.inserted, report.skipped, report.remaining
            ),
        );
        Ok(report)
    }

    pub fn diagnostics(&self) -> Diagnostics {
        Diagnostics::collect(&self.page, &self.result, &self.reports, self.scheduler.view())
    }

    pub fn result(&self) -> Arc<DetectionResult> {
        Arc::clone(&self.result)
    }

    pub fn scheduler(&self) -> SchedulerView {
        self.scheduler.view()
    }

    pub fn passes_run(&self) -> u64 {
        self.passes_run
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn page_mut(&mut self) -> &mut Page {
        &mut self.page
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    fn dispatch(&mut self, msg: Msg) {
        self.inbox.push_back(msg);
        self.drain();
    }

    /// Handles queued messages, then due timers, until both are exhausted.
    /// A timer kind fires at most once per drain so zero-delay re-arms wait
    /// for the next tick.
    fn drain(&mut self) {
        let mut fired: HashSet<TimerKind> = HashSet::new();
        loop {
            while let Some(msg) = self.inbox.pop_front() {
                let state = std::mem::take(&mut self.scheduler);
                let (state, effects) = update(state, msg);
                self.scheduler = state;
                for effect in effects {
                    self.execute(effect);
                }
            }
            let now = self.clock.now_ms();
            let Some(kind) = self.pop_due_once(now, &fired) else {
                break;
            };
            fired.insert(kind);
            self.inbox.push_back(Msg::TimerFired(kind));
        }
    }

    fn pop_due_once(&mut self, now: u64, fired: &HashSet<TimerKind>) -> Option<TimerKind> {
        let mut deferred = Vec::new();
        let mut due = None;
        while let Some(kind) = self.timers.pop_due(now) {
            if fired.contains(&kind) {
                deferred.push(kind);
                continue;
            }
            due = Some(kind);
            break;
        }
        for kind in deferred {
            // Re-armed for the same instant; keep it pending.
            self.timers.arm(kind, now, 0);
        }
        due
    }

    fn execute(&mut self, effect: Effect) {
        match effect {
            Effect::RunPass { origin } => {
                if let Some(summary) = self.run_pass(origin) {
                    self.inbox.push_back(Msg::PassCompleted { origin, summary });
                }
            }
            Effect::ArmTimer { timer, delay_ms } => {
                self.timers.arm(timer, self.clock.now_ms(), delay_ms);
            }
            Effect::CancelTimer(timer) => self.timers.cancel(timer),
            Effect::CancelAllTimers => self.timers.clear(),
            Effect::DisconnectWatchers => {
                self.watchers.disconnect();
                assist_info!("Detection stopped; watchers disconnected");
            }
            Effect::VerifyPanel => {
                if !self.panel.is_present() {
                    self.panel.restore();
                    assist_info!("Assist panel was removed from the page; restored");
                    self.notifier.notify(NoticeLevel::Info, "Panel restored");
                }
            }
            Effect::CheckUrl => {
                if let Some(address) = self.page.address() {
                    if self.scheduler.last_address() != Some(address) {
                        self.inbox.push_back(Msg::UrlChanged {
                            address: address.to_owned(),
                        });
                    }
                }
            }
        }
    }

    fn run_pass(&mut self, origin: PassOrigin) -> Option<PassSummary> {
        if self.is_stopped() {
            return None;
        }
        self.passes_run += 1;
        let pass_id = self.passes_run;
        let _scope = enter_pass(pass_id);

        let handles = enumerate_documents(&self.page, self.config.max_frame_depth);
        let armed = self.watchers.watch(&self.page, &handles);
        if armed > 0 {
            assist_debug!("Armed {} frame listeners", armed);
        }
        for handle in handles.iter().filter(|h| !h.reachable) {
            assist_info!("Skipping unreadable {}", handle.label());
        }

        let reports = analyze_all(&self.page, &handles, &self.config);
        let mut result = reconcile(&reports);
        result.timestamp_ms = self.clock.wall_ms();
        result.pass_id = pass_id;

        assist_info!(
            "{:?} pass: mode={:?} scope={} rows={} inputs={} hint={:?}",
            origin,
            result.page_mode,
            result.scope_description,
            result.row_results.len(),
            result.chosen_row_count(),
            result.displayed_count_hint
        );
        if let Some(warning) = &result.mismatch_warning {
            assist_warn!("{}", warning);
        }

        let summary = result.summary();
        self.reports = reports;
        self.result = Arc::new(result);
        self.panel.on_result_changed(&self.result);
        Some(summary)
    }
}

fn describe_target(result: &DetectionResult) -> String {
    result
        .reply_input
        .as_ref()
        .map(|c| c.describe())
        .unwrap_or_default()
}
