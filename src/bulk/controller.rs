use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info, trace, warn};

use crate::browser::document::{Document, ElementHandle, Marker};
use crate::bulk::error::BulkError;
use crate::bulk::queue::QueueEntry;
use crate::bulk::session::{Activity, Mode, SessionState};
use crate::bulk::stats::{ActionTimings, LogStatsReporter, StatsReporter, StatsSnapshot};
use crate::bulk::viewport::ViewportLoader;
use crate::reply::action::{ActionReport, ItemAction};
use crate::reply::error::ActionError;
use crate::settings::SettingsProvider;
use crate::timeline::item::ItemId;
use crate::trace::{logger::TraceLogger, trace::TraceEvent};

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkConfig {
    /// Scheduler period: one item at most per tick.
    #[serde(default = "default_rate_limit_ms")]
    pub rate_limit_ms: u64,

    /// Successful items after which the session stops itself.
    #[serde(default = "default_session_cap")]
    pub session_cap: u32,

    #[serde(default = "default_stats_interval_ms")]
    pub stats_interval_ms: u64,

    /// How long completed/failed markers stay on a post.
    #[serde(default = "default_marker_clear_ms")]
    pub marker_clear_ms: u64,

    /// Viewport loads tried per tick when the queue runs dry.
    #[serde(default = "default_refill_attempts")]
    pub refill_attempts: u32,

    /// Press submit after inserting each reply.
    #[serde(default = "default_true")]
    pub auto_submit: bool,

    /// Actions slower than this are logged as warnings.
    #[serde(default = "default_slow_action_ms")]
    pub slow_action_ms: u64,
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self {
            rate_limit_ms: default_rate_limit_ms(),
            session_cap: default_session_cap(),
            stats_interval_ms: default_stats_interval_ms(),
            marker_clear_ms: default_marker_clear_ms(),
            refill_attempts: default_refill_attempts(),
            auto_submit: default_true(),
            slow_action_ms: default_slow_action_ms(),
        }
    }
}

fn default_rate_limit_ms() -> u64 { 3000 }
fn default_session_cap() -> u32 { 50 }
fn default_stats_interval_ms() -> u64 { 1000 }
fn default_marker_clear_ms() -> u64 { 10_000 }
fn default_refill_attempts() -> u32 { 3 }
fn default_true() -> bool { true }
fn default_slow_action_ms() -> u64 { 30_000 }

// ============================================================================
// Scheduler types
// ============================================================================

/// Work started by a tick, driven to completion by the caller.
pub type PendingWork = Pin<Box<dyn Future<Output = WorkDone> + Send>>;

/// Result of a [`PendingWork`], fed back through [`BulkController::complete`].
pub enum WorkDone {
    Refill {
        attempt: u32,
        grew: bool,
    },
    Item {
        entry: QueueEntry,
        outcome: Result<ActionReport, ActionError>,
        elapsed: Duration,
    },
}

pub enum TickOutcome {
    /// Controller is idle.
    Inactive,
    /// Previous refill or action still in flight.
    Busy,
    /// Cap reached; the session has been stopped.
    CapReached,
    /// Queue empty and no refill attempts configured.
    Exhausted,
    /// Dequeued entry's element left the document.
    Discarded(ItemId),
    Work(PendingWork),
}

impl fmt::Debug for TickOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TickOutcome::Inactive => write!(f, "Inactive"),
            TickOutcome::Busy => write!(f, "Busy"),
            TickOutcome::CapReached => write!(f, "CapReached"),
            TickOutcome::Exhausted => write!(f, "Exhausted"),
            TickOutcome::Discarded(id) => write!(f, "Discarded({})", id),
            TickOutcome::Work(_) => write!(f, "Work(..)"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    User,
    CapReached,
}

/// Messages from the user-facing toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Stop,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub processed: u32,
    pub failed: u32,
    pub handled: usize,
    pub elapsed: Duration,
    pub reason: Option<StopReason>,
}

// ============================================================================
// Controller
// ============================================================================

/// Owns a bulk session: start/stop, the paced scheduler, and its counters.
pub struct BulkController {
    config: BulkConfig,
    document: Arc<dyn Document>,
    action: Arc<dyn ItemAction>,
    settings: Arc<dyn SettingsProvider>,
    loader: Arc<ViewportLoader>,
    reporter: Box<dyn StatsReporter>,
    tracer: TraceLogger,
    session: SessionState,
    identity: Option<String>,
    timings: ActionTimings,
    stop_reason: Option<StopReason>,
    step: u64,
    marker_clears: Vec<JoinHandle<()>>,
}

impl BulkController {
    pub fn new(
        config: BulkConfig,
        document: Arc<dyn Document>,
        action: Arc<dyn ItemAction>,
        settings: Arc<dyn SettingsProvider>,
    ) -> Self {
        let timings = ActionTimings::new(Duration::from_millis(config.slow_action_ms));
        Self {
            config,
            document,
            action,
            settings,
            loader: Arc::new(ViewportLoader::default()),
            reporter: Box::new(LogStatsReporter),
            tracer: TraceLogger::disabled(),
            session: SessionState::default(),
            identity: None,
            timings,
            stop_reason: None,
            step: 0,
            marker_clears: Vec::new(),
        }
    }

    pub fn with_loader(mut self, loader: ViewportLoader) -> Self {
        self.loader = Arc::new(loader);
        self
    }

    pub fn with_reporter(mut self, reporter: Box<dyn StatsReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_tracer(mut self, tracer: TraceLogger) -> Self {
        self.tracer = tracer;
        self
    }

    pub fn config(&self) -> &BulkConfig {
        &self.config
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn mode(&self) -> Mode {
        self.session.mode
    }

    pub fn is_running(&self) -> bool {
        self.session.is_running()
    }

    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stop_reason
    }

    // ---- Lifecycle ----

    /// `Idle -> Running`. Requires both API keys.
    pub fn start(&mut self) -> Result<(), BulkError> {
        if self.is_running() {
            return Err(BulkError::AlreadyRunning);
        }

        let missing = self.settings.credentials().missing();
        if !missing.is_empty() {
            warn!(?missing, "cannot start bulk mode without API keys");
            return Err(BulkError::CredentialMissing { missing });
        }

        self.session = SessionState::begin(Instant::now());
        self.identity = self.document.operating_handle();
        self.timings = ActionTimings::new(Duration::from_millis(self.config.slow_action_ms));
        self.stop_reason = None;
        self.step = 0;

        match &self.identity {
            Some(handle) => info!(handle = %handle, cap = self.config.session_cap, rate_ms = self.config.rate_limit_ms, "bulk mode started"),
            None => info!(cap = self.config.session_cap, rate_ms = self.config.rate_limit_ms, "bulk mode started, operating account unknown"),
        }
        self.trace(TraceEvent::now(self.step, self.session.mode, 0, "start"));
        Ok(())
    }

    /// `Running -> Idle`. Keeps the handled set until the next start.
    pub fn stop(&mut self, reason: StopReason) {
        if !self.is_running() {
            return;
        }

        self.session.mode = Mode::Idle;
        self.session.queue.clear();
        self.document.clear_all_markers(Marker::Processing);
        self.stop_reason = Some(reason);

        info!(?reason, processed = self.session.processed, failed = self.session.failed, "bulk mode stopped");
        self.trace(
            TraceEvent::now(self.step, self.session.mode, self.session.processed, "stop")
                .with_detail(format!("{:?}", reason)),
        );
    }

    /// The single start/stop control.
    pub fn toggle(&mut self) -> Result<Mode, BulkError> {
        if self.is_running() {
            self.stop(StopReason::User);
        } else {
            self.start()?;
        }
        Ok(self.mode())
    }

    // ---- Queue ----

    /// Re-read the page and queue eligible items.
    pub fn populate(&mut self) -> usize {
        self.session
            .populate(self.document.as_ref(), self.identity.as_deref())
    }

    // ---- Scheduler ----

    /// One scheduler tick. At most one piece of work is in flight at a time.
    pub fn tick(&mut self) -> TickOutcome {
        self.step += 1;

        if !self.is_running() {
            return TickOutcome::Inactive;
        }

        if self.session.activity.is_busy() {
            trace!(activity = ?self.session.activity, "tick skipped, previous work in flight");
            return TickOutcome::Busy;
        }

        if self.session.processed >= self.config.session_cap {
            self.stop(StopReason::CapReached);
            return TickOutcome::CapReached;
        }

        let entry = match self.next_entry() {
            Some(entry) => entry,
            None => {
                self.populate();
                match self.next_entry() {
                    Some(entry) => entry,
                    None => return self.begin_refill(1),
                }
            }
        };

        self.dispatch(entry)
    }

    /// Pop the next entry, dropping any whose id was handled after it was queued.
    fn next_entry(&mut self) -> Option<QueueEntry> {
        while let Some(entry) = self.session.queue.pop() {
            if !self.session.handled.contains(&entry.id) {
                return Some(entry);
            }
            debug!(id = %entry.id, "already handled, dropping stale entry");
            self.trace(
                TraceEvent::now(self.step, self.session.mode, self.session.processed, "stale")
                    .with_item(&entry.id),
            );
        }
        None
    }

    fn begin_refill(&mut self, attempt: u32) -> TickOutcome {
        if attempt > self.config.refill_attempts {
            debug!(attempts = attempt - 1, "timeline exhausted for this tick");
            self.trace(TraceEvent::now(self.step, self.session.mode, self.session.processed, "exhausted"));
            return TickOutcome::Exhausted;
        }

        self.session.activity = Activity::Refilling { attempt };
        let loader = Arc::clone(&self.loader);
        let document = Arc::clone(&self.document);

        TickOutcome::Work(Box::pin(async move {
            let grew = loader.ensure_more_items(document.as_ref()).await;
            WorkDone::Refill { attempt, grew }
        }))
    }

    fn dispatch(&mut self, entry: QueueEntry) -> TickOutcome {
        if !self.document.is_attached(&entry.element) {
            debug!(id = %entry.id, "element left the document, dropping entry");
            self.trace(
                TraceEvent::now(self.step, self.session.mode, self.session.processed, "discarded")
                    .with_item(&entry.id),
            );
            return TickOutcome::Discarded(entry.id);
        }

        self.document.set_marker(&entry.element, Marker::Processing);
        self.session.activity = Activity::Processing {
            id: entry.id.clone(),
            since: Instant::now(),
        };
        debug!(id = %entry.id, url = %entry.reference, queued = self.session.queue.len(), "processing item");
        self.trace(
            TraceEvent::now(self.step, self.session.mode, self.session.processed, "dispatched")
                .with_item(&entry.id),
        );

        let action = Arc::clone(&self.action);
        TickOutcome::Work(Box::pin(async move {
            let started = Instant::now();
            let outcome = action.run(&entry.reference, &entry.element).await;
            WorkDone::Item {
                elapsed: started.elapsed(),
                entry,
                outcome,
            }
        }))
    }

    /// Apply finished work. May hand back follow-up work (the next refill
    /// attempt, or the item a refill just made available).
    pub fn complete(&mut self, done: WorkDone) -> Option<PendingWork> {
        // Released first so no outcome can leave the controller blocked
        self.session.activity = Activity::Waiting;

        match done {
            WorkDone::Refill { attempt, grew } => {
                if !self.is_running() {
                    return None;
                }
                trace!(attempt, grew, "refill finished");
                self.populate();

                let next = match self.next_entry() {
                    Some(entry) => self.dispatch(entry),
                    None => self.begin_refill(attempt + 1),
                };
                match next {
                    TickOutcome::Work(work) => Some(work),
                    _ => None,
                }
            }

            WorkDone::Item { entry, outcome, elapsed } => {
                self.finish_item(entry, outcome, elapsed);
                if self.is_running() && self.session.processed >= self.config.session_cap {
                    self.stop(StopReason::CapReached);
                }
                None
            }
        }
    }

    fn finish_item(
        &mut self,
        entry: QueueEntry,
        outcome: Result<ActionReport, ActionError>,
        elapsed: Duration,
    ) {
        // Terminal for this session whatever the outcome
        self.session.handled.insert(entry.id.clone());
        self.document.clear_marker(&entry.element, Marker::Processing);
        self.timings.record(elapsed);

        let event = TraceEvent::now(self.step, self.session.mode, self.session.processed, "");
        let (marker, event) = match outcome {
            Ok(report) => {
                self.session.processed += 1;
                info!(
                    id = %entry.id,
                    processed = self.session.processed,
                    cap = self.config.session_cap,
                    submitted = report.submitted,
                    "item completed"
                );
                (Marker::Completed, TraceEvent { decision: "completed".into(), processed: self.session.processed, ..event })
            }
            Err(e) => {
                self.session.failed += 1;
                warn!(id = %entry.id, url = %entry.reference, class = %e.class(), error = %e, "item failed");
                (
                    Marker::Failed,
                    TraceEvent { decision: "failed".into(), ..event }.with_failure(e.class(), &e),
                )
            }
        };

        self.document.set_marker(&entry.element, marker);
        self.schedule_marker_clear(entry.element, marker);
        self.trace(event.with_item(&entry.id).with_elapsed(elapsed));
    }

    fn schedule_marker_clear(&mut self, element: ElementHandle, marker: Marker) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!("no runtime, leaving marker in place");
            return;
        };
        let document = Arc::clone(&self.document);
        let delay = Duration::from_millis(self.config.marker_clear_ms);
        self.marker_clears.retain(|task| !task.is_finished());
        self.marker_clears.push(runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            document.clear_marker(&element, marker);
        }));
    }

    /// Drop pending marker removals so none outlive the session's document.
    fn cancel_marker_clears(&mut self) {
        let pending = self.marker_clears.len();
        for task in self.marker_clears.drain(..) {
            task.abort();
        }
        if pending > 0 {
            trace!(pending, "cancelled pending marker removals");
        }
    }

    // ---- Stats ----

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            running: self.is_running(),
            processed: self.session.processed,
            failed: self.session.failed,
            handled: self.session.handled.len(),
            queue_length: self.session.queue.len(),
            elapsed: self
                .session
                .started_at
                .map(|t| t.elapsed())
                .unwrap_or_default(),
            cap: self.config.session_cap,
            rate_limit_ms: self.config.rate_limit_ms,
            in_flight: self.session.activity.is_busy(),
            timings: self.timings.summary(),
        }
    }

    pub fn report_stats(&mut self) {
        let snapshot = self.snapshot();
        self.reporter.report(&snapshot);
    }

    pub fn summary(&self) -> SessionSummary {
        let snapshot = self.snapshot();
        SessionSummary {
            processed: snapshot.processed,
            failed: snapshot.failed,
            handled: snapshot.handled,
            elapsed: snapshot.elapsed,
            reason: self.stop_reason,
        }
    }

    fn trace(&self, event: TraceEvent) {
        self.tracer.log(&event);
    }

    // ---- Event loop ----

    /// Start a session and drive it until it stops.
    ///
    /// Two independent timers run while the session is active: the
    /// scheduler tick and the stats tick. `list_changes` (optional) triggers
    /// an extra queue refresh whenever the page's list mutates. A stop lets
    /// the in-flight action finish on its own before returning.
    pub async fn run(
        &mut self,
        mut controls: mpsc::Receiver<Control>,
        mut list_changes: Option<mpsc::Receiver<()>>,
    ) -> Result<SessionSummary, BulkError> {
        self.start()?;

        let period = Duration::from_millis(self.config.rate_limit_ms.max(1));
        let stats_period = Duration::from_millis(self.config.stats_interval_ms.max(1));
        let now = Instant::now();

        let mut schedule = interval_at(now + period, period);
        schedule.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut stats = interval_at(now + stats_period, stats_period);
        stats.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut in_flight: Option<PendingWork> = None;
        let mut controls_open = true;

        while self.is_running() {
            tokio::select! {
                done = drive(&mut in_flight) => {
                    in_flight = self.complete(done);
                }
                _ = schedule.tick() => {
                    if let TickOutcome::Work(work) = self.tick() {
                        in_flight = Some(work);
                    }
                }
                _ = stats.tick() => self.report_stats(),
                control = controls.recv(), if controls_open => match control {
                    Some(Control::Stop) => self.stop(StopReason::User),
                    None => controls_open = false,
                },
                change = next_change(&mut list_changes) => match change {
                    Some(()) => {
                        self.populate();
                    }
                    None => list_changes = None,
                },
            }
        }

        if let Some(work) = in_flight.take() {
            debug!("waiting for in-flight work after stop");
            let done = work.await;
            self.complete(done);
        }

        self.cancel_marker_clears();
        self.report_stats();
        Ok(self.summary())
    }
}

/// Poll the in-flight slot; pending forever when it is empty.
async fn drive(slot: &mut Option<PendingWork>) -> WorkDone {
    match slot {
        Some(work) => work.as_mut().await,
        None => std::future::pending().await,
    }
}

async fn next_change(rx: &mut Option<mpsc::Receiver<()>>) -> Option<()> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
