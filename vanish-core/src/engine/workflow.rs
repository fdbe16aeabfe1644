//! One invocation as an explicit state machine.
//!
//! [`Workflow::transition`] is pure: it consumes an [`Event`] and returns the
//! next state plus the [`Effect`]s the caller must run. Effects are run by
//! [`super::Executor`] on a worker thread, or inline by [`run_to_completion`].

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use super::executor::execute;
use super::{CacheEngine, FileTarget};
use crate::VanishError;
use crate::index::CacheEntry;

pub const NO_VALID_TARGETS: &str = "No valid files or directories found";
pub const NO_RESTORE_MATCHES: &str = "No matching items found in cache for restoration";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Delete(Vec<PathBuf>),
    Restore(Vec<String>),
    Clear,
    Purge(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Delete,
    Restore,
    Clear,
    Purge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Checking,
    Confirming,
    Moving,
    Restoring,
    Cleanup,
    Clearing,
    Purging,
    Done,
    Error,
    Cancelled,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Done | Phase::Error | Phase::Cancelled)
    }

    pub fn is_processing(self) -> bool {
        matches!(self, Phase::Moving | Phase::Restoring)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    NotFound,
    Collision,
    Io,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure {
    pub path: PathBuf,
    pub kind: FailureKind,
    pub message: String,
}

impl ItemFailure {
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            message: format!("not found: {}", path.display()),
            path,
            kind: FailureKind::NotFound,
        }
    }

    pub fn from_error(path: &Path, err: &VanishError) -> Self {
        let kind = if err.is_not_found() {
            FailureKind::NotFound
        } else if matches!(err, VanishError::Collision(_)) {
            FailureKind::Collision
        } else {
            FailureKind::Io
        };
        Self {
            path: path.to_path_buf(),
            kind,
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Completed { path: PathBuf, bytes: u64 },
    Failed(ItemFailure),
    /// Not attempted because the batch was cancelled
    Skipped(PathBuf),
}

/// Per-item results of one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub completed: Vec<PathBuf>,
    pub failures: Vec<ItemFailure>,
    pub skipped: Vec<PathBuf>,
    pub bytes_processed: u64,
    /// Entries removed by cleanup or purge
    pub purged: usize,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.completed.len()
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn not_found(&self) -> usize {
        self.failures
            .iter()
            .filter(|f| f.kind == FailureKind::NotFound)
            .count()
    }

    fn record(&mut self, outcome: ItemOutcome) {
        match outcome {
            ItemOutcome::Completed { path, bytes } => {
                self.completed.push(path);
                self.bytes_processed += bytes;
            }
            ItemOutcome::Failed(failure) => self.failures.push(failure),
            ItemOutcome::Skipped(path) => self.skipped.push(path),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkItem {
    Move(FileTarget),
    Restore(CacheEntry),
}

impl WorkItem {
    pub fn path(&self) -> &Path {
        match self {
            WorkItem::Move(t) => &t.path,
            WorkItem::Restore(e) => &e.original_path,
        }
    }

    fn into_effect(self) -> Effect {
        match self {
            WorkItem::Move(t) => Effect::MoveToCache(t),
            WorkItem::Restore(e) => Effect::Restore(e),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Checked(Vec<FileTarget>),
    Matched {
        entries: Vec<CacheEntry>,
        unmatched: Vec<String>,
    },
    Confirm,
    Decline,
    /// Stop after the item in flight
    Cancel,
    ItemFinished(ItemOutcome),
    CleanupFinished {
        purged: usize,
    },
    Cleared,
    Purged {
        count: usize,
    },
    /// A failure that ends the invocation
    Failed(String),
    Acknowledge,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Inspect(Vec<PathBuf>),
    MatchRestore(Vec<String>),
    MoveToCache(FileTarget),
    Restore(CacheEntry),
    CleanupExpired,
    ClearAll,
    Purge(u32),
    Exit,
}

#[derive(Debug, Clone)]
pub struct Workflow {
    kind: RequestKind,
    phase: Phase,
    auto_confirm: bool,
    targets: Vec<FileTarget>,
    candidates: Vec<CacheEntry>,
    queue: VecDeque<WorkItem>,
    current: Option<WorkItem>,
    total: usize,
    cancel_requested: bool,
    report: BatchReport,
    message: Option<String>,
}

impl Workflow {
    /// Enter the first phase for `request`.
    pub fn start(request: Request, auto_confirm: bool) -> (Self, Vec<Effect>) {
        let (kind, phase, effect) = match request {
            Request::Delete(paths) => (RequestKind::Delete, Phase::Checking, Effect::Inspect(paths)),
            Request::Restore(patterns) => (
                RequestKind::Restore,
                Phase::Checking,
                Effect::MatchRestore(patterns),
            ),
            Request::Clear => (RequestKind::Clear, Phase::Clearing, Effect::ClearAll),
            Request::Purge(days) => (RequestKind::Purge, Phase::Purging, Effect::Purge(days)),
        };

        let workflow = Self {
            kind,
            phase,
            auto_confirm,
            targets: Vec::new(),
            candidates: Vec::new(),
            queue: VecDeque::new(),
            current: None,
            total: 0,
            cancel_requested: false,
            report: BatchReport::default(),
            message: None,
        };
        (workflow, vec![effect])
    }

    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn report(&self) -> &BatchReport {
        &self.report
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Existing delete targets, as shown for confirmation.
    pub fn targets(&self) -> &[FileTarget] {
        &self.targets
    }

    /// Selected restore entries, as shown for confirmation.
    pub fn candidates(&self) -> &[CacheEntry] {
        &self.candidates
    }

    pub fn current(&self) -> Option<&WorkItem> {
        self.current.as_ref()
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Items that finished, successfully or not.
    pub fn finished(&self) -> usize {
        self.total - self.queue.len() - usize::from(self.current.is_some())
    }

    pub fn cancel_requested(&self) -> bool {
        self.cancel_requested
    }

    /// Overall progress in `0.0..=1.0`.
    pub fn progress(&self) -> f64 {
        match self.phase {
            Phase::Checking | Phase::Clearing | Phase::Purging => 0.1,
            Phase::Confirming => 0.2,
            Phase::Moving | Phase::Restoring => {
                let done = self.finished() as f64;
                0.3 + 0.4 * done / self.total.max(1) as f64
            }
            Phase::Cleanup => 0.7,
            Phase::Done | Phase::Error | Phase::Cancelled => 1.0,
        }
    }

    pub fn transition(mut self, event: Event) -> (Self, Vec<Effect>) {
        let effects = match (self.phase, event) {
            (Phase::Checking, Event::Checked(targets)) => self.on_checked(targets),
            (Phase::Checking, Event::Matched { entries, unmatched }) => {
                self.on_matched(entries, unmatched)
            }

            (Phase::Confirming, Event::Confirm) => self.begin_processing(),
            (Phase::Confirming, Event::Decline | Event::Cancel) => {
                self.phase = Phase::Cancelled;
                vec![Effect::Exit]
            }

            (Phase::Moving | Phase::Restoring, Event::Cancel) => {
                self.cancel_requested = true;
                Vec::new()
            }
            (Phase::Moving | Phase::Restoring, Event::ItemFinished(outcome)) => {
                self.current = None;
                self.report.record(outcome);
                self.dispatch_next()
            }

            (Phase::Cleanup, Event::CleanupFinished { purged }) => {
                self.report.purged = purged;
                self.phase = Phase::Done;
                Vec::new()
            }
            (Phase::Clearing, Event::Cleared) => {
                self.phase = Phase::Done;
                Vec::new()
            }
            (Phase::Purging, Event::Purged { count }) => {
                self.report.purged = count;
                self.phase = Phase::Done;
                Vec::new()
            }

            (phase, Event::Failed(message)) if !phase.is_terminal() => {
                self.current = None;
                self.message = Some(message);
                self.phase = Phase::Error;
                Vec::new()
            }

            (phase, Event::Acknowledge) if phase.is_terminal() => vec![Effect::Exit],

            (phase, event) => {
                tracing::trace!(?phase, ?event, "event ignored");
                Vec::new()
            }
        };
        (self, effects)
    }

    fn on_checked(&mut self, targets: Vec<FileTarget>) -> Vec<Effect> {
        let (valid, missing): (Vec<_>, Vec<_>) = targets.into_iter().partition(|t| t.exists);
        for target in missing {
            self.report.record(ItemOutcome::Failed(ItemFailure::not_found(target.path)));
        }

        if valid.is_empty() {
            return self.fail(NO_VALID_TARGETS);
        }

        let needs_confirm = valid.iter().any(FileTarget::needs_confirm);
        self.queue = valid.iter().cloned().map(WorkItem::Move).collect();
        self.total = self.queue.len();
        self.targets = valid;

        if self.auto_confirm && !needs_confirm {
            self.begin_processing()
        } else {
            self.phase = Phase::Confirming;
            Vec::new()
        }
    }

    fn on_matched(&mut self, entries: Vec<CacheEntry>, unmatched: Vec<String>) -> Vec<Effect> {
        for pattern in unmatched {
            self.report.record(ItemOutcome::Failed(ItemFailure::not_found(pattern)));
        }

        if entries.is_empty() {
            return self.fail(NO_RESTORE_MATCHES);
        }

        self.queue = entries.iter().cloned().map(WorkItem::Restore).collect();
        self.total = self.queue.len();
        self.candidates = entries;

        if self.auto_confirm {
            self.begin_processing()
        } else {
            self.phase = Phase::Confirming;
            Vec::new()
        }
    }

    fn begin_processing(&mut self) -> Vec<Effect> {
        self.phase = match self.kind {
            RequestKind::Restore => Phase::Restoring,
            _ => Phase::Moving,
        };
        self.dispatch_next()
    }

    fn dispatch_next(&mut self) -> Vec<Effect> {
        if self.cancel_requested {
            for item in self.queue.drain(..) {
                self.report.skipped.push(item.path().to_path_buf());
            }
            self.phase = Phase::Cancelled;
            return Vec::new();
        }

        if let Some(item) = self.queue.pop_front() {
            self.current = Some(item.clone());
            return vec![item.into_effect()];
        }

        if self.kind == RequestKind::Delete && self.report.succeeded() > 0 {
            self.phase = Phase::Cleanup;
            vec![Effect::CleanupExpired]
        } else {
            self.phase = Phase::Done;
            Vec::new()
        }
    }

    fn fail(&mut self, message: &str) -> Vec<Effect> {
        self.message = Some(message.to_string());
        self.phase = Phase::Error;
        Vec::new()
    }
}

/// Drive a request to a terminal phase on the calling thread.
///
/// `confirm` is asked once when the batch needs confirmation; returning
/// `false` cancels it before anything moves.
pub fn run_to_completion(
    engine: &CacheEngine,
    request: Request,
    mut confirm: impl FnMut(&Workflow) -> bool,
) -> Workflow {
    let (mut workflow, effects) = Workflow::start(request, engine.config().auto_confirm);
    let mut pending: VecDeque<Effect> = effects.into();

    loop {
        while let Some(effect) = pending.pop_front() {
            if let Some(event) = execute(engine, effect) {
                let (next, more) = workflow.transition(event);
                workflow = next;
                pending.extend(more);
            }
        }

        if workflow.phase() != Phase::Confirming {
            return workflow;
        }
        let answer = if confirm(&workflow) {
            Event::Confirm
        } else {
            Event::Decline
        };
        let (next, more) = workflow.transition(answer);
        workflow = next;
        pending.extend(more);
    }
}
