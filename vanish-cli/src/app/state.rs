use std::path::PathBuf;

use vanish_core::{CancellationToken, Effect, Event, Phase, WorkerMessage, Workflow};

use super::Action;

/// Application state
pub struct AppState {
    workflow: Workflow,
    /// Retention shown in the confirmation dialog
    pub retention_days: u32,
    /// Shared with the worker thread
    cancel: CancellationToken,
    /// Item the worker is busy with
    pub current_path: Option<PathBuf>,
    /// First visible row of the confirmation list
    pub scroll_offset: usize,
    /// Visible rows of the confirmation list (set by UI)
    pub visible_height: usize,
    /// Spinner frame for animation
    pub spinner_frame: usize,
    /// Whether app should quit
    pub should_quit: bool,
}

impl AppState {
    pub fn new(workflow: Workflow, retention_days: u32, cancel: CancellationToken) -> Self {
        Self {
            workflow,
            retention_days,
            cancel,
            current_path: None,
            scroll_offset: 0,
            visible_height: 10,
            spinner_frame: 0,
            should_quit: false,
        }
    }

    pub fn workflow(&self) -> &Workflow {
        &self.workflow
    }

    pub fn into_workflow(self) -> Workflow {
        self.workflow
    }

    pub fn phase(&self) -> Phase {
        self.workflow.phase()
    }

    /// Feed an event into the workflow. Returns the effects for the worker.
    pub fn apply(&mut self, event: Event) -> Vec<Effect> {
        let (next, effects) = self.workflow.clone().transition(event);
        self.workflow = next;

        if effects.contains(&Effect::Exit) {
            self.should_quit = true;
        }
        if !self.workflow.phase().is_processing() {
            self.current_path = None;
        }
        effects
    }

    pub fn handle_worker(&mut self, message: WorkerMessage) -> Vec<Effect> {
        match message {
            WorkerMessage::Started(path) => {
                self.current_path = Some(path);
                Vec::new()
            }
            WorkerMessage::Event(event) => self.apply(event),
        }
    }

    /// The worker hung up. Anything still waiting on it can never finish.
    pub fn worker_lost(&mut self) -> Vec<Effect> {
        if self.phase().is_terminal() {
            return Vec::new();
        }
        tracing::error!(phase = ?self.phase(), "worker thread stopped unexpectedly");
        self.apply(Event::Failed("Worker stopped unexpectedly".to_string()))
    }

    pub fn handle_action(&mut self, action: Action) -> Vec<Effect> {
        match action {
            Action::Confirm => self.apply(Event::Confirm),
            Action::Decline => self.apply(Event::Decline),
            Action::Acknowledge => self.apply(Event::Acknowledge),
            Action::Cancel => self.cancel(),
            Action::ScrollUp => {
                self.scroll_offset = self.scroll_offset.saturating_sub(1);
                Vec::new()
            }
            Action::ScrollDown => {
                let max = self.list_len().saturating_sub(self.visible_height);
                self.scroll_offset = (self.scroll_offset + 1).min(max);
                Vec::new()
            }
            Action::Tick => Vec::new(),
        }
    }

    /// Cancellation depends on the phase: nothing has moved while checking,
    /// so the app quits; a running batch stops after the item in flight;
    /// cleanup, clear and purge always run to the end.
    fn cancel(&mut self) -> Vec<Effect> {
        match self.phase() {
            Phase::Checking => {
                self.cancel.cancel();
                self.should_quit = true;
                Vec::new()
            }
            Phase::Confirming => self.apply(Event::Decline),
            Phase::Moving | Phase::Restoring => {
                self.cancel.cancel();
                self.apply(Event::Cancel)
            }
            _ => Vec::new(),
        }
    }

    fn list_len(&self) -> usize {
        self.workflow.targets().len().max(self.workflow.candidates().len())
    }

    /// Advance spinner animation
    pub fn tick_spinner(&mut self) {
        self.spinner_frame = (self.spinner_frame + 1) % 10;
    }
}
