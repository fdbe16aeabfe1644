use std::path::Path;
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};

use super::CacheEngine;
use super::workflow::{Effect, Event, ItemFailure, ItemOutcome};
use crate::{CancellationToken, Result};

/// Message from the worker thread
#[derive(Debug, Clone)]
pub enum WorkerMessage {
    /// Started working on an item
    Started(std::path::PathBuf),
    /// Result of one effect, to feed back into the workflow
    Event(Event),
}

/// Runs workflow effects off the UI thread, one at a time, in order.
pub struct Executor {
    engine: Arc<CacheEngine>,
    cancel: CancellationToken,
}

impl Executor {
    pub fn new(engine: Arc<CacheEngine>) -> Self {
        Self {
            engine,
            cancel: CancellationToken::new(),
        }
    }

    /// Set cancellation token
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Start the worker. It exits when the effect sender is dropped.
    pub fn spawn(self) -> (Sender<Effect>, Receiver<WorkerMessage>, JoinHandle<()>) {
        let (effect_tx, effect_rx) = crossbeam_channel::unbounded::<Effect>();
        let (msg_tx, msg_rx) = crossbeam_channel::unbounded();

        let handle = std::thread::spawn(move || self.run(effect_rx, msg_tx));
        (effect_tx, msg_rx, handle)
    }

    fn run(self, effects: Receiver<Effect>, tx: Sender<WorkerMessage>) {
        for effect in effects {
            let event = match effect {
                Effect::MoveToCache(ref t) if self.cancel.is_cancelled() => {
                    Some(Event::ItemFinished(ItemOutcome::Skipped(t.path.clone())))
                }
                Effect::Restore(ref e) if self.cancel.is_cancelled() => Some(Event::ItemFinished(
                    ItemOutcome::Skipped(e.original_path.clone()),
                )),
                Effect::Exit => break,
                effect => {
                    match &effect {
                        Effect::MoveToCache(t) => {
                            let _ = tx.send(WorkerMessage::Started(t.path.clone()));
                        }
                        Effect::Restore(e) => {
                            let _ = tx.send(WorkerMessage::Started(e.original_path.clone()));
                        }
                        _ => {}
                    }
                    execute(&self.engine, effect)
                }
            };

            if let Some(event) = event
                && tx.send(WorkerMessage::Event(event)).is_err()
            {
                break;
            }
        }
        tracing::debug!("worker finished");
    }
}

/// Run one effect against the engine and describe its outcome as an event.
pub(crate) fn execute(engine: &CacheEngine, effect: Effect) -> Option<Event> {
    let event = match effect {
        Effect::Inspect(paths) => Event::Checked(engine.inspect_targets(&paths)),
        Effect::MatchRestore(patterns) => match engine.match_restore(&patterns) {
            Ok((entries, unmatched)) => Event::Matched { entries, unmatched },
            Err(err) => Event::Failed(format!("Error reading cache index: {err}")),
        },
        Effect::MoveToCache(target) => {
            item_event(&target.path, engine.move_to_cache(&target).map(|e| e.size_bytes))
        }
        Effect::Restore(entry) => item_event(
            &entry.original_path,
            engine.restore(&entry).map(|()| entry.size_bytes),
        ),
        Effect::CleanupExpired => match engine.cleanup_expired() {
            Ok(purged) => Event::CleanupFinished { purged },
            Err(err) => Event::Failed(format!("Error during cleanup: {err}")),
        },
        Effect::ClearAll => match engine.clear_all() {
            Ok(()) => Event::Cleared,
            Err(err) => Event::Failed(format!("Error clearing cache: {err}")),
        },
        Effect::Purge(days) => match engine.purge(days) {
            Ok(count) => Event::Purged { count },
            Err(err) => Event::Failed(format!("Error purging cache: {err}")),
        },
        Effect::Exit => return None,
    };
    Some(event)
}

fn item_event(path: &Path, result: Result<u64>) -> Event {
    match result {
        Ok(bytes) => Event::ItemFinished(ItemOutcome::Completed {
            path: path.to_path_buf(),
            bytes,
        }),
        // The ledger itself failed: stop the batch
        Err(err) if err.is_fatal() => Event::Failed(format!("Error processing item: {err}")),
        Err(err) => Event::ItemFinished(ItemOutcome::Failed(ItemFailure::from_error(path, &err))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::NullAudit;
    use crate::engine::EngineConfig;
    use crate::engine::workflow::{Phase, Request, Workflow};
    use std::fs;
    use tempfile::TempDir;

    fn engine(temp: &TempDir) -> Arc<CacheEngine> {
        let mut config = EngineConfig::new(temp.path().join("cache"));
        config.auto_confirm = true;
        Arc::new(CacheEngine::new(config, NullAudit))
    }

    /// Feed worker events into the workflow until it is terminal.
    fn drive(
        mut wf: Workflow,
        effects: Vec<Effect>,
        tx: &Sender<Effect>,
        rx: &Receiver<WorkerMessage>,
    ) -> (Workflow, Vec<std::path::PathBuf>) {
        let mut started = Vec::new();
        for effect in effects {
            tx.send(effect).unwrap();
        }
        while !wf.phase().is_terminal() {
            match rx.recv().unwrap() {
                WorkerMessage::Started(path) => started.push(path),
                WorkerMessage::Event(event) => {
                    let (next, effects) = wf.transition(event);
                    wf = next;
                    for effect in effects {
                        tx.send(effect).unwrap();
                    }
                }
            }
        }
        (wf, started)
    }

    #[test]
    fn test_worker_runs_delete_batch() {
        let temp = TempDir::new().unwrap();
        let a = temp.path().join("a.txt");
        let b = temp.path().join("b.txt");
        fs::write(&a, "aaa").unwrap();
        fs::write(&b, "bb").unwrap();

        let engine = engine(&temp);
        let (tx, rx, handle) = Executor::new(Arc::clone(&engine)).spawn();
        let (wf, effects) = Workflow::start(Request::Delete(vec![a.clone(), b.clone()]), true);

        let (wf, started) = drive(wf, effects, &tx, &rx);
        assert_eq!(wf.phase(), Phase::Done);
        assert_eq!(started, vec![a.clone(), b.clone()]);
        assert_eq!(wf.report().bytes_processed, 5);
        assert!(!a.exists() && !b.exists());
        assert_eq!(engine.list().unwrap().len(), 2);

        drop(tx);
        handle.join().unwrap();
    }

    #[test]
    fn test_cancelled_token_skips_items() {
        let temp = TempDir::new().unwrap();
        let a = temp.path().join("a.txt");
        fs::write(&a, "aaa").unwrap();

        let token = CancellationToken::new();
        token.cancel();
        let (tx, rx, handle) = Executor::new(engine(&temp))
            .with_cancellation(token)
            .spawn();
        let (wf, effects) = Workflow::start(Request::Delete(vec![a.clone()]), true);

        let (wf, _) = drive(wf, effects, &tx, &rx);
        assert_eq!(wf.phase(), Phase::Done);
        assert_eq!(wf.report().skipped, vec![a.clone()]);
        assert!(a.exists());

        drop(tx);
        handle.join().unwrap();
    }

    #[test]
    fn test_exit_stops_worker() {
        let temp = TempDir::new().unwrap();
        let (tx, _rx, handle) = Executor::new(engine(&temp)).spawn();
        tx.send(Effect::Exit).unwrap();
        handle.join().unwrap();
    }
}
