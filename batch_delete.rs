// Run with: cargo run --example batch_delete -- /tmp/vx-cache file1 dir2 ...
// Drives the worker thread the same way the TUI does and prints timings.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use vanish_core::{
    CacheEngine, EngineConfig, Event, Executor, ItemOutcome, NullAudit, Request, WorkerMessage,
    Workflow, format_size,
};

fn main() {
    let mut args = std::env::args().skip(1);
    let Some(cache_dir) = args.next().map(PathBuf::from) else {
        eprintln!("usage: batch_delete <cache-dir> <path>...");
        std::process::exit(2);
    };
    let paths: Vec<PathBuf> = args.map(PathBuf::from).collect();

    let mut config = EngineConfig::new(&cache_dir);
    config.auto_confirm = true;
    let engine = Arc::new(CacheEngine::new(config, NullAudit));

    let (tx, rx, handle) = Executor::new(engine).spawn();
    let (mut workflow, effects) = Workflow::start(Request::Delete(paths), true);
    for effect in effects {
        let _ = tx.send(effect);
    }

    let start = Instant::now();
    let mut item_start = Instant::now();

    for message in &rx {
        let event = match message {
            WorkerMessage::Started(path) => {
                item_start = Instant::now();
                println!("[{:>6.2}s] moving {}", start.elapsed().as_secs_f64(), path.display());
                continue;
            }
            WorkerMessage::Event(event) => event,
        };

        if let Event::ItemFinished(outcome) = &event {
            match outcome {
                ItemOutcome::Completed { bytes, .. } => println!(
                    "          done in {:.3}s ({})",
                    item_start.elapsed().as_secs_f64(),
                    format_size(*bytes)
                ),
                ItemOutcome::Failed(failure) => println!("          failed: {}", failure.message),
                ItemOutcome::Skipped(path) => println!("          skipped {}", path.display()),
            }
        }

        let (next, effects) = workflow.transition(event);
        workflow = next;
        for effect in effects {
            let _ = tx.send(effect);
        }

        // Needs a human answer; this demo only runs unprompted batches
        if workflow.phase() == vanish_core::Phase::Confirming {
            println!("batch needs confirmation (protected, large or sensitive items), stopping");
            break;
        }
        if workflow.phase().is_terminal() {
            break;
        }
    }

    drop(tx);
    let _ = handle.join();

    let report = workflow.report();
    println!(
        "\n{:?} after {:.2}s: {} moved, {} failed, {} total, {} expired entries removed",
        workflow.phase(),
        start.elapsed().as_secs_f64(),
        report.succeeded(),
        report.failed(),
        format_size(report.bytes_processed),
        report.purged
    );
    if let Some(message) = workflow.message() {
        println!("{message}");
    }
}
