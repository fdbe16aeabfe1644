pub mod audit;
pub mod cancel;
pub mod engine;
pub mod error;
pub mod index;
pub mod paths;
pub mod relocate;
pub mod safety;
pub mod size;
pub mod walk;

pub use audit::{AuditLevel, AuditRecord, AuditSink, FileAuditLog, NullAudit, Operation};
pub use cancel::CancellationToken;
pub use engine::workflow::{
    BatchReport, Effect, Event, FailureKind, ItemFailure, ItemOutcome, Phase, Request, Workflow,
    run_to_completion,
};
pub use engine::{
    CacheEngine, CacheStats, EngineConfig, Executor, ExpiryStatus, FileTarget, RestoreMatching,
    TieBreak, WorkerMessage,
};
pub use error::{Result, VanishError};
pub use index::{CacheEntry, Index, IndexStore};
pub use safety::SafetyPolicy;
pub use size::{format_count, format_size};
