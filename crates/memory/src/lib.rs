//! Working memory — a process-scoped, single-task, append-only journal.
//!
//! One `WorkingMemory` belongs to exactly one run: records are appended by
//! the orchestrator and evaluator and never mutated or removed until the
//! process exits. There is no cross-run persistence.

mod journal;
mod record;

pub use journal::{WorkingMemory, NO_APPROACHES, NO_SEARCH_CONTEXT, NO_SEARCH_RESULTS};
pub use record::{MemoryRecord, RecordEntry, ScoreRecord};
