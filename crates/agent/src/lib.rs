//! The TaskForge agent — the iterative refinement loop.
//!
//! [`Orchestrator`] drives a run through its phases: take the task, gather
//! context, iterate search → think → evaluate → feedback until the target
//! score is reached or the attempt budget runs out, then always finalize a
//! report. [`Evaluator`] owns scoring and feedback; the progressive scoring
//! policy lives there.

mod evaluator;
mod orchestrator;
mod turns;

pub use evaluator::{Evaluator, RATIONALE_METADATA_KEY};
pub use orchestrator::{Orchestrator, RunOutcome, RunPhase};
pub use turns::TurnProvider;
