//! Completion scoring and refinement feedback.
//!
//! The evaluator asks a model to grade the latest approach on a 0..=10 scale,
//! then applies the progressive scoring policy before the score is stored:
//! early attempts are capped so the loop cannot declare victory on its first
//! pass, and no attempt may jump more than three points past the previous
//! score.

use std::sync::Arc;

use serde::Deserialize;
use taskforge_core::error::Error;
use taskforge_core::message::Message;
use taskforge_core::task::Task;
use taskforge_gateway::{ModelGateway, ResponseFormat, SendOptions};
use taskforge_memory::{ScoreRecord, WorkingMemory};
use tracing::{debug, warn};

/// Task metadata key under which the latest evaluation rationale is kept.
pub const RATIONALE_METADATA_KEY: &str = "evaluation_rationale";

/// Returned (but never stored) when the verdict cannot be parsed.
const NEUTRAL_SCORE: u8 = 5;

/// Cap while fewer than three attempts have been scored.
const EARLY_ATTEMPT_CAP: u8 = 6;

/// Cap on the third scored attempt.
const THIRD_ATTEMPT_CAP: u8 = 8;

/// Maximum per-attempt improvement over the previous score.
const MAX_SCORE_JUMP: u8 = 3;

const EVALUATOR_INSTRUCTIONS: &str =
    "You are a strict evaluator. Grade how completely the latest approach \
     solves the task on a 0-10 scale. Respond with ONLY a JSON object of the \
     form {\"score\": <integer 0-10>, \"rationale\": \"<one or two sentences>\"}.";

/// The model's verdict as it appears on the wire.
#[derive(Debug, Deserialize)]
struct Verdict {
    score: Option<f64>,
    rationale: Option<String>,
}

/// Scores approaches and generates refinement feedback.
pub struct Evaluator {
    gateway: Arc<ModelGateway>,
    model: String,
    target_score: u8,
}

impl Evaluator {
    pub fn new(gateway: Arc<ModelGateway>, model: impl Into<String>, target_score: u8) -> Self {
        Self {
            gateway,
            model: model.into(),
            target_score,
        }
    }

    /// Grade the latest approach and record the (possibly capped) score.
    ///
    /// An unparseable verdict returns a neutral score without recording
    /// anything, so a single malformed reply cannot poison the score history.
    pub async fn evaluate_task_completion(
        &self,
        task: &mut Task,
        memory: &mut WorkingMemory,
    ) -> Result<u8, Error> {
        let prompt = evaluation_prompt(task, memory);

        let reply = self
            .gateway
            .send(
                &self.model,
                vec![Message::user(prompt)],
                SendOptions {
                    instructions: Some(EVALUATOR_INSTRUCTIONS.into()),
                    response_format: ResponseFormat::Json,
                    ..SendOptions::default()
                },
            )
            .await?;

        let text = reply.text();
        let verdict: Verdict = match serde_json::from_str(&text) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "Unparseable evaluation verdict, using neutral score");
                return Ok(NEUTRAL_SCORE);
            }
        };

        let Some(raw) = verdict.score else {
            warn!("Evaluation verdict carried no score, using neutral score");
            return Ok(NEUTRAL_SCORE);
        };

        let clamped = raw.round().clamp(0.0, 10.0) as u8;
        let capped = progressive_cap(clamped, memory.all_scores());
        if capped < clamped {
            debug!(raw = clamped, capped, "Progressive policy capped the score");
        }

        memory.store_score(i64::from(capped));
        if let Some(rationale) = verdict.rationale {
            task.add_metadata(RATIONALE_METADATA_KEY, rationale.as_str());
        }

        Ok(capped)
    }

    /// Ask the model for concrete refinement feedback on the latest approach.
    pub async fn generate_feedback(
        &self,
        task: &Task,
        memory: &WorkingMemory,
    ) -> Result<String, Error> {
        let prompt = feedback_prompt(task, memory, self.target_score);

        let reply = self
            .gateway
            .send(&self.model, vec![Message::user(prompt)], SendOptions::default())
            .await?;

        Ok(reply.text())
    }
}

/// Apply the progressive scoring policy against the scores recorded so far.
///
/// The slice must NOT include the score being capped. Caps stack: the
/// smallest applicable bound wins.
pub fn progressive_cap(raw: u8, prior: &[ScoreRecord]) -> u8 {
    let mut capped = raw;
    let attempts = prior.len();

    if attempts >= 1 && attempts < 3 {
        capped = capped.min(EARLY_ATTEMPT_CAP);
    } else if attempts == 3 {
        capped = capped.min(THIRD_ATTEMPT_CAP);
    }

    if let Some(last) = prior.last() {
        capped = capped.min(last.score.saturating_add(MAX_SCORE_JUMP));
    }

    capped
}

fn evaluation_prompt(task: &Task, memory: &WorkingMemory) -> String {
    let latest_approach = memory
        .all_approaches()
        .last()
        .map(|entry| entry.content.as_str())
        .unwrap_or("No approach yet.");

    let score_history = if memory.all_scores().is_empty() {
        "none".to_string()
    } else {
        memory
            .all_scores()
            .iter()
            .map(|s| s.score.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    };

    format!(
        "{}\nLATEST APPROACH:\n{}\n\nGATHERED CONTEXT:\n{}\n\n\
         Previous scores: {}\nPrevious feedback: {}\n\n\
         Grade how completely the latest approach solves the task.",
        task.to_prompt(),
        latest_approach,
        memory.recent_context_summary(),
        score_history,
        memory.last_feedback().unwrap_or("None"),
    )
}

fn feedback_prompt(task: &Task, memory: &WorkingMemory, target_score: u8) -> String {
    let latest_approach = memory
        .all_approaches()
        .last()
        .map(|entry| entry.content.as_str())
        .unwrap_or("No approach yet.");

    let current_score = memory.all_scores().last().map(|s| s.score).unwrap_or(0);

    let rationale = task
        .metadata(RATIONALE_METADATA_KEY)
        .map(|v| v.to_string())
        .unwrap_or_else(|| "None".to_string());

    format!(
        "{}\nCURRENT APPROACH (attempt {}):\n{}\n\n\
         This approach scored {}/{} against a target of {}.\n\
         Evaluator rationale: {}\n\n\
         Give specific, actionable feedback on what to change or add so the \
         next approach scores higher. Be concrete; do not restate the approach.",
        task.to_prompt(),
        memory.all_scores().len(),
        latest_approach,
        current_score,
        10,
        target_score,
        rationale,
    )
}
