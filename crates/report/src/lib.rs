//! Report assembly — turns accumulated working memory into a final document.
//!
//! The assembler aggregates findings, approaches, and feedback into one
//! synthesis prompt, asks the model for the final markdown, and hands the
//! result to a [`DocumentRenderer`] collaborator. Naming is idempotent:
//! repeated runs for the same task description produce the same filename.

mod render;

pub use render::{DocumentRenderer, MarkdownFileRenderer};

use std::path::PathBuf;
use std::sync::Arc;

use sha2::{Digest, Sha256};
use taskforge_core::error::Error;
use taskforge_core::message::Message;
use taskforge_core::task::Task;
use taskforge_gateway::{ModelGateway, SendOptions};
use taskforge_memory::WorkingMemory;
use tracing::info;

/// How many of the most recent approaches the synthesis prompt includes.
const APPROACH_WINDOW: usize = 3;

/// Maximum characters of the description used for the report title.
const TITLE_MAX_CHARS: usize = 60;

/// System instruction framing the synthesis call.
const REPORT_WRITER_INSTRUCTIONS: &str =
    "You are a professional report writer. Produce a clear, well-structured \
     markdown report that fully addresses the task, synthesizing all provided \
     findings, approaches, and feedback.";

/// The finalized report.
#[derive(Debug, Clone)]
pub struct ReportArtifact {
    pub title: String,
    pub markdown: String,
    pub path: PathBuf,
}

/// Builds the synthesis prompt, invokes the model, and renders the document.
pub struct ReportAssembler {
    gateway: Arc<ModelGateway>,
    model: String,
    renderer: Arc<dyn DocumentRenderer>,
}

impl ReportAssembler {
    pub fn new(
        gateway: Arc<ModelGateway>,
        model: impl Into<String>,
        renderer: Arc<dyn DocumentRenderer>,
    ) -> Self {
        Self {
            gateway,
            model: model.into(),
            renderer,
        }
    }

    /// Synthesize the final report and render it to a document.
    pub async fn finalize(
        &self,
        task: &Task,
        memory: &WorkingMemory,
    ) -> Result<ReportArtifact, Error> {
        let prompt = build_synthesis_prompt(task, memory);

        let reply = self
            .gateway
            .send(
                &self.model,
                vec![Message::user(prompt)],
                SendOptions {
                    instructions: Some(REPORT_WRITER_INSTRUCTIONS.into()),
                    ..SendOptions::default()
                },
            )
            .await?;

        let markdown = reply.text();
        let title = report_title(task.description());
        let filename = report_filename(task.description());

        let path = self.renderer.render(&markdown, &title, &filename)?;
        info!(path = %path.display(), "Report rendered");

        Ok(ReportArtifact {
            title,
            markdown,
            path,
        })
    }
}

/// Aggregate the run's memory into one synthesis prompt.
fn build_synthesis_prompt(task: &Task, memory: &WorkingMemory) -> String {
    let mut prompt = String::new();

    prompt.push_str(&task.to_prompt());
    prompt.push_str("\nGATHERED CONTEXT:\n");
    prompt.push_str(&memory.recent_context_summary());
    prompt.push('\n');

    let approaches = memory.all_approaches();
    if !approaches.is_empty() {
        prompt.push_str("\nSOLUTION APPROACHES (most recent last):\n");
        let start = approaches.len().saturating_sub(APPROACH_WINDOW);
        for (i, entry) in approaches[start..].iter().enumerate() {
            prompt.push_str(&format!("Approach {}: {}\n\n", i + 1, entry.content));
        }
    }

    let feedback = memory.all_feedback();
    if !feedback.is_empty() {
        prompt.push_str("\nREFINEMENT FEEDBACK RECEIVED:\n");
        for (i, entry) in feedback.iter().enumerate() {
            prompt.push_str(&format!("Feedback {}: {}\n\n", i + 1, entry.content));
        }
    }

    prompt.push_str(
        "\nWrite the final, comprehensive report for the task using all of the above.",
    );
    prompt
}

/// Derive a display title from the task description.
pub fn report_title(description: &str) -> String {
    let trimmed = description.trim();
    if trimmed.chars().count() <= TITLE_MAX_CHARS {
        return trimmed.to_string();
    }
    let truncated: String = trimmed.chars().take(TITLE_MAX_CHARS).collect();
    format!("{}...", truncated.trim_end())
}

/// Derive a stable, filesystem-safe filename from the task description.
///
/// The hash makes repeated runs for the same task idempotent in naming.
pub fn report_filename(description: &str) -> String {
    let digest = Sha256::digest(description.as_bytes());
    let hex: String = digest
        .iter()
        .take(8)
        .map(|b| format!("{b:02x}"))
        .collect();
    format!("report_{hex}")
}
