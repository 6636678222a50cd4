//! The append-only journal for a single run.

use taskforge_core::error::MemoryError;
use taskforge_core::task::Task;
use tracing::debug;

use crate::record::{MemoryRecord, RecordEntry, ScoreRecord};

/// Sentinel returned by [`WorkingMemory::recent_context_summary`] when no
/// search results exist yet.
pub const NO_SEARCH_CONTEXT: &str = "No previous search results.";

/// Sentinel returned by [`WorkingMemory::latest_search_result`] when empty.
pub const NO_SEARCH_RESULTS: &str = "No search results available.";

/// Sentinel returned by [`WorkingMemory::best_approach`] when no approaches
/// have been recorded.
pub const NO_APPROACHES: &str = "No approaches have been generated.";

/// How many recent search results the context summary window holds.
const CONTEXT_WINDOW: usize = 3;

/// Append-only working memory for one task.
///
/// Four independent ordered sequences grow in lock-step during the iteration
/// loop — one entry each per attempt, except feedback, which is skipped on
/// the final permitted attempt. `approaches[i]` and `scores[i]` correspond
/// positionally by convention; the store does not enforce equal lengths, and
/// `best_approach` clamps across the gap.
#[derive(Debug, Default)]
pub struct WorkingMemory {
    task: Option<Task>,
    search_results: Vec<RecordEntry>,
    approaches: Vec<RecordEntry>,
    feedback: Vec<RecordEntry>,
    scores: Vec<ScoreRecord>,
}

impl WorkingMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the active task.
    ///
    /// One instance serves one task: replacing an active task after iteration
    /// records exist is an `InvalidState` error. Re-storing the same
    /// description is allowed (idempotent).
    pub fn store_task(&mut self, task: Task) -> Result<(), MemoryError> {
        if let Some(current) = &self.task {
            let has_records = !self.search_results.is_empty()
                || !self.approaches.is_empty()
                || !self.feedback.is_empty()
                || !self.scores.is_empty();
            if has_records && current.description() != task.description() {
                return Err(MemoryError::InvalidState(format!(
                    "cannot replace active task '{}' mid-run",
                    current.description()
                )));
            }
        }
        self.task = Some(task);
        Ok(())
    }

    /// The active task, if one has been stored.
    pub fn current_task(&self) -> Option<&Task> {
        self.task.as_ref()
    }

    /// Mutable access to the active task (metadata appends only).
    pub fn current_task_mut(&mut self) -> Option<&mut Task> {
        self.task.as_mut()
    }

    /// Append a typed record to its sequence.
    pub fn record(&mut self, record: MemoryRecord) {
        match record {
            MemoryRecord::SearchResult(entry) => {
                debug!(len = entry.content.len(), "Recording search result");
                self.search_results.push(entry);
            }
            MemoryRecord::Approach(entry) => {
                debug!(len = entry.content.len(), "Recording approach");
                self.approaches.push(entry);
            }
            MemoryRecord::Feedback(entry) => {
                debug!(len = entry.content.len(), "Recording feedback");
                self.feedback.push(entry);
            }
        }
    }

    pub fn store_search_result(&mut self, content: &str) {
        self.record(MemoryRecord::SearchResult(RecordEntry::new(content)));
    }

    pub fn store_approach(&mut self, content: &str) {
        self.record(MemoryRecord::Approach(RecordEntry::new(content)));
    }

    pub fn store_feedback(&mut self, content: &str) {
        self.record(MemoryRecord::Feedback(RecordEntry::new(content)));
    }

    /// Append a score, clamped to 0..=10.
    pub fn store_score(&mut self, score: i64) {
        self.scores.push(ScoreRecord::new(score));
    }

    /// The last few search results (oldest first), each with an ordinal
    /// label, or a fixed sentinel when none exist.
    pub fn recent_context_summary(&self) -> String {
        if self.search_results.is_empty() {
            return NO_SEARCH_CONTEXT.to_string();
        }

        let start = self.search_results.len().saturating_sub(CONTEXT_WINDOW);
        self.search_results[start..]
            .iter()
            .enumerate()
            .map(|(i, entry)| format!("Search result {}: {}", i + 1, entry.content))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// The most recent search result's content, or a fixed sentinel.
    pub fn latest_search_result(&self) -> String {
        self.search_results
            .last()
            .map(|entry| entry.content.clone())
            .unwrap_or_else(|| NO_SEARCH_RESULTS.to_string())
    }

    /// The most recent feedback, or `None` if no feedback has been stored.
    /// An empty string is a real (empty) feedback, distinct from absence.
    pub fn last_feedback(&self) -> Option<&str> {
        self.feedback.last().map(|entry| entry.content.as_str())
    }

    /// The approach whose score was strictly greatest.
    ///
    /// No approaches → sentinel. Approaches but no scores → the most recent
    /// approach. Otherwise the index of the strictly-greatest score (ties
    /// keep the earliest), clamped into the approaches range.
    pub fn best_approach(&self) -> String {
        if self.approaches.is_empty() {
            return NO_APPROACHES.to_string();
        }

        if self.scores.is_empty() {
            // Unscored run: the latest approach is the best we have.
            return self.approaches[self.approaches.len() - 1].content.clone();
        }

        let mut highest = 0u8;
        let mut best_index = 0usize;
        for (index, score) in self.scores.iter().enumerate() {
            if score.score > highest {
                highest = score.score;
                best_index = index;
            }
        }

        let clamped = best_index.min(self.approaches.len() - 1);
        self.approaches[clamped].content.clone()
    }

    pub fn all_search_results(&self) -> &[RecordEntry] {
        &self.search_results
    }

    pub fn all_approaches(&self) -> &[RecordEntry] {
        &self.approaches
    }

    pub fn all_feedback(&self) -> &[RecordEntry] {
        &self.feedback
    }

    pub fn all_scores(&self) -> &[ScoreRecord] {
        &self.scores
    }
}
