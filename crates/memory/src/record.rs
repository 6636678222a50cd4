//! Typed journal records.
//!
//! Each record kind is a variant of one sum type — not an untyped map — so
//! accessors stay typed and append-only semantics are explicit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A timestamped text entry, immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordEntry {
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl RecordEntry {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// The tagged union of journal record kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MemoryRecord {
    /// Findings from a `search`-alias model call.
    SearchResult(RecordEntry),

    /// A solution approach from a `thinking`-alias model call.
    Approach(RecordEntry),

    /// Refinement feedback from the evaluator.
    Feedback(RecordEntry),
}

/// An evaluation score, clamped to 0..=10 before storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub score: u8,
    pub timestamp: DateTime<Utc>,
}

impl ScoreRecord {
    /// Create a score record, clamping the raw value into 0..=10.
    pub fn new(score: i64) -> Self {
        Self {
            score: score.clamp(0, 10) as u8,
            timestamp: Utc::now(),
        }
    }
}
