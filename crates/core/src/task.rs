//! The task entity — created once per run, never deleted during it.
//!
//! Mutation is limited to appending/overwriting metadata and marking
//! completion. Metadata preserves first-insertion order so prompts render
//! deterministically.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A scalar or string metadata value attached to a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
}

impl std::fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetadataValue::Text(s) => write!(f, "{s}"),
            MetadataValue::Integer(i) => write!(f, "{i}"),
            MetadataValue::Float(x) => write!(f, "{x}"),
            MetadataValue::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(s: &str) -> Self {
        MetadataValue::Text(s.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(s: String) -> Self {
        MetadataValue::Text(s)
    }
}

impl From<i64> for MetadataValue {
    fn from(i: i64) -> Self {
        MetadataValue::Integer(i)
    }
}

/// A single task driven through the refinement loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    description: String,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    metadata: Vec<(String, MetadataValue)>,
}

impl Task {
    /// Create a new task with the given description.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            created_at: Utc::now(),
            completed_at: None,
            metadata: Vec::new(),
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Mark the task as completed now.
    pub fn mark_completed(&mut self) {
        self.completed_at = Some(Utc::now());
    }

    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Append a metadata entry, overwriting in place if the key exists.
    /// First-insertion order is preserved either way.
    pub fn add_metadata(&mut self, key: impl Into<String>, value: impl Into<MetadataValue>) {
        let key = key.into();
        let value = value.into();
        if let Some(slot) = self.metadata.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.metadata.push((key, value));
        }
    }

    /// Look up a metadata value by key.
    pub fn metadata(&self, key: &str) -> Option<&MetadataValue> {
        self.metadata
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// All metadata entries in insertion order.
    pub fn all_metadata(&self) -> &[(String, MetadataValue)] {
        &self.metadata
    }

    /// Render the task in a prompt-friendly format.
    pub fn to_prompt(&self) -> String {
        let mut prompt = format!("TASK: {}\n", self.description);

        if !self.metadata.is_empty() {
            prompt.push_str("ADDITIONAL INFORMATION:\n");
            for (key, value) in &self.metadata {
                prompt.push_str(&format!("- {key}: {value}\n"));
            }
        }

        prompt
    }
}
