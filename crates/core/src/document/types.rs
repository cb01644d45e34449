//! Document model.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::task::{TaskMap, TaskState, UpdateOutcome};

use super::ArtifactFields;

/// Persisted record of one artifact: descriptive fields plus task state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Source URL. Never changes once the document exists.
    pub url: String,

    #[serde(flatten)]
    pub fields: ArtifactFields,

    #[serde(alias = "default_tasks")]
    pub tasks: TaskMap,

    /// Failed attempts of still-pending tasks.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub task_failures: IndexMap<String, TaskFailure>,
}

/// Bookkeeping for a pending task whose worker failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskFailure {
    pub attempts: u32,
    pub last_error: String,
    pub last_attempt_at: DateTime<Utc>,
}

impl Document {
    pub fn new(url: impl Into<String>, fields: ArtifactFields, tasks: TaskMap) -> Self {
        Self {
            url: url.into(),
            fields,
            tasks,
            task_failures: IndexMap::new(),
        }
    }

    pub fn task(&self, name: &str) -> TaskState {
        self.tasks.get(name)
    }

    /// Apply `Pending -> Completed(output_path)`. Clears failure bookkeeping
    /// when applied.
    pub fn complete_task(&mut self, task: &str, output_path: &str) -> UpdateOutcome {
        let outcome = self.tasks.complete(task, output_path);
        if outcome.is_applied() {
            self.task_failures.shift_remove(task);
        }
        outcome
    }

    /// Count a failed attempt. Only pending tasks are tracked.
    pub fn record_failure(&mut self, task: &str, error: &str, at: DateTime<Utc>) -> bool {
        if !self.tasks.get(task).is_pending() {
            return false;
        }
        let entry = self
            .task_failures
            .entry(task.to_string())
            .or_insert_with(|| TaskFailure {
                attempts: 0,
                last_error: String::new(),
                last_attempt_at: at,
            });
        entry.attempts += 1;
        entry.last_error = error.to_string();
        entry.last_attempt_at = at;
        true
    }

    /// The download task's recorded artifact, if it completed.
    pub fn download_path(&self, download_task: &str) -> Option<&str> {
        self.tasks.output_path(download_task)
    }

    /// Short summary printed by the CLI: title, date, uploader, url, tasks.
    pub fn summary(&self) -> serde_json::Value {
        serde_json::json!({
            "video_title": self.fields.video_title,
            "video_date": self.fields.video_date,
            "uploader": self.fields.uploader,
            "url": self.url,
            "tasks": self.tasks,
        })
    }
}
