//! Task state machine.
//!
//! On disk a task entry is `false` (skipped), `true` (pending) or a string
//! (completed, holding the produced artifact path). A task missing from the
//! map is unconfigured for that document.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// State of one task for one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskState {
    /// Key absent from the document.
    Unconfigured,
    /// Explicitly disabled. Terminal.
    Skipped,
    /// Eligible to run.
    Pending,
    /// Ran and produced this artifact path. Terminal.
    Completed(String),
}

impl TaskState {
    pub fn is_pending(&self) -> bool {
        matches!(self, TaskState::Pending)
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, TaskState::Completed(_))
    }

    /// The produced artifact path, if completed.
    pub fn output_path(&self) -> Option<&str> {
        match self {
            TaskState::Completed(path) => Some(path),
            _ => None,
        }
    }

    /// Decide whether `Completed(output_path)` may replace this state.
    pub fn check_completion(&self, output_path: &str) -> UpdateOutcome {
        if output_path.trim().is_empty() {
            return UpdateOutcome::EmptyOutput;
        }
        match self {
            TaskState::Pending => UpdateOutcome::Applied,
            TaskState::Unconfigured => UpdateOutcome::Unconfigured,
            TaskState::Skipped => UpdateOutcome::Skipped,
            TaskState::Completed(existing) => UpdateOutcome::AlreadyCompleted(existing.clone()),
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskState::Unconfigured => write!(f, "unconfigured"),
            TaskState::Skipped => write!(f, "skipped"),
            TaskState::Pending => write!(f, "pending"),
            TaskState::Completed(path) => write!(f, "completed ({})", path),
        }
    }
}

/// Result of asking for a `Pending -> Completed` transition.
///
/// Everything but `Applied` leaves the task untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    Applied,
    /// Task key absent from the document.
    Unconfigured,
    Skipped,
    /// Already completed; holds the recorded path.
    AlreadyCompleted(String),
    /// Caller supplied an empty output path.
    EmptyOutput,
}

impl UpdateOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, UpdateOutcome::Applied)
    }
}

impl fmt::Display for UpdateOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateOutcome::Applied => write!(f, "applied"),
            UpdateOutcome::Unconfigured => write!(f, "task not configured for document"),
            UpdateOutcome::Skipped => write!(f, "task is skipped"),
            UpdateOutcome::AlreadyCompleted(path) => write!(f, "already completed ({})", path),
            UpdateOutcome::EmptyOutput => write!(f, "empty output path"),
        }
    }
}

/// Ordered task name -> state mapping of a document.
///
/// Never stores `Unconfigured`; looking up a missing name yields it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskMap(IndexMap<String, TaskState>);

impl TaskMap {
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    pub fn get(&self, task: &str) -> TaskState {
        self.0.get(task).cloned().unwrap_or(TaskState::Unconfigured)
    }

    /// Recorded artifact of a completed task.
    pub fn output_path(&self, task: &str) -> Option<&str> {
        self.0.get(task).and_then(TaskState::output_path)
    }

    pub fn contains(&self, task: &str) -> bool {
        self.0.contains_key(task)
    }

    /// Seed a task if it has no entry yet. Existing entries are kept.
    pub fn seed(&mut self, task: &str, enabled: bool) {
        if !self.0.contains_key(task) {
            let state = if enabled {
                TaskState::Pending
            } else {
                TaskState::Skipped
            };
            self.0.insert(task.to_string(), state);
        }
    }

    /// Apply `Pending -> Completed(output_path)` if legal.
    pub fn complete(&mut self, task: &str, output_path: &str) -> UpdateOutcome {
        let outcome = self.get(task).check_completion(output_path);
        if outcome.is_applied() {
            self.0
                .insert(task.to_string(), TaskState::Completed(output_path.to_string()));
        }
        outcome
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TaskState)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, TaskState)> for TaskMap {
    fn from_iter<I: IntoIterator<Item = (String, TaskState)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .filter(|(_, state)| *state != TaskState::Unconfigured)
                .collect(),
        )
    }
}

/// Wire form of a single entry.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum StoredState {
    Flag(bool),
    Output(String),
}

impl Serialize for TaskMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let stored: IndexMap<&str, StoredState> = self
            .0
            .iter()
            .filter_map(|(name, state)| {
                let value = match state {
                    TaskState::Unconfigured => return None,
                    TaskState::Skipped => StoredState::Flag(false),
                    TaskState::Pending => StoredState::Flag(true),
                    TaskState::Completed(path) => StoredState::Output(path.clone()),
                };
                Some((name.as_str(), value))
            })
            .collect();
        stored.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TaskMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let stored = IndexMap::<String, StoredState>::deserialize(deserializer)?;
        Ok(Self(
            stored
                .into_iter()
                .map(|(name, value)| {
                    let state = match value {
                        StoredState::Flag(false) => TaskState::Skipped,
                        StoredState::Flag(true) => TaskState::Pending,
                        // An empty path was never a real completion.
                        StoredState::Output(path) if path.trim().is_empty() => TaskState::Pending,
                        StoredState::Output(path) => TaskState::Completed(path),
                    };
                    (name, state)
                })
                .collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_to_completed() {
        let mut tasks = TaskMap::new();
        tasks.seed("download", true);
        let outcome = tasks.complete("download", "/out/1.mp4");
        assert_eq!(outcome, UpdateOutcome::Applied);
        assert_eq!(
            tasks.get("download"),
            TaskState::Completed("/out/1.mp4".to_string())
        );
    }

    #[test]
    fn test_completed_is_terminal() {
        let mut tasks = TaskMap::new();
        tasks.seed("download", true);
        tasks.complete("download", "/out/1.mp4");

        let outcome = tasks.complete("download", "/out/other.mp4");
        assert_eq!(
            outcome,
            UpdateOutcome::AlreadyCompleted("/out/1.mp4".to_string())
        );
        assert_eq!(tasks.get("download").output_path(), Some("/out/1.mp4"));
    }

    #[test]
    fn test_skipped_and_unconfigured_do_not_transition() {
        let mut tasks = TaskMap::new();
        tasks.seed("watermark", false);

        assert_eq!(tasks.complete("watermark", "/x"), UpdateOutcome::Skipped);
        assert_eq!(tasks.complete("make_clips", "/x"), UpdateOutcome::Unconfigured);
        assert_eq!(tasks.get("watermark"), TaskState::Skipped);
        assert!(!tasks.contains("make_clips"));
    }

    #[test]
    fn test_empty_output_is_rejected() {
        let mut tasks = TaskMap::new();
        tasks.seed("download", true);
        assert_eq!(tasks.complete("download", "  "), UpdateOutcome::EmptyOutput);
        assert!(tasks.get("download").is_pending());
    }

    #[test]
    fn test_seed_keeps_existing() {
        let mut tasks = TaskMap::new();
        tasks.seed("download", true);
        tasks.complete("download", "/out/1.mp4");
        tasks.seed("download", true);
        tasks.seed("watermark", false);
        assert!(tasks.get("download").is_completed());
        assert_eq!(tasks.get("watermark"), TaskState::Skipped);
    }

    #[test]
    fn test_wire_format() {
        let json = r#"{"download":"/out/1.mp4","watermark":true,"make_clips":false}"#;
        let tasks: TaskMap = serde_json::from_str(json).unwrap();
        assert_eq!(
            tasks.get("download"),
            TaskState::Completed("/out/1.mp4".to_string())
        );
        assert_eq!(tasks.get("watermark"), TaskState::Pending);
        assert_eq!(tasks.get("make_clips"), TaskState::Skipped);

        // Declared order survives a rewrite.
        assert_eq!(serde_json::to_string(&tasks).unwrap(), json);
    }

    #[test]
    fn test_empty_string_reads_as_pending() {
        let tasks: TaskMap = serde_json::from_str(r#"{"download":""}"#).unwrap();
        assert_eq!(tasks.get("download"), TaskState::Pending);
    }

    #[test]
    fn test_invalid_value_rejected() {
        let result: Result<TaskMap, _> = serde_json::from_str(r#"{"download":42}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_from_iter_drops_unconfigured() {
        let tasks: TaskMap = vec![
            ("a".to_string(), TaskState::Pending),
            ("b".to_string(), TaskState::Unconfigured),
        ]
        .into_iter()
        .collect();
        assert_eq!(tasks.len(), 1);
        assert!(!tasks.contains("b"));
    }
}
