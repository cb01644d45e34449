//! Ordered registry of task descriptors.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::{ConfigError, TaskConfig};
use crate::worker::{CommandWorker, TaskRequest, TaskWorker, WorkerError, WorkerOutput};

use super::TaskMap;

/// What a task receives as its single positional input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    /// The source URL. Reserved for the download task.
    Url,
    /// The artifact path produced by the download task.
    Path,
}

/// One pipeline stage: its name, input kind, seeded default and worker.
#[derive(Clone)]
pub struct TaskDescriptor {
    pub name: String,
    pub input: InputKind,
    /// Seeded into new documents as pending when true, skipped otherwise.
    pub enabled: bool,
    worker: Option<Arc<dyn TaskWorker>>,
}

impl TaskDescriptor {
    pub fn new(name: impl Into<String>, input: InputKind, enabled: bool) -> Self {
        Self {
            name: name.into(),
            input,
            enabled,
            worker: None,
        }
    }

    pub fn with_worker(mut self, worker: Arc<dyn TaskWorker>) -> Self {
        self.worker = Some(worker);
        self
    }

    pub fn worker(&self) -> Option<&Arc<dyn TaskWorker>> {
        self.worker.as_ref()
    }

    /// Run the task's worker. A task without a worker fails with `NotConfigured`.
    pub async fn invoke(&self, request: &TaskRequest) -> Result<WorkerOutput, WorkerError> {
        match &self.worker {
            Some(worker) => worker.run(request).await,
            None => Err(WorkerError::NotConfigured {
                task: self.name.clone(),
            }),
        }
    }
}

impl fmt::Debug for TaskDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskDescriptor")
            .field("name", &self.name)
            .field("input", &self.input)
            .field("enabled", &self.enabled)
            .field("worker", &self.worker.as_ref().map(|w| w.name().to_string()))
            .finish()
    }
}

/// Tasks in declared pipeline order. The first entry is the download task.
#[derive(Debug, Clone)]
pub struct TaskRegistry {
    tasks: Vec<TaskDescriptor>,
}

impl TaskRegistry {
    /// Build a registry, checking names are unique and that the first task is
    /// the only one taking the URL.
    pub fn new(tasks: Vec<TaskDescriptor>) -> Result<Self, ConfigError> {
        let Some(first) = tasks.first() else {
            return Err(ConfigError::ValidationError(
                "task registry is empty".to_string(),
            ));
        };
        if first.input != InputKind::Url {
            return Err(ConfigError::ValidationError(format!(
                "first task '{}' must take the url as input",
                first.name
            )));
        }

        let mut seen = HashSet::new();
        for task in &tasks {
            if !seen.insert(task.name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate task '{}'",
                    task.name
                )));
            }
        }
        if tasks.iter().skip(1).any(|t| t.input == InputKind::Url) {
            return Err(ConfigError::ValidationError(
                "only the download task may take the url as input".to_string(),
            ));
        }

        Ok(Self { tasks })
    }

    /// Build a registry from configuration, attaching a `CommandWorker` to
    /// every task that names a command.
    pub fn from_config(tasks: &[TaskConfig]) -> Result<Self, ConfigError> {
        let descriptors = tasks
            .iter()
            .map(|task| {
                let descriptor = TaskDescriptor::new(&task.name, task.input, task.enabled);
                match CommandWorker::from_task_config(task) {
                    Some(worker) => descriptor.with_worker(Arc::new(worker)),
                    None => descriptor,
                }
            })
            .collect();
        Self::new(descriptors)
    }

    /// Replace the worker of a named task.
    pub fn with_worker(mut self, task: &str, worker: Arc<dyn TaskWorker>) -> Self {
        match self.tasks.iter_mut().find(|t| t.name == task) {
            Some(descriptor) => descriptor.worker = Some(worker),
            None => warn!(task = %task, "Ignoring worker for unknown task"),
        }
        self
    }

    /// The privileged URL-input task.
    pub fn download(&self) -> &TaskDescriptor {
        // Non-empty is checked in `new`.
        &self.tasks[0]
    }

    /// Every task after download, in order.
    pub fn remaining(&self) -> impl Iterator<Item = &TaskDescriptor> {
        self.tasks.iter().skip(1)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TaskDescriptor> {
        self.tasks.iter()
    }

    pub fn get(&self, name: &str) -> Option<&TaskDescriptor> {
        self.tasks.iter().find(|t| t.name == name)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Default task map for a new document.
    pub fn defaults(&self) -> TaskMap {
        let mut tasks = TaskMap::new();
        for task in &self.tasks {
            tasks.seed(&task.name, task.enabled);
        }
        tasks
    }
}
