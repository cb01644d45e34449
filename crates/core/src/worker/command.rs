//! Worker that runs an external program per task.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::{debug, warn};

use crate::config::TaskConfig;

use super::error::WorkerError;
use super::traits::TaskWorker;
use super::types::{TaskRequest, WorkerOutput};

/// Runs `<command> <args...> <input>` and reads the produced path from stdout.
///
/// The child also sees `TETON_TASK` and `TETON_URL` in its environment.
#[derive(Debug, Clone)]
pub struct CommandWorker {
    name: String,
    program: PathBuf,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
    timeout_secs: u64,
}

impl CommandWorker {
    pub fn new(name: impl Into<String>, program: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            timeout_secs: 3600,
        }
    }

    /// Returns `None` when the task has no command configured.
    pub fn from_task_config(task: &TaskConfig) -> Option<Self> {
        let program = task.command.as_ref()?;
        Some(Self {
            name: task.name.clone(),
            program: PathBuf::from(program),
            args: task.args.clone(),
            working_dir: task.working_dir.clone(),
            timeout_secs: task.timeout_secs,
        })
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Locate the program the way the OS would: as a path when it contains a
    /// separator, otherwise through `PATH`.
    fn resolve_program(&self) -> Option<PathBuf> {
        if self.program.components().count() > 1 || self.program.is_absolute() {
            let candidate = match &self.working_dir {
                Some(dir) if self.program.is_relative() => dir.join(&self.program),
                _ => self.program.clone(),
            };
            return candidate.is_file().then_some(candidate);
        }

        let paths = std::env::var_os("PATH")?;
        std::env::split_paths(&paths)
            .map(|dir| dir.join(&self.program))
            .find(|candidate| candidate.is_file())
    }
}

#[async_trait]
impl TaskWorker for CommandWorker {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, request: &TaskRequest) -> Result<WorkerOutput, WorkerError> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg(request.input.to_arg())
            .env("TETON_TASK", &request.task)
            .env("TETON_URL", &request.url)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        debug!(
            task = %request.task,
            program = %self.program.display(),
            "Spawning worker"
        );

        let child = command.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                WorkerError::ProgramNotFound {
                    program: self.program.clone(),
                }
            } else {
                WorkerError::SpawnFailed {
                    program: self.program.clone(),
                    reason: e.to_string(),
                }
            }
        })?;

        // Dropping the child on timeout kills it.
        let output = match timeout(
            Duration::from_secs(self.timeout_secs),
            child.wait_with_output(),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => {
                warn!(task = %request.task, timeout_secs = self.timeout_secs, "Worker timed out");
                return Err(WorkerError::Timeout {
                    timeout_secs: self.timeout_secs,
                });
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(WorkerError::failed(
                output.status.code(),
                stderr.trim().to_string(),
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        WorkerOutput::from_stdout(&stdout).ok_or(WorkerError::NoOutput)
    }

    async fn validate(&self) -> Result<(), WorkerError> {
        if let Some(dir) = &self.working_dir {
            if !dir.is_dir() {
                return Err(WorkerError::SpawnFailed {
                    program: self.program.clone(),
                    reason: format!("working directory {} does not exist", dir.display()),
                });
            }
        }
        match self.resolve_program() {
            Some(_) => Ok(()),
            None => Err(WorkerError::ProgramNotFound {
                program: self.program.clone(),
            }),
        }
    }
}
