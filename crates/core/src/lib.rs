pub mod capture;
pub mod cleanup;
pub mod config;
pub mod document;
pub mod fs_util;
pub mod index;
pub mod journal;
pub mod orchestrator;
pub mod task;
pub mod testing;
pub mod worker;

pub use capture::{CaptureError, CaptureOutcome, MetadataCapture};
pub use cleanup::{Cleaner, CleanupError, CleanupPlan, CleanupReport, CleanupRequest};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, RawCaptureMode,
    TaskConfig,
};
pub use document::{ArtifactFields, Document, DocumentError, DocumentStore, LocatedDocument};
pub use index::{IndexError, IndexRecord, UrlIndex};
pub use journal::{create_journal, JournalEvent, JournalHandle, JournalWriter};
pub use orchestrator::{
    DownloadOutcome, OrchestratorError, PipelineOrchestrator, PipelineReport, RunRequest,
    TaskOutcome, TaskReport,
};
pub use task::{InputKind, TaskDescriptor, TaskMap, TaskRegistry, TaskState, UpdateOutcome};
pub use worker::{CommandWorker, TaskInput, TaskRequest, TaskWorker, WorkerError, WorkerOutput};
