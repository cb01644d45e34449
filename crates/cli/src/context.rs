//! State shared by the `run` and `cleanup` subcommands.

use std::path::Path;

use anyhow::{Context, Result};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use teton_core::{
    create_journal, load_config, validate_config, Config, JournalHandle, TaskRegistry,
};

pub struct AppContext {
    pub config: Config,
    pub journal: JournalHandle,
    writer: Option<JoinHandle<()>>,
}

impl AppContext {
    /// Load and validate configuration, then start the journal writer.
    pub fn load(path: &Path) -> Result<Self> {
        info!("Loading configuration from {:?}", path);
        let config = load_config(path)
            .with_context(|| format!("Failed to load config from {:?}", path))?;
        validate_config(&config).context("Configuration validation failed")?;
        info!("Metadata dir: {:?}", config.storage.metadata_dir);
        info!("Output dir: {:?}", config.storage.output_dir);
        Ok(Self::from_config(config))
    }

    /// Must be called from within the tokio runtime.
    pub fn from_config(config: Config) -> Self {
        if !config.journal.enabled {
            info!("Journal disabled");
            return Self {
                config,
                journal: JournalHandle::disabled(),
                writer: None,
            };
        }

        let (journal, writer) = create_journal(config.journal_path(), config.journal.buffer_size);
        let writer = tokio::spawn(writer.run());
        Self {
            config,
            journal,
            writer: Some(writer),
        }
    }

    pub fn registry(&self) -> Result<TaskRegistry> {
        TaskRegistry::from_config(&self.config.tasks).context("Failed to build task registry")
    }

    /// Drop the journal handle and wait for queued events to be written.
    ///
    /// Components holding clones of the handle must be dropped first.
    pub async fn shutdown(self) {
        let Self {
            journal, writer, ..
        } = self;
        drop(journal);
        if let Some(writer) = writer {
            if let Err(e) = writer.await {
                warn!("Journal writer task failed: {}", e);
            }
        }
    }
}
