use std::collections::HashSet;

use crate::task::InputKind;

use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - The task registry is non-empty, has unique names and starts with the
///   single, enabled URL-input task
/// - Finalization polling is bounded and non-zero
/// - Partial-download suffixes are non-empty
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    validate_tasks(config)?;

    let download = &config.download;
    if download.finalize_poll_interval_ms == 0 {
        return Err(ConfigError::ValidationError(
            "download.finalize_poll_interval_ms cannot be 0".to_string(),
        ));
    }
    if download.finalize_poll_interval_ms > download.finalize_timeout_secs * 1000 {
        return Err(ConfigError::ValidationError(
            "download.finalize_poll_interval_ms exceeds download.finalize_timeout_secs"
                .to_string(),
        ));
    }
    if download.partial_suffixes.iter().any(|s| s.trim().is_empty()) {
        return Err(ConfigError::ValidationError(
            "download.partial_suffixes cannot contain empty entries".to_string(),
        ));
    }

    if config.journal.enabled && config.journal.buffer_size == 0 {
        return Err(ConfigError::ValidationError(
            "journal.buffer_size cannot be 0".to_string(),
        ));
    }

    Ok(())
}

fn validate_tasks(config: &Config) -> Result<(), ConfigError> {
    let Some(first) = config.tasks.first() else {
        return Err(ConfigError::ValidationError(
            "at least one task must be configured".to_string(),
        ));
    };

    if first.input != InputKind::Url {
        return Err(ConfigError::ValidationError(format!(
            "first task '{}' must take the url as input",
            first.name
        )));
    }
    if !first.enabled {
        return Err(ConfigError::ValidationError(format!(
            "download task '{}' cannot be disabled",
            first.name
        )));
    }

    let mut seen = HashSet::new();
    for task in &config.tasks {
        if task.name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "task names cannot be empty".to_string(),
            ));
        }
        if !seen.insert(task.name.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "duplicate task '{}'",
                task.name
            )));
        }
        if task.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(format!(
                "task '{}' timeout_secs cannot be 0",
                task.name
            )));
        }
    }

    let url_tasks = config
        .tasks
        .iter()
        .filter(|t| t.input == InputKind::Url)
        .count();
    if url_tasks > 1 {
        return Err(ConfigError::ValidationError(
            "only the download task may take the url as input".to_string(),
        ));
    }

    Ok(())
}
