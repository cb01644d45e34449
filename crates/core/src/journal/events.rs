use serde::{Deserialize, Serialize};

/// Journal event types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JournalEvent {
    // Pipeline runs
    RunStarted {
        url: String,
        dry_run: bool,
    },
    DownloadRequested {
        url: String,
        task: String,
    },
    /// First capture of an artifact's metadata.
    DocumentCaptured {
        url: String,
        document_path: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        raw_capture_path: Option<String>,
    },
    DownloadPending {
        url: String,
        expected_path: String,
        /// Partial files still present when the wait gave up.
        partials: Vec<String>,
    },

    // Task outcomes
    TaskCompleted {
        url: String,
        task: String,
        output_path: String,
    },
    TaskFailed {
        url: String,
        task: String,
        error: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attempts: Option<u32>,
    },
    TaskSkipped {
        url: String,
        task: String,
        reason: String,
    },

    // Cleanup
    CleanupFinished {
        url: String,
        dry_run: bool,
        index_entries: usize,
        documents: usize,
        raw_captures: usize,
        partials: usize,
        sidecars: usize,
        errors: usize,
    },
}

impl JournalEvent {
    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            JournalEvent::RunStarted { .. } => "run_started",
            JournalEvent::DownloadRequested { .. } => "download_requested",
            JournalEvent::DocumentCaptured { .. } => "document_captured",
            JournalEvent::DownloadPending { .. } => "download_pending",
            JournalEvent::TaskCompleted { .. } => "task_completed",
            JournalEvent::TaskFailed { .. } => "task_failed",
            JournalEvent::TaskSkipped { .. } => "task_skipped",
            JournalEvent::CleanupFinished { .. } => "cleanup_finished",
        }
    }

    /// The artifact URL this event concerns
    pub fn url(&self) -> &str {
        match self {
            JournalEvent::RunStarted { url, .. }
            | JournalEvent::DownloadRequested { url, .. }
            | JournalEvent::DocumentCaptured { url, .. }
            | JournalEvent::DownloadPending { url, .. }
            | JournalEvent::TaskCompleted { url, .. }
            | JournalEvent::TaskFailed { url, .. }
            | JournalEvent::TaskSkipped { url, .. }
            | JournalEvent::CleanupFinished { url, .. } => url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = JournalEvent::TaskCompleted {
            url: "https://x/1".to_string(),
            task: "watermark".to_string(),
            output_path: "/out/1_wm.mp4".to_string(),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "task_completed");
        assert_eq!(json["task"], "watermark");

        let parsed: JournalEvent = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn test_event_type_matches_tag() {
        let events = vec![
            JournalEvent::RunStarted {
                url: "u".to_string(),
                dry_run: false,
            },
            JournalEvent::TaskSkipped {
                url: "u".to_string(),
                task: "t".to_string(),
                reason: "skipped".to_string(),
            },
            JournalEvent::DownloadPending {
                url: "u".to_string(),
                expected_path: "/out/1.mp4".to_string(),
                partials: vec!["/out/1.mp4.part".to_string()],
            },
        ];
        for event in events {
            let json = serde_json::to_value(&event).unwrap();
            assert_eq!(json["type"], event.event_type());
            assert_eq!(event.url(), "u");
        }
    }

    #[test]
    fn test_optional_fields_omitted() {
        let event = JournalEvent::TaskFailed {
            url: "u".to_string(),
            task: "t".to_string(),
            error: "boom".to_string(),
            attempts: None,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(!json.contains("attempts"));
    }
}
