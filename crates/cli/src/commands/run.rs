use std::fmt::Write;
use std::process::ExitCode;

use anyhow::Result;
use tracing::{error, info};

use teton_core::{DownloadOutcome, PipelineOrchestrator, PipelineReport, RunRequest, TaskOutcome};

use crate::context::AppContext;

pub async fn execute(ctx: &AppContext, url: String, dry_run: bool) -> Result<ExitCode> {
    let orchestrator =
        PipelineOrchestrator::new(&ctx.config, ctx.registry()?, ctx.journal.clone());
    let request = RunRequest::new(url).dry_run(dry_run);

    match orchestrator.run(&request).await {
        Ok(report) => {
            print!("{}", render(&report)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            error!("Run failed for {}: {}", request.url, e);
            if e.is_retryable() {
                info!("Safe to retry: teton run {}", request.url);
            }
            Ok(ExitCode::FAILURE)
        }
    }
}

fn render(report: &PipelineReport) -> Result<String> {
    let mut out = String::new();
    if report.dry_run {
        writeln!(out, "Dry run, nothing was changed")?;
    }
    match (&report.document_path, &report.document) {
        (Some(path), Some(document)) => {
            writeln!(out, "Found in: {}", path.display())?;
            writeln!(out, "{}", serde_json::to_string_pretty(&document.summary())?)?;
        }
        _ => writeln!(out, "No document recorded for {}", report.url)?,
    }

    match &report.download {
        DownloadOutcome::AlreadyCompleted { output_path } => {
            writeln!(out, "download: already completed ({})", output_path)?
        }
        DownloadOutcome::Downloaded { output_path } => {
            writeln!(out, "download: completed ({})", output_path)?
        }
        DownloadOutcome::WouldRun => writeln!(out, "download: would run")?,
    }
    for task in &report.tasks {
        match &task.outcome {
            TaskOutcome::AlreadyCompleted { output_path }
            | TaskOutcome::Completed { output_path } => writeln!(
                out,
                "{}: {} ({})",
                task.task,
                task.outcome.label(),
                output_path
            )?,
            TaskOutcome::Failed { error } => writeln!(out, "{}: failed ({})", task.task, error)?,
            other => writeln!(out, "{}: {}", task.task, other.label())?,
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use teton_core::{ArtifactFields, Document, TaskMap, TaskReport};

    fn report() -> PipelineReport {
        let mut tasks = TaskMap::new();
        tasks.seed("download", true);
        tasks.seed("watermark", true);
        let mut document = Document::new("https://x/1", ArtifactFields::default(), tasks);
        document.complete_task("download", "/out/1.mp4");

        PipelineReport {
            url: "https://x/1".to_string(),
            dry_run: false,
            document_path: Some(PathBuf::from("/meta/1.json")),
            document: Some(document),
            download: DownloadOutcome::Downloaded {
                output_path: "/out/1.mp4".to_string(),
            },
            tasks: vec![
                TaskReport {
                    task: "watermark".to_string(),
                    outcome: TaskOutcome::Failed {
                        error: "exit 1".to_string(),
                    },
                },
                TaskReport {
                    task: "make_clips".to_string(),
                    outcome: TaskOutcome::Unconfigured,
                },
            ],
        }
    }

    #[test]
    fn test_render_report() {
        let out = render(&report()).unwrap();
        let mut lines = out.lines();

        assert_eq!(lines.next(), Some("Found in: /meta/1.json"));
        assert!(out.contains("\"url\": \"https://x/1\""));
        assert!(out.contains("\"download\": \"/out/1.mp4\""));
        assert!(out.contains("download: completed (/out/1.mp4)\n"));
        assert!(out.contains("watermark: failed (exit 1)\n"));
        assert!(out.ends_with("make_clips: unconfigured\n"));
    }

    #[test]
    fn test_render_dry_run_without_document() {
        let report = PipelineReport {
            dry_run: true,
            document_path: None,
            document: None,
            download: DownloadOutcome::WouldRun,
            tasks: vec![TaskReport {
                task: "watermark".to_string(),
                outcome: TaskOutcome::WouldRun,
            }],
            ..report()
        };

        let out = render(&report).unwrap();
        assert_eq!(
            out,
            "Dry run, nothing was changed\n\
             No document recorded for https://x/1\n\
             download: would run\n\
             watermark: would run\n"
        );
    }
}
