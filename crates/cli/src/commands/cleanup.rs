use std::fmt::Write;
use std::process::ExitCode;

use anyhow::{Context, Result};
use tracing::warn;

use teton_core::{Cleaner, CleanupReport, CleanupRequest};

use crate::context::AppContext;

pub async fn execute(
    ctx: &AppContext,
    url: String,
    dry_run: bool,
    skip_partials: bool,
) -> Result<ExitCode> {
    let cleaner = Cleaner::new(&ctx.config, ctx.journal.clone());
    let request = CleanupRequest::new(url)
        .dry_run(dry_run)
        .skip_partials(skip_partials);

    let report = cleaner
        .cleanup(&request)
        .await
        .with_context(|| format!("Cleanup failed for {}", request.url))?;
    print!("{}", render(&report)?);

    if report.errors.is_empty() {
        Ok(ExitCode::SUCCESS)
    } else {
        warn!(
            "{} file(s) could not be removed for {}",
            report.errors.len(),
            report.url
        );
        Ok(ExitCode::FAILURE)
    }
}

fn render(report: &CleanupReport) -> Result<String> {
    let verb = if report.dry_run { "Would remove" } else { "Removed" };
    let mut out = String::new();

    for (category, count) in report.counts() {
        writeln!(out, "{} {} {}", verb, count, category)?;
    }
    if report.total() == 0 {
        writeln!(out, "Nothing associated with {}", report.url)?;
        return Ok(out);
    }

    for record in &report.index_entries {
        writeln!(out, "  index: {} -> {}", record.url, record.document_filename)?;
    }
    for path in report.files() {
        writeln!(out, "  {}", path.display())?;
    }
    for failure in &report.errors {
        writeln!(out, "  failed: {} ({})", failure.path.display(), failure.error)?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use teton_core::IndexRecord;

    #[test]
    fn test_render_dry_run_lists_paths() {
        let report = CleanupReport {
            url: "https://x/1".to_string(),
            dry_run: true,
            index_entries: vec![IndexRecord::new("https://x/1", "vid1.json")],
            documents: vec![PathBuf::from("/meta/vid1.json")],
            partials: vec![PathBuf::from("/out/vid1.mp4.part")],
            ..Default::default()
        };

        let out = render(&report).unwrap();

        assert!(out.starts_with("Would remove 1 index entries\nWould remove 1 documents\n"));
        assert!(out.contains("Would remove 0 raw captures\n"));
        assert!(out.contains("  index: https://x/1 -> vid1.json\n"));
        assert!(out.contains("  /meta/vid1.json\n"));
        assert!(out.contains("  /out/vid1.mp4.part\n"));
    }

    #[test]
    fn test_render_empty_report() {
        let report = CleanupReport {
            url: "https://x/1".to_string(),
            ..Default::default()
        };

        let out = render(&report).unwrap();

        assert!(out.starts_with("Removed 0 index entries\n"));
        assert!(out.ends_with("Nothing associated with https://x/1\n"));
    }
}
