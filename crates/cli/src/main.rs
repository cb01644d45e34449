mod commands;
mod context;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use context::AppContext;

/// Config file used when neither `--config` nor `TETON_CONFIG` is given.
const DEFAULT_CONFIG: &str = "teton.toml";

#[derive(Parser)]
#[command(name = "teton", version)]
#[command(about = "Download, catalogue and post-process URL-sourced media", long_about = None)]
struct Cli {
    /// Configuration file [default: $TETON_CONFIG, then ./teton.toml]
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log as JSON lines instead of human-readable text
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline for a URL: download, capture metadata, then every pending task
    Run {
        url: String,
        /// Report what would run without invoking workers or writing anything
        #[arg(long)]
        dry_run: bool,
    },
    /// Remove everything recorded or downloaded for a URL
    Cleanup {
        url: String,
        /// List what would be removed without removing it
        #[arg(long)]
        dry_run: bool,
        /// Leave partial downloads in the output directory
        #[arg(long)]
        skip_partials: bool,
    },
    /// Check configuration, directories and task workers
    Doctor,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_json);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("Fatal error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config_path = resolve_config_path(cli.config);

    // Doctor reports a broken config instead of failing on it.
    if let Commands::Doctor = cli.command {
        return Ok(commands::doctor::execute(&config_path).await);
    }

    let ctx = AppContext::load(&config_path)?;
    let result = match cli.command {
        Commands::Run { url, dry_run } => commands::run::execute(&ctx, url, dry_run).await,
        Commands::Cleanup {
            url,
            dry_run,
            skip_partials,
        } => commands::cleanup::execute(&ctx, url, dry_run, skip_partials).await,
        Commands::Doctor => Ok(ExitCode::SUCCESS),
    };
    ctx.shutdown().await;
    result
}

fn resolve_config_path(explicit: Option<PathBuf>) -> PathBuf {
    explicit
        .or_else(|| std::env::var_os("TETON_CONFIG").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG))
}

/// Logs go to stderr; stdout carries command output.
fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_with_global_flags() {
        let cli = Cli::try_parse_from([
            "teton",
            "run",
            "https://x/1",
            "--dry-run",
            "--config",
            "/etc/teton.toml",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("/etc/teton.toml")));
        assert!(!cli.log_json);
        match cli.command {
            Commands::Run { url, dry_run } => {
                assert_eq!(url, "https://x/1");
                assert!(dry_run);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_parse_cleanup_flags() {
        let cli = Cli::try_parse_from([
            "teton",
            "--log-json",
            "cleanup",
            "https://x/1",
            "--skip-partials",
        ])
        .unwrap();

        assert!(cli.log_json);
        match cli.command {
            Commands::Cleanup {
                url,
                dry_run,
                skip_partials,
            } => {
                assert_eq!(url, "https://x/1");
                assert!(!dry_run);
                assert!(skip_partials);
            }
            _ => panic!("expected cleanup"),
        }
    }

    #[test]
    fn test_run_requires_url() {
        let err = Cli::try_parse_from(["teton", "run"]).err().unwrap();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_explicit_config_wins() {
        let path = resolve_config_path(Some(PathBuf::from("custom.toml")));
        assert_eq!(path, PathBuf::from("custom.toml"));
    }
}
