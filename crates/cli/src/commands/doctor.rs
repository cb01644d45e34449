use std::path::Path;
use std::process::ExitCode;

use tracing::info;

use teton_core::{load_config, validate_config, Config, TaskRegistry};

/// Exit code when at least one check fails.
const EXIT_UNHEALTHY: u8 = 2;

/// Outcome of one diagnostic.
#[derive(Debug)]
pub struct Check {
    pub name: String,
    pub result: Result<String, String>,
}

impl Check {
    fn ok(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            result: Ok(detail.into()),
        }
    }

    fn err(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            result: Err(detail.into()),
        }
    }

    fn line(&self) -> String {
        match &self.result {
            Ok(detail) => format!("[OK]  {}: {}", self.name, detail),
            Err(detail) => format!("[ERR] {}: {}", self.name, detail),
        }
    }
}

pub async fn execute(config_path: &Path) -> ExitCode {
    let checks = run_checks(config_path).await;
    for check in &checks {
        println!("{}", check.line());
    }

    let failed = checks.iter().filter(|c| c.result.is_err()).count();
    if failed == 0 {
        info!("All {} checks passed", checks.len());
        ExitCode::SUCCESS
    } else {
        info!("{} of {} checks failed", failed, checks.len());
        ExitCode::from(EXIT_UNHEALTHY)
    }
}

pub async fn run_checks(config_path: &Path) -> Vec<Check> {
    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(e) => return vec![Check::err("config", e.to_string())],
    };
    let mut checks = vec![Check::ok("config", config_path.display().to_string())];
    if let Err(e) = validate_config(&config) {
        checks.push(Check::err("config", e.to_string()));
        return checks;
    }

    checks.push(check_dir("metadata_dir", &config.storage.metadata_dir).await);
    checks.push(check_dir("output_dir", &config.storage.output_dir).await);
    checks.extend(check_workers(&config).await);
    checks
}

/// The directory exists (or can be created) and accepts new files.
async fn check_dir(name: &str, dir: &Path) -> Check {
    if let Err(e) = tokio::fs::create_dir_all(dir).await {
        return Check::err(name, format!("cannot create {}: {}", dir.display(), e));
    }
    let probe = dir.join(format!(".teton-doctor-{}", std::process::id()));
    if let Err(e) = tokio::fs::write(&probe, b"").await {
        return Check::err(name, format!("{} is not writable: {}", dir.display(), e));
    }
    let _ = tokio::fs::remove_file(&probe).await;
    Check::ok(name, format!("{} is writable", dir.display()))
}

async fn check_workers(config: &Config) -> Vec<Check> {
    let registry = match TaskRegistry::from_config(&config.tasks) {
        Ok(registry) => registry,
        Err(e) => return vec![Check::err("tasks", e.to_string())],
    };

    let mut checks = Vec::with_capacity(registry.len());
    for task in registry.iter() {
        let name = format!("task {}", task.name);
        let check = match task.worker() {
            None if task.enabled => {
                Check::ok(name, "no command configured, runs will leave it pending")
            }
            None => Check::ok(name, "disabled, no command configured"),
            Some(worker) => match worker.validate().await {
                Ok(()) => Check::ok(name, format!("worker '{}' ready", worker.name())),
                Err(e) => Check::err(name, e.to_string()),
            },
        };
        checks.push(check);
    }
    checks
}
