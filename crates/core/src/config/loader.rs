use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Load configuration from file with environment variable overrides.
///
/// Environment variables use the `TETON_` prefix and `__` between nesting
/// levels, e.g. `TETON_STORAGE__METADATA_DIR=/srv/metadata`.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let config: Config = Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed("TETON_").split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    Ok(config)
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_from_str_empty_uses_defaults() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.storage.metadata_dir, PathBuf::from("./metadata"));
        assert_eq!(config.tasks.len(), 6);
        assert_eq!(config.tasks[0].name, "download");
    }

    #[test]
    fn test_load_config_from_str_invalid_input_kind() {
        let toml = r#"
[[tasks]]
name = "download"
input = "stdin"
"#;
        let result = load_config_from_str(toml);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/teton.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[storage]
metadata_dir = "/data/metadata"
output_dir = "/data/output"

[download]
finalize_timeout_secs = 30

[[tasks]]
name = "download"
input = "url"
command = "yt-dlp-wrapper"

[[tasks]]
name = "watermark"
input = "path"
enabled = false
"#
        )
        .unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.storage.metadata_dir, PathBuf::from("/data/metadata"));
        assert_eq!(config.download.finalize_timeout_secs, 30);
        assert_eq!(config.tasks.len(), 2);
        assert!(!config.tasks[1].enabled);
        assert_eq!(config.tasks[0].command.as_deref(), Some("yt-dlp-wrapper"));
    }
}
