//! Global configuration loader for Tavern.
//!
//! Reads `config.toml` from the data directory (`~/.tavern/` by default) and
//! deserializes it into [`TavernConfig`]. Falls back to defaults when the
//! file is missing or malformed.

use std::path::{Path, PathBuf};

use tavern_types::config::TavernConfig;

/// Resolve the data directory from environment or platform defaults.
///
/// Priority:
/// 1. `TAVERN_HOME` environment variable
/// 2. `~/.tavern`
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("TAVERN_HOME") {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".tavern");
    }

    PathBuf::from(".tavern")
}

/// Load configuration from `{data_dir}/config.toml`.
///
/// - Missing file: defaults.
/// - Unreadable or unparsable file: a warning, then defaults.
///
/// Relative paths in the file are resolved against `data_dir`.
pub async fn load_config(data_dir: &Path) -> TavernConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return TavernConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return TavernConfig::default();
        }
    };

    match toml::from_str::<TavernConfig>(&content) {
        Ok(config) => resolve_paths(config, data_dir),
        Err(err) => {
            tracing::warn!("Failed to parse {}: {err}, using defaults", config_path.display());
            TavernConfig::default()
        }
    }
}

fn resolve_paths(mut config: TavernConfig, data_dir: &Path) -> TavernConfig {
    for path in [
        &mut config.templates_dir,
        &mut config.presets_dir,
        &mut config.model_templates_path,
    ]
    .into_iter()
    .flatten()
    {
        if path.is_relative() {
            *path = data_dir.join(&*path);
        }
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_config_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).await;
        assert_eq!(config.default_profile, "chatml");
        assert_eq!(config.token_limit, 2048);
    }

    #[tokio::test]
    async fn load_config_valid_toml_resolves_relative_paths() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(
            tmp.path().join("config.toml"),
            r#"
templates_dir = "templates"
presets_dir = "/opt/presets"
token_limit = 1024

[vision]
automatic1111_host = "http://gpu-box:7860"
"#,
        )
        .await
        .unwrap();

        let config = load_config(tmp.path()).await;
        assert_eq!(config.token_limit, 1024);
        assert_eq!(config.templates_dir, Some(tmp.path().join("templates")));
        assert_eq!(config.presets_dir, Some(PathBuf::from("/opt/presets")));
        assert!(config.model_templates_path.is_none());
        assert_eq!(
            config.vision.automatic1111_host.as_deref(),
            Some("http://gpu-box:7860")
        );
    }

    #[tokio::test]
    async fn load_config_invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join("config.toml"), "this is not { valid toml !!!")
            .await
            .unwrap();

        let config = load_config(tmp.path()).await;
        assert_eq!(config.token_limit, 2048);
        assert!(config.templates_dir.is_none());
    }
}
