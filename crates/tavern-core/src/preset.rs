//! Generation parameter presets.
//!
//! A preset is a YAML map of generation parameters (temperature, top_p,
//! max_tokens, ...) passed verbatim to a completion backend, which filters
//! out the keys its server does not accept.

use std::path::{Path, PathBuf};

use tavern_types::error::ConfigError;
use tavern_types::llm::Parameters;

/// Parse a preset from YAML text. An empty document is an empty preset.
pub fn load_preset_str(yaml: &str) -> Result<Parameters, ConfigError> {
    if yaml.trim().is_empty() {
        return Ok(Parameters::new());
    }
    serde_yaml_ng::from_str(yaml).map_err(|e| ConfigError::Parse(e.to_string()))
}

/// Read and parse a preset file.
pub fn load_preset_file(path: &Path) -> Result<Parameters, ConfigError> {
    let yaml = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ConfigError::NotFound(path.display().to_string()),
        _ => ConfigError::Io(format!("{}: {e}", path.display())),
    })?;
    load_preset_str(&yaml)
}

/// Loads named presets from `<dir>/<name>.yaml`.
#[derive(Debug, Clone)]
pub struct PresetLoader {
    dir: PathBuf,
}

impl PresetLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.yaml"))
    }

    /// Load a preset by name.
    ///
    /// A missing preset is logged and yields empty parameters so the
    /// backend falls back to its own defaults. A preset that exists but is
    /// malformed is an error.
    pub fn load(&self, name: &str) -> Result<Parameters, ConfigError> {
        let path = self.path_for(name);
        if !path.exists() {
            tracing::error!(preset = name, path = %path.display(), "preset not found");
            return Ok(Parameters::new());
        }
        load_preset_file(&path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_load_preset_str() {
        let params = load_preset_str("temperature: 0.7\nmax_tokens: 200\nstop: [\"\\n\"]\n").unwrap();
        assert_eq!(params["temperature"], json!(0.7));
        assert_eq!(params["max_tokens"], json!(200));
        assert_eq!(params["stop"], json!(["\n"]));
    }

    #[test]
    fn test_empty_preset() {
        assert!(load_preset_str("").unwrap().is_empty());
    }

    #[test]
    fn test_invalid_preset() {
        assert!(matches!(load_preset_str("- just\n- a list\n"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_loader_missing_preset_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("creative.yaml"), "temperature: 1.2\n").unwrap();

        let loader = PresetLoader::new(dir.path());
        assert_eq!(loader.load("creative").unwrap()["temperature"], json!(1.2));
        assert!(loader.load("missing").unwrap().is_empty());
    }

    #[test]
    fn test_load_preset_file_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_preset_file(&dir.path().join("nope.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }
}
