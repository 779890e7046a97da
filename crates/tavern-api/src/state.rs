//! Application state shared by the CLI commands.
//!
//! AppState holds the resolved data directory and configuration, and pins the
//! generic core types (profile sources, preset loader) to the on-disk layout.

use std::path::PathBuf;

use tavern_core::model_config::ModelTemplates;
use tavern_core::preset::PresetLoader;
use tavern_core::prompt::profile::{DirectoryProfiles, FallbackProfiles, StaticProfiles};
use tavern_core::prompt::renderer::PromptRenderer;
use tavern_core::prompt::system::SystemMessageTemplate;
use tavern_infra::config::{load_config, resolve_data_dir};
use tavern_types::config::TavernConfig;

/// Profiles from `<templates_dir>/chat/` first, then the built-in ones.
pub type ConcreteProfiles = FallbackProfiles<DirectoryProfiles, StaticProfiles>;

#[derive(Debug, Clone)]
pub struct AppState {
    pub data_dir: PathBuf,
    pub config: TavernConfig,
}

impl AppState {
    /// Resolve the data directory and load `config.toml` from it.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        let config = load_config(&data_dir).await;
        tracing::debug!(data_dir = %data_dir.display(), "loaded configuration");
        Ok(Self { data_dir, config })
    }

    pub fn templates_dir(&self) -> PathBuf {
        self.config
            .templates_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("templates"))
    }

    pub fn presets_dir(&self) -> PathBuf {
        self.config
            .presets_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("presets"))
    }

    pub fn renderer(&self) -> PromptRenderer<ConcreteProfiles> {
        let directory = DirectoryProfiles::new(self.templates_dir().join("chat"));
        PromptRenderer::new(FallbackProfiles::new(directory, StaticProfiles::builtin()))
    }

    pub fn presets(&self) -> PresetLoader {
        PresetLoader::new(self.presets_dir())
    }

    pub fn system_template(&self, name: &str) -> anyhow::Result<SystemMessageTemplate> {
        Ok(SystemMessageTemplate::from_template(&self.templates_dir(), name)?)
    }

    /// Model-name -> config table. Empty when no file is configured.
    pub fn model_templates(&self) -> anyhow::Result<ModelTemplates> {
        let path = self
            .config
            .model_templates_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join("model_templates.yaml"));
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no model templates file");
            return Ok(ModelTemplates::default());
        }
        Ok(ModelTemplates::from_file(&path)?)
    }
}
