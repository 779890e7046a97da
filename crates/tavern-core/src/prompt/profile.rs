//! Template profile sources.
//!
//! The renderer looks profiles up by name through [`ProfileSource`]. Two
//! sources ship with the crate: [`StaticProfiles`] (in-memory, including the
//! built-in `chatml`, `llama3-instruct` and `alpaca` profiles) and
//! [`DirectoryProfiles`] (one `<name>.yaml` file per profile).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tavern_types::error::PromptError;
use tavern_types::template::TemplateProfile;

const BUILTIN_PROFILES: &[(&str, &str)] = &[
    ("chatml", include_str!("../../templates/chat/chatml.yaml")),
    (
        "llama3-instruct",
        include_str!("../../templates/chat/llama3-instruct.yaml"),
    ),
    ("alpaca", include_str!("../../templates/chat/alpaca.yaml")),
];

/// Keyed, read-only lookup of template profiles.
pub trait ProfileSource: Send + Sync {
    /// Fetch a profile by name.
    ///
    /// # Errors
    ///
    /// [`PromptError::ConfigNotFound`] when no profile has that name,
    /// [`PromptError::InvalidProfile`] when it exists but cannot be parsed.
    fn profile(&self, name: &str) -> Result<TemplateProfile, PromptError>;
}

/// Parse a profile from YAML text.
pub fn parse_profile(name: &str, yaml: &str) -> Result<TemplateProfile, PromptError> {
    serde_yaml_ng::from_str(yaml).map_err(|e| PromptError::InvalidProfile {
        name: name.to_string(),
        message: e.to_string(),
    })
}

/// In-memory profiles.
#[derive(Debug, Clone, Default)]
pub struct StaticProfiles {
    profiles: HashMap<String, TemplateProfile>,
}

impl StaticProfiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// The profiles bundled with the crate.
    pub fn builtin() -> Self {
        let mut profiles = Self::new();
        for (name, yaml) in BUILTIN_PROFILES {
            match parse_profile(name, yaml) {
                Ok(profile) => profiles.insert(*name, profile),
                Err(e) => tracing::error!(profile = name, error = %e, "bundled profile is invalid"),
            }
        }
        profiles
    }

    pub fn insert(&mut self, name: impl Into<String>, profile: TemplateProfile) {
        self.profiles.insert(name.into(), profile);
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.profiles.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl ProfileSource for StaticProfiles {
    fn profile(&self, name: &str) -> Result<TemplateProfile, PromptError> {
        self.profiles
            .get(name)
            .cloned()
            .ok_or_else(|| PromptError::ConfigNotFound(name.to_string()))
    }
}

/// Profiles stored as `<dir>/<name>.yaml`, read on every lookup.
#[derive(Debug, Clone)]
pub struct DirectoryProfiles {
    dir: PathBuf,
}

impl DirectoryProfiles {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, name: &str) -> Option<PathBuf> {
        let plain = !name.is_empty()
            && !name.contains(['/', '\\'])
            && name != "."
            && name != "..";
        plain.then(|| self.dir.join(format!("{name}.yaml")))
    }
}

impl ProfileSource for DirectoryProfiles {
    fn profile(&self, name: &str) -> Result<TemplateProfile, PromptError> {
        let path = self
            .path_for(name)
            .ok_or_else(|| PromptError::ConfigNotFound(name.to_string()))?;
        let yaml = match std::fs::read_to_string(&path) {
            Ok(yaml) => yaml,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PromptError::ConfigNotFound(name.to_string()));
            }
            Err(e) => {
                return Err(PromptError::InvalidProfile {
                    name: name.to_string(),
                    message: format!("failed to read {}: {e}", path.display()),
                });
            }
        };
        parse_profile(name, &yaml)
    }
}

/// Tries a primary source first and falls back to a secondary one when the
/// primary has no profile of that name.
#[derive(Debug, Clone)]
pub struct FallbackProfiles<A, B> {
    primary: A,
    fallback: B,
}

impl<A, B> FallbackProfiles<A, B> {
    pub fn new(primary: A, fallback: B) -> Self {
        Self { primary, fallback }
    }
}

impl<A: ProfileSource, B: ProfileSource> ProfileSource for FallbackProfiles<A, B> {
    fn profile(&self, name: &str) -> Result<TemplateProfile, PromptError> {
        match self.primary.profile(name) {
            Err(PromptError::ConfigNotFound(_)) => self.fallback.profile(name),
            other => other,
        }
    }
}
