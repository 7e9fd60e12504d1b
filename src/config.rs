//! Transcription settings.
//!
//! The host application owns the real settings store; this module defines
//! the slice of it the engine consumes and a [`SettingsStore`] seam so the
//! orchestrator can re-read it on every call. A TOML-backed store is
//! provided for standalone use.

use crate::error::Result;
use crate::models::ModelTier;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Which transcription path is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Local,
    Cloud,
}

/// Settings slice consumed by the engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct SttSettings {
    pub provider: Provider,
    pub model_tier: ModelTier,
    pub cloud_api_key: Option<String>,
}

impl SttSettings {
    /// Load settings from a TOML file.
    ///
    /// Missing fields use defaults; invalid TOML is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let settings: SttSettings = toml::from_str(&contents)?;
        Ok(settings)
    }

    /// Apply environment variable overrides.
    ///
    /// Supported:
    /// - VOXNOTE_PROVIDER → provider (`local` | `cloud`)
    /// - VOXNOTE_MODEL_TIER → model_tier (`tiny` | `small` | `large`)
    /// - VOXNOTE_CLOUD_API_KEY → cloud_api_key
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(provider) = std::env::var("VOXNOTE_PROVIDER") {
            match provider.as_str() {
                "local" => self.provider = Provider::Local,
                "cloud" => self.provider = Provider::Cloud,
                _ => {}
            }
        }

        if let Ok(tier) = std::env::var("VOXNOTE_MODEL_TIER") {
            match tier.as_str() {
                "tiny" => self.model_tier = ModelTier::Tiny,
                "small" => self.model_tier = ModelTier::Small,
                "large" => self.model_tier = ModelTier::Large,
                _ => {}
            }
        }

        if let Ok(key) = std::env::var("VOXNOTE_CLOUD_API_KEY")
            && !key.is_empty()
        {
            self.cloud_api_key = Some(key);
        }

        self
    }

    /// Default settings file path, `~/.config/voxnote/settings.toml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("voxnote")
            .join("settings.toml")
    }
}

/// Source of the current settings, re-read on every orchestrator call.
pub trait SettingsStore: Send + Sync {
    fn snapshot(&self) -> SttSettings;
}

/// In-memory store, settable at runtime. The host app's settings UI writes
/// through this; tests script it.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    settings: Mutex<SttSettings>,
}

impl InMemoryStore {
    pub fn new(settings: SttSettings) -> Self {
        Self {
            settings: Mutex::new(settings),
        }
    }

    pub fn set(&self, settings: SttSettings) {
        *self.settings.lock().unwrap_or_else(|p| p.into_inner()) = settings;
    }
}

impl SettingsStore for InMemoryStore {
    fn snapshot(&self) -> SttSettings {
        self.settings
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }
}

/// File-backed store that re-reads its TOML file on every snapshot, falling
/// back to defaults when the file is missing or malformed.
#[derive(Debug)]
pub struct TomlFileStore {
    path: PathBuf,
}

impl TomlFileStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl SettingsStore for TomlFileStore {
    fn snapshot(&self) -> SttSettings {
        match SttSettings::load(&self.path) {
            Ok(settings) => settings.with_env_overrides(),
            Err(e) => {
                tracing::debug!(path = %self.path.display(), error = %e, "using default settings");
                SttSettings::default().with_env_overrides()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_local_small_no_key() {
        let settings = SttSettings::default();
        assert_eq!(settings.provider, Provider::Local);
        assert_eq!(settings.model_tier, ModelTier::Small);
        assert!(settings.cloud_api_key.is_none());
    }

    #[test]
    fn load_parses_partial_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(&path, "provider = \"cloud\"\ncloud_api_key = \"sk-test\"\n").unwrap();

        let settings = SttSettings::load(&path).unwrap();
        assert_eq!(settings.provider, Provider::Cloud);
        assert_eq!(settings.cloud_api_key.as_deref(), Some("sk-test"));
        // Unspecified field falls back to default
        assert_eq!(settings.model_tier, ModelTier::Small);
    }

    #[test]
    fn load_rejects_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(&path, "provider = = \"cloud\"").unwrap();
        assert!(SttSettings::load(&path).is_err());
    }

    #[test]
    fn in_memory_store_snapshot_tracks_set() {
        let store = InMemoryStore::default();
        assert_eq!(store.snapshot().provider, Provider::Local);

        store.set(SttSettings {
            provider: Provider::Cloud,
            ..Default::default()
        });
        assert_eq!(store.snapshot().provider, Provider::Cloud);
    }

    #[test]
    fn file_store_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = TomlFileStore::new(dir.path().join("absent.toml"));
        assert_eq!(store.snapshot().provider, Provider::Local);
    }
}
