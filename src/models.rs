//! Model metadata catalog and on-disk artifact cache.
//!
//! Maps the user-facing tier setting to concrete model identifiers and
//! answers whether a model's artifacts are already present locally. Purely
//! informational; downloading is the engine's concern.

use crate::defaults::{MODEL_LARGE, MODEL_SMALL, MODEL_TINY};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// User-facing model size tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ModelTier {
    Tiny,
    #[default]
    Small,
    Large,
}

/// Metadata for a transcription model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInfo {
    /// Model identifier passed to the engine loader
    pub id: &'static str,
    /// Tier this model backs
    pub tier: ModelTier,
    /// Approximate download size in megabytes
    pub size_mb: u32,
    /// Artifact file name inside the cache directory
    pub artifact: &'static str,
}

/// Catalog of models backing the tier setting.
///
/// Tiers trade accuracy for load time and memory: tiny loads in seconds and
/// fits anywhere, large needs a capable machine.
pub const MODELS: &[ModelInfo] = &[
    ModelInfo {
        id: MODEL_TINY,
        tier: ModelTier::Tiny,
        size_mb: 75,
        artifact: "ggml-tiny.en.bin",
    },
    ModelInfo {
        id: MODEL_SMALL,
        tier: ModelTier::Small,
        size_mb: 466,
        artifact: "ggml-small.en.bin",
    },
    ModelInfo {
        id: MODEL_LARGE,
        tier: ModelTier::Large,
        size_mb: 3094,
        artifact: "ggml-large-v3.bin",
    },
];

/// Resolve a tier to its model.
pub fn resolve_tier(tier: ModelTier) -> &'static ModelInfo {
    // The catalog covers every tier; the fallback can't be hit unless the
    // table above is edited out from under the enum.
    MODELS.iter().find(|m| m.tier == tier).unwrap_or(&MODELS[0])
}

/// Find a model by identifier.
pub fn get_model(id: &str) -> Option<&'static ModelInfo> {
    MODELS.iter().find(|m| m.id == id)
}

/// Model cache directory, `~/.cache/voxnote/models` on Linux.
pub fn cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("voxnote")
        .join("models")
}

/// Path where a model's artifact lives (or would live) on disk.
///
/// Returns `None` for identifiers not in the catalog.
pub fn model_path(id: &str) -> Option<PathBuf> {
    get_model(id).map(|m| cache_dir().join(m.artifact))
}

/// Whether a model's artifacts are already present on disk.
pub fn is_cached(id: &str) -> bool {
    is_cached_in(&cache_dir(), id)
}

fn is_cached_in(dir: &Path, id: &str) -> bool {
    get_model(id).is_some_and(|m| dir.join(m.artifact).exists())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_tier_resolves() {
        assert_eq!(resolve_tier(ModelTier::Tiny).id, MODEL_TINY);
        assert_eq!(resolve_tier(ModelTier::Small).id, MODEL_SMALL);
        assert_eq!(resolve_tier(ModelTier::Large).id, MODEL_LARGE);
    }

    #[test]
    fn get_model_unknown_id() {
        assert!(get_model("no-such-model").is_none());
    }

    #[test]
    fn tier_parses_from_lowercase() {
        let tier: ModelTier = serde_json::from_str("\"large\"").unwrap();
        assert_eq!(tier, ModelTier::Large);
    }

    #[test]
    fn cached_check_reflects_disk_state() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!is_cached_in(dir.path(), MODEL_TINY));

        std::fs::write(dir.path().join("ggml-tiny.en.bin"), b"stub").unwrap();
        assert!(is_cached_in(dir.path(), MODEL_TINY));
        // Other tiers unaffected
        assert!(!is_cached_in(dir.path(), MODEL_SMALL));
    }

    #[test]
    fn cached_check_unknown_model_is_false() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!is_cached_in(dir.path(), "no-such-model"));
    }

    #[test]
    fn model_path_joins_cache_dir() {
        let path = model_path(MODEL_SMALL).unwrap();
        assert!(path.ends_with("voxnote/models/ggml-small.en.bin"));
    }
}
