use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use crate::common::error::{EngineError, Result};

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct EngineConfig {
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub audit: AuditConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MatchingConfig {
    /// A probe must beat this strictly to resolve to an identity.
    #[serde(default = "default_resolve_threshold")]
    pub resolve_threshold: f32,
    /// When set, enrollment rejects embeddings of any other length.
    #[serde(default)]
    pub embedding_dim: Option<usize>,
}

fn default_resolve_threshold() -> f32 { 0.6 }

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            resolve_threshold: default_resolve_threshold(),
            embedding_dim: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AuditConfig {
    /// Sightings below this confidence are discarded, not persisted.
    #[serde(default = "default_confidence_floor")]
    pub confidence_floor: f32,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default = "default_writer_threads")]
    pub writer_threads: usize,
}

fn default_confidence_floor() -> f32 { 0.5 }
fn default_queue_capacity() -> usize { 256 }
fn default_writer_threads() -> usize { 2 }

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            confidence_floor: default_confidence_floor(),
            queue_capacity: default_queue_capacity(),
            writer_threads: default_writer_threads(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_search_threshold")]
    pub threshold: f32,
    #[serde(default = "default_search_limit")]
    pub limit: usize,
    /// Sightings older than this are never scanned, whatever their similarity.
    #[serde(default = "default_window_days")]
    pub window_days: i64,
}

fn default_search_threshold() -> f32 { 0.5 }
fn default_search_limit() -> usize { 50 }
fn default_window_days() -> i64 { 30 }

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            threshold: default_search_threshold(),
            limit: default_search_limit(),
            window_days: default_window_days(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct StorageConfig {
    /// Overrides the per-user data directory when set.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

/// Declared audit-trail expiry. Parsed and validated, but nothing deletes
/// sightings yet; the engine runs no background sweeps.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct RetentionConfig {
    #[serde(default)]
    pub expire_after_days: Option<i64>,
}

impl EngineConfig {
    pub fn load_from_path(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Err(EngineError::Other(anyhow::anyhow!(
                "Config file not found: {}. Please create it from the example.", path.display()
            )));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: EngineConfig = toml::from_str(&contents)
            .map_err(|e| EngineError::Other(anyhow::anyhow!("Config parse error: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.matching.resolve_threshold) {
            return Err(EngineError::Other(anyhow::anyhow!(
                "Resolve threshold must be between 0.0 and 1.0, got {}",
                self.matching.resolve_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.audit.confidence_floor) {
            return Err(EngineError::Other(anyhow::anyhow!(
                "Audit confidence floor must be between 0.0 and 1.0, got {}",
                self.audit.confidence_floor
            )));
        }
        if !(0.0..=1.0).contains(&self.search.threshold) {
            return Err(EngineError::Other(anyhow::anyhow!(
                "Search threshold must be between 0.0 and 1.0, got {}",
                self.search.threshold
            )));
        }

        if self.audit.queue_capacity == 0 {
            return Err(EngineError::Other(anyhow::anyhow!(
                "Audit queue capacity must be at least 1"
            )));
        }
        if self.audit.writer_threads == 0 {
            return Err(EngineError::Other(anyhow::anyhow!(
                "Audit writer pool needs at least 1 thread"
            )));
        }

        if self.search.limit == 0 {
            return Err(EngineError::Other(anyhow::anyhow!(
                "Search limit must be at least 1"
            )));
        }
        if self.search.window_days < 1 {
            return Err(EngineError::Other(anyhow::anyhow!(
                "Search window must be at least 1 day, got {}", self.search.window_days
            )));
        }

        if let Some(dim) = self.matching.embedding_dim {
            if dim == 0 {
                return Err(EngineError::Other(anyhow::anyhow!(
                    "Pinned embedding dimension must be non-zero"
                )));
            }
        }
        if let Some(days) = self.retention.expire_after_days {
            if days < 1 {
                return Err(EngineError::Other(anyhow::anyhow!(
                    "Retention expiry must be at least 1 day, got {}", days
                )));
            }
            // Declared but inert: parsed so deployments can state intent,
            // enforced by nothing in this engine.
            tracing::info!("Audit retention declared ({} days) but expiry is not active", days);
        }

        Ok(())
    }
}
