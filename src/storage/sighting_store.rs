use crate::common::error::{EngineError, Result};
use crate::core::embedding::Embedding;
use crate::service::protocol::Demographics;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::RwLock;

/// One persisted detection+resolution event. The embedding is a snapshot
/// frozen at capture time; renaming or purging the identity never alters it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Sighting {
    pub id: String,
    #[serde(default)]
    pub identity_id: Option<String>,
    pub name: String,
    pub confidence: f32,
    pub dominant_emotion: String,
    #[serde(default)]
    pub emotion_scores: HashMap<String, f32>,
    #[serde(default)]
    pub demographics: Demographics,
    #[serde(default)]
    pub image_snapshot: Option<String>,
    #[serde(default)]
    pub embedding: Embedding,
    pub timestamp: DateTime<Utc>,
}

/// Append-only audit trail. Sightings are never mutated or deleted by
/// normal operation.
pub trait SightingStore: Send + Sync {
    fn append(&self, sighting: &Sighting) -> Result<()>;
    fn get(&self, id: &str) -> Result<Option<Sighting>>;
    /// Every sighting with `timestamp >= cutoff`, unordered.
    fn recorded_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<Sighting>>;
    /// Every sighting with `start <= timestamp <= end`, unordered.
    fn recorded_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<Sighting>>;
    /// Newest-first page, 1-based.
    fn page_desc(&self, page: usize, limit: usize) -> Result<Vec<Sighting>>;
    fn count(&self) -> Result<usize>;
}

/// One bincode file per sighting under `data_dir`.
pub struct FileSightingStore {
    data_dir: PathBuf,
}

impl FileSightingStore {
    pub fn open(data_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&data_dir)?;
        Ok(Self { data_dir })
    }

    pub fn open_default() -> Result<Self> {
        Self::open(super::default_data_dir()?.join("sightings"))
    }

    fn record_path(&self, id: &str) -> PathBuf {
        self.data_dir.join(format!("{}.bincode", id))
    }

    fn load_all(&self) -> Result<Vec<Sighting>> {
        let mut sightings = Vec::new();
        for entry in fs::read_dir(&self.data_dir)? {
            let path = entry?.path();
            if path.extension().map_or(false, |ext| ext == "bincode") {
                let data = fs::read(&path)?;
                let sighting = bincode::deserialize(&data).map_err(|e| {
                    EngineError::Storage(format!(
                        "Failed to deserialize sighting {:?}: {}",
                        path, e
                    ))
                })?;
                sightings.push(sighting);
            }
        }
        Ok(sightings)
    }
}

impl SightingStore for FileSightingStore {
    fn append(&self, sighting: &Sighting) -> Result<()> {
        let encoded = bincode::serialize(sighting)
            .map_err(|e| EngineError::Storage(format!("Failed to serialize sighting: {}", e)))?;
        fs::write(self.record_path(&sighting.id), encoded)?;
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<Sighting>> {
        let path = self.record_path(id);
        if !path.exists() {
            return Ok(None);
        }
        let data = fs::read(path)?;
        let sighting = bincode::deserialize(&data)
            .map_err(|e| EngineError::Storage(format!("Failed to deserialize sighting: {}", e)))?;
        Ok(Some(sighting))
    }

    fn recorded_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<Sighting>> {
        let mut sightings = self.load_all()?;
        sightings.retain(|s| s.timestamp >= cutoff);
        Ok(sightings)
    }

    fn recorded_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<Sighting>> {
        let mut sightings = self.load_all()?;
        sightings.retain(|s| s.timestamp >= start && s.timestamp <= end);
        Ok(sightings)
    }

    fn page_desc(&self, page: usize, limit: usize) -> Result<Vec<Sighting>> {
        let mut sightings = self.load_all()?;
        sightings.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        let skip = page.saturating_sub(1).saturating_mul(limit);
        Ok(sightings.into_iter().skip(skip).take(limit).collect())
    }

    fn count(&self) -> Result<usize> {
        Ok(self.load_all()?.len())
    }
}

/// In-memory trail in append order; the reference backend for tests.
#[derive(Default)]
pub struct MemorySightingStore {
    records: RwLock<Vec<Sighting>>,
}

impl MemorySightingStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn snapshot(&self) -> Result<Vec<Sighting>> {
        let records = self
            .records
            .read()
            .map_err(|_| EngineError::Storage("Sighting store lock poisoned".into()))?;
        Ok(records.clone())
    }
}

impl SightingStore for MemorySightingStore {
    fn append(&self, sighting: &Sighting) -> Result<()> {
        let mut records = self
            .records
            .write()
            .map_err(|_| EngineError::Storage("Sighting store lock poisoned".into()))?;
        records.push(sighting.clone());
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<Sighting>> {
        Ok(self.snapshot()?.into_iter().find(|s| s.id == id))
    }

    fn recorded_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<Sighting>> {
        let mut sightings = self.snapshot()?;
        sightings.retain(|s| s.timestamp >= cutoff);
        Ok(sightings)
    }

    fn recorded_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<Sighting>> {
        let mut sightings = self.snapshot()?;
        sightings.retain(|s| s.timestamp >= start && s.timestamp <= end);
        Ok(sightings)
    }

    fn page_desc(&self, page: usize, limit: usize) -> Result<Vec<Sighting>> {
        let mut sightings = self.snapshot()?;
        sightings.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        let skip = page.saturating_sub(1).saturating_mul(limit);
        Ok(sightings.into_iter().skip(skip).take(limit).collect())
    }

    fn count(&self) -> Result<usize> {
        Ok(self.snapshot()?.len())
    }
}
