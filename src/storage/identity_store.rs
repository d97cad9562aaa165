use crate::common::error::{EngineError, Result};
use crate::core::embedding::Embedding;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::RwLock;

/// An enrolled person. The embedding is the one captured at enrollment;
/// sightings carry their own frozen copies and never read back through here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: String,
    pub name: String,
    pub embedding: Embedding,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub metadata: EnrollmentMetadata,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentMetadata {
    #[serde(default)]
    pub source_image: Option<String>,
    #[serde(default)]
    pub confidence: Option<f32>,
}

/// Durable registry of enrolled identities. All operations are
/// single-record atomic; iteration order is backend-defined.
pub trait IdentityStore: Send + Sync {
    /// Insert or overwrite by id.
    fn save(&self, identity: &Identity) -> Result<()>;
    fn get(&self, id: &str) -> Result<Identity>;
    fn all(&self) -> Result<Vec<Identity>>;
    /// Returns false when the id was not present.
    fn remove(&self, id: &str) -> Result<bool>;
}

/// One bincode file per identity under `data_dir`.
pub struct FileIdentityStore {
    data_dir: PathBuf,
}

impl FileIdentityStore {
    pub fn open(data_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&data_dir)?;
        Ok(Self { data_dir })
    }

    pub fn open_default() -> Result<Self> {
        Self::open(super::default_data_dir()?.join("identities"))
    }

    fn record_path(&self, id: &str) -> PathBuf {
        self.data_dir.join(format!("{}.bincode", id))
    }
}

impl IdentityStore for FileIdentityStore {
    fn save(&self, identity: &Identity) -> Result<()> {
        let encoded = bincode::serialize(identity)
            .map_err(|e| EngineError::Storage(format!("Failed to serialize identity: {}", e)))?;
        fs::write(self.record_path(&identity.id), encoded)?;
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Identity> {
        let path = self.record_path(id);
        if !path.exists() {
            return Err(EngineError::IdentityNotFound(id.to_string()));
        }

        let data = fs::read(path)?;
        bincode::deserialize(&data)
            .map_err(|e| EngineError::Storage(format!("Failed to deserialize identity: {}", e)))
    }

    fn all(&self) -> Result<Vec<Identity>> {
        let mut identities = Vec::new();
        for entry in fs::read_dir(&self.data_dir)? {
            let path = entry?.path();
            if path.extension().map_or(false, |ext| ext == "bincode") {
                let data = fs::read(&path)?;
                let identity = bincode::deserialize(&data).map_err(|e| {
                    EngineError::Storage(format!(
                        "Failed to deserialize identity {:?}: {}",
                        path, e
                    ))
                })?;
                identities.push(identity);
            }
        }
        Ok(identities)
    }

    fn remove(&self, id: &str) -> Result<bool> {
        let path = self.record_path(id);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(path)?;
        Ok(true)
    }
}

/// Insertion-ordered in-memory registry; the exact-scan reference backend.
#[derive(Default)]
pub struct MemoryIdentityStore {
    records: RwLock<Vec<Identity>>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdentityStore for MemoryIdentityStore {
    fn save(&self, identity: &Identity) -> Result<()> {
        let mut records = self
            .records
            .write()
            .map_err(|_| EngineError::Storage("Identity store lock poisoned".into()))?;
        match records.iter_mut().find(|r| r.id == identity.id) {
            Some(existing) => *existing = identity.clone(),
            None => records.push(identity.clone()),
        }
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Identity> {
        let records = self
            .records
            .read()
            .map_err(|_| EngineError::Storage("Identity store lock poisoned".into()))?;
        records
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| EngineError::IdentityNotFound(id.to_string()))
    }

    fn all(&self) -> Result<Vec<Identity>> {
        let records = self
            .records
            .read()
            .map_err(|_| EngineError::Storage("Identity store lock poisoned".into()))?;
        Ok(records.clone())
    }

    fn remove(&self, id: &str) -> Result<bool> {
        let mut records = self
            .records
            .write()
            .map_err(|_| EngineError::Storage("Identity store lock poisoned".into()))?;
        let before = records.len();
        records.retain(|r| r.id != id);
        Ok(records.len() < before)
    }
}
