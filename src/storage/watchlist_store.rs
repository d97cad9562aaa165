use crate::common::error::{EngineError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WatchlistType {
    #[serde(rename = "VIP")]
    Vip,
    Blacklist,
    Unauthorized,
    Staff,
}

impl std::fmt::Display for WatchlistType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            WatchlistType::Vip => "VIP",
            WatchlistType::Blacklist => "Blacklist",
            WatchlistType::Unauthorized => "Unauthorized",
            WatchlistType::Staff => "Staff",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for WatchlistType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "VIP" | "vip" => Ok(WatchlistType::Vip),
            "Blacklist" | "blacklist" => Ok(WatchlistType::Blacklist),
            "Unauthorized" | "unauthorized" => Ok(WatchlistType::Unauthorized),
            "Staff" | "staff" => Ok(WatchlistType::Staff),
            other => Err(EngineError::InvalidInput(format!(
                "Unknown watchlist type: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Severity {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::High => "High",
            Severity::Critical => "Critical",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Severity {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Low" | "low" => Ok(Severity::Low),
            "Medium" | "medium" => Ok(Severity::Medium),
            "High" | "high" => Ok(Severity::High),
            "Critical" | "critical" => Ok(Severity::Critical),
            other => Err(EngineError::InvalidInput(format!(
                "Unknown severity: {}",
                other
            ))),
        }
    }
}

/// Security classification for one enrolled identity. Keyed by identity id,
/// at most one entry per identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WatchlistEntry {
    pub identity_id: String,
    #[serde(rename = "type")]
    pub kind: WatchlistType,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub notes: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

pub trait WatchlistStore: Send + Sync {
    /// Insert or replace the entry for its identity.
    fn upsert(&self, entry: &WatchlistEntry) -> Result<()>;
    fn get(&self, identity_id: &str) -> Result<Option<WatchlistEntry>>;
    fn all(&self) -> Result<Vec<WatchlistEntry>>;
    /// Returns false when no entry existed for the identity.
    fn remove(&self, identity_id: &str) -> Result<bool>;

    fn get_active(&self, identity_id: &str) -> Result<Option<WatchlistEntry>> {
        Ok(self.get(identity_id)?.filter(|entry| entry.is_active))
    }
}

/// One bincode file per entry, named by identity id.
pub struct FileWatchlistStore {
    data_dir: PathBuf,
}

impl FileWatchlistStore {
    pub fn open(data_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&data_dir)?;
        Ok(Self { data_dir })
    }

    pub fn open_default() -> Result<Self> {
        Self::open(super::default_data_dir()?.join("watchlist"))
    }

    fn record_path(&self, identity_id: &str) -> PathBuf {
        self.data_dir.join(format!("{}.bincode", identity_id))
    }
}

impl WatchlistStore for FileWatchlistStore {
    fn upsert(&self, entry: &WatchlistEntry) -> Result<()> {
        let encoded = bincode::serialize(entry).map_err(|e| {
            EngineError::Storage(format!("Failed to serialize watchlist entry: {}", e))
        })?;
        fs::write(self.record_path(&entry.identity_id), encoded)?;
        Ok(())
    }

    fn get(&self, identity_id: &str) -> Result<Option<WatchlistEntry>> {
        let path = self.record_path(identity_id);
        if !path.exists() {
            return Ok(None);
        }

        let data = fs::read(path)?;
        let entry = bincode::deserialize(&data).map_err(|e| {
            EngineError::Storage(format!("Failed to deserialize watchlist entry: {}", e))
        })?;
        Ok(Some(entry))
    }

    fn all(&self) -> Result<Vec<WatchlistEntry>> {
        let mut entries = Vec::new();
        for dir_entry in fs::read_dir(&self.data_dir)? {
            let path = dir_entry?.path();
            if path.extension().map_or(false, |ext| ext == "bincode") {
                let data = fs::read(&path)?;
                let entry = bincode::deserialize(&data).map_err(|e| {
                    EngineError::Storage(format!(
                        "Failed to deserialize watchlist entry {:?}: {}",
                        path, e
                    ))
                })?;
                entries.push(entry);
            }
        }
        Ok(entries)
    }

    fn remove(&self, identity_id: &str) -> Result<bool> {
        let path = self.record_path(identity_id);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(path)?;
        Ok(true)
    }
}

#[derive(Default)]
pub struct MemoryWatchlistStore {
    records: RwLock<HashMap<String, WatchlistEntry>>,
}

impl MemoryWatchlistStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WatchlistStore for MemoryWatchlistStore {
    fn upsert(&self, entry: &WatchlistEntry) -> Result<()> {
        let mut records = self
            .records
            .write()
            .map_err(|_| EngineError::Storage("Watchlist store lock poisoned".into()))?;
        records.insert(entry.identity_id.clone(), entry.clone());
        Ok(())
    }

    fn get(&self, identity_id: &str) -> Result<Option<WatchlistEntry>> {
        let records = self
            .records
            .read()
            .map_err(|_| EngineError::Storage("Watchlist store lock poisoned".into()))?;
        Ok(records.get(identity_id).cloned())
    }

    fn all(&self) -> Result<Vec<WatchlistEntry>> {
        let records = self
            .records
            .read()
            .map_err(|_| EngineError::Storage("Watchlist store lock poisoned".into()))?;
        Ok(records.values().cloned().collect())
    }

    fn remove(&self, identity_id: &str) -> Result<bool> {
        let mut records = self
            .records
            .write()
            .map_err(|_| EngineError::Storage("Watchlist store lock poisoned".into()))?;
        Ok(records.remove(identity_id).is_some())
    }
}
