use crate::common::error::{EngineError, Result};
use crate::core::embedding::Embedding;
use crate::service::protocol::DetectionReport;
use crate::storage::identity_store::EnrollmentMetadata;
use crate::storage::{
    new_record_id, Identity, IdentityStore, Severity, WatchlistEntry, WatchlistStore,
    WatchlistType,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Requested security classification for an identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchlistSpec {
    #[serde(rename = "type")]
    pub kind: WatchlistType,
    #[serde(default)]
    pub severity: Option<Severity>,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub name: String,
    pub embedding: Embedding,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub source_image: Option<String>,
    #[serde(default)]
    pub watchlist: Option<WatchlistSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct IdentityUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub watchlist: Option<WatchlistSpec>,
}

/// Identity listing row for dashboards; embeddings stay out of it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityOverview {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub user_id: Option<String>,
    pub created_at: chrono::DateTime<Utc>,
    #[serde(default)]
    pub watchlist: Option<WatchlistStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchlistStatus {
    #[serde(rename = "type")]
    pub kind: WatchlistType,
    pub severity: Severity,
    pub notes: String,
}

/// Which steps of the purge saga completed. `identity_removed` false means
/// the id was not enrolled; `watchlist_removed` false with
/// `watchlist_cleanup_failed` true means an inactive orphan was left behind
/// for `reconcile` to collect.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurgeOutcome {
    pub identity_removed: bool,
    pub watchlist_removed: bool,
    pub watchlist_cleanup_failed: bool,
}

/// Create/rename/reclassify/purge operations over the Identity and
/// Watchlist stores. Mutations are single-record atomic; multi-store
/// operations are sagas, not transactions.
pub struct Registry {
    identities: Arc<dyn IdentityStore>,
    watchlist: Arc<dyn WatchlistStore>,
    embedding_dim: Option<usize>,
}

impl Registry {
    pub fn new(
        identities: Arc<dyn IdentityStore>,
        watchlist: Arc<dyn WatchlistStore>,
        embedding_dim: Option<usize>,
    ) -> Self {
        Self {
            identities,
            watchlist,
            embedding_dim,
        }
    }

    fn validate_embedding(&self, embedding: &[f32]) -> Result<()> {
        if embedding.is_empty() {
            return Err(EngineError::InvalidInput(
                "Embedding must not be empty".into(),
            ));
        }
        if let Some(dim) = self.embedding_dim {
            if embedding.len() != dim {
                return Err(EngineError::InvalidInput(format!(
                    "Embedding dimension {} does not match deployment dimension {}",
                    embedding.len(),
                    dim
                )));
            }
        }
        Ok(())
    }

    /// Enrolls a new identity and, when requested, its watchlist entry.
    /// The two writes are independent single-record operations.
    pub fn register(&self, registration: Registration) -> Result<Identity> {
        self.validate_embedding(&registration.embedding)?;

        let identity = Identity {
            id: new_record_id(),
            name: registration.name,
            embedding: registration.embedding,
            user_id: registration.user_id,
            metadata: EnrollmentMetadata {
                source_image: registration.source_image,
                confidence: None,
            },
            created_at: Utc::now(),
        };
        self.identities.save(&identity)?;
        tracing::info!(id = %identity.id, name = %identity.name, "Identity registered");

        if let Some(spec) = registration.watchlist {
            self.apply_watchlist(&identity.id, spec)?;
        }

        Ok(identity)
    }

    /// Registration from a worker detection report; the enrollment image
    /// must contain exactly one clear face.
    pub fn register_from_report(
        &self,
        name: &str,
        report: &DetectionReport,
        user_id: Option<String>,
        watchlist: Option<WatchlistSpec>,
    ) -> Result<Identity> {
        let embedding = report.single_clear_probe()?.clone();
        self.register(Registration {
            name: name.to_string(),
            embedding,
            user_id,
            source_image: None,
            watchlist,
        })
    }

    pub fn get(&self, id: &str) -> Result<Identity> {
        self.identities.get(id)
    }

    /// All identities, without embeddings, enriched with watchlist status.
    pub fn list(&self) -> Result<Vec<IdentityOverview>> {
        let mut overviews = Vec::new();
        for identity in self.identities.all()? {
            let watchlist = self.watchlist.get(&identity.id)?.map(|entry| WatchlistStatus {
                kind: entry.kind,
                severity: entry.severity,
                notes: entry.notes,
            });
            overviews.push(IdentityOverview {
                id: identity.id,
                name: identity.name,
                user_id: identity.user_id,
                created_at: identity.created_at,
                watchlist,
            });
        }
        Ok(overviews)
    }

    /// Rename and/or reclassify. Two single-record steps; a failure between
    /// them leaves the rename applied without the reclassification.
    pub fn update(&self, id: &str, update: IdentityUpdate) -> Result<Identity> {
        let mut identity = self.identities.get(id)?;

        if let Some(name) = update.name {
            identity.name = name;
            self.identities.save(&identity)?;
        }

        if let Some(spec) = update.watchlist {
            self.apply_watchlist(id, spec)?;
        }

        Ok(identity)
    }

    fn apply_watchlist(&self, identity_id: &str, spec: WatchlistSpec) -> Result<()> {
        let entry = WatchlistEntry {
            identity_id: identity_id.to_string(),
            kind: spec.kind,
            severity: spec.severity.unwrap_or_default(),
            nickname: spec.nickname,
            notes: spec.notes.unwrap_or_default(),
            is_active: true,
            created_at: Utc::now(),
        };
        self.watchlist.upsert(&entry)?;
        tracing::info!(identity_id, kind = %entry.kind, "Watchlist classification applied");
        Ok(())
    }

    /// Purge saga: deactivate the watchlist entry, delete the identity,
    /// delete the entry. Deactivating first means a partial failure leaves
    /// at worst an inactive orphan that can never fire an alert. Sightings
    /// are never touched; their snapshots outlive the identity.
    pub fn purge(&self, id: &str) -> Result<PurgeOutcome> {
        if let Ok(Some(mut entry)) = self.watchlist.get(id) {
            entry.is_active = false;
            if let Err(e) = self.watchlist.upsert(&entry) {
                tracing::warn!(identity_id = id, "Watchlist deactivation failed: {}", e);
            }
        }

        let identity_removed = self.identities.remove(id)?;

        let (watchlist_removed, watchlist_cleanup_failed) = match self.watchlist.remove(id) {
            Ok(removed) => (removed, false),
            Err(e) => {
                tracing::warn!(
                    identity_id = id,
                    "Watchlist cleanup failed, orphan left for reconcile: {}",
                    e
                );
                (false, true)
            }
        };

        tracing::info!(
            identity_id = id,
            identity_removed,
            watchlist_removed,
            "Identity purged"
        );
        Ok(PurgeOutcome {
            identity_removed,
            watchlist_removed,
            watchlist_cleanup_failed,
        })
    }

    /// Repair rule for interrupted purges: drop watchlist entries whose
    /// identity no longer exists. Invoked explicitly; the engine runs no
    /// background sweeps.
    pub fn reconcile(&self) -> Result<usize> {
        let mut removed = 0;
        for entry in self.watchlist.all()? {
            match self.identities.get(&entry.identity_id) {
                Err(EngineError::IdentityNotFound(_)) => {
                    if self.watchlist.remove(&entry.identity_id)? {
                        removed += 1;
                    }
                }
                Err(e) => return Err(e),
                Ok(_) => {}
            }
        }
        if removed > 0 {
            tracing::info!(removed, "Reconciled orphaned watchlist entries");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryIdentityStore, MemoryWatchlistStore};

    fn registry() -> Registry {
        Registry::new(
            Arc::new(MemoryIdentityStore::new()),
            Arc::new(MemoryWatchlistStore::new()),
            None,
        )
    }

    fn registration(name: &str, watchlist: Option<WatchlistSpec>) -> Registration {
        Registration {
            name: name.to_string(),
            embedding: vec![0.1, 0.2, 0.3],
            user_id: None,
            source_image: None,
            watchlist,
        }
    }

    fn blacklist_spec() -> WatchlistSpec {
        WatchlistSpec {
            kind: WatchlistType::Blacklist,
            severity: Some(Severity::Critical),
            nickname: None,
            notes: Some("restricted".to_string()),
        }
    }

    #[test]
    fn register_rejects_empty_embeddings() {
        let registry = registry();
        let mut reg = registration("Alice", None);
        reg.embedding = vec![];
        assert!(matches!(
            registry.register(reg),
            Err(EngineError::InvalidInput(_))
        ));
    }

    #[test]
    fn pinned_dimension_rejects_mismatched_enrollment() {
        let registry = Registry::new(
            Arc::new(MemoryIdentityStore::new()),
            Arc::new(MemoryWatchlistStore::new()),
            Some(512),
        );
        assert!(matches!(
            registry.register(registration("Alice", None)),
            Err(EngineError::InvalidInput(_))
        ));
    }

    #[test]
    fn register_with_watchlist_creates_active_entry() {
        let registry = registry();
        let identity = registry
            .register(registration("Alice", Some(blacklist_spec())))
            .unwrap();

        let listed = registry.list().unwrap();
        assert_eq!(listed.len(), 1);
        let status = listed[0].watchlist.as_ref().unwrap();
        assert_eq!(status.kind, WatchlistType::Blacklist);
        assert_eq!(status.severity, Severity::Critical);

        let entry = registry.watchlist.get(&identity.id).unwrap().unwrap();
        assert!(entry.is_active);
    }

    #[test]
    fn severity_defaults_to_medium() {
        let registry = registry();
        let spec = WatchlistSpec {
            kind: WatchlistType::Staff,
            severity: None,
            nickname: None,
            notes: None,
        };
        let identity = registry
            .register(registration("Bob", Some(spec)))
            .unwrap();
        let entry = registry.watchlist.get(&identity.id).unwrap().unwrap();
        assert_eq!(entry.severity, Severity::Medium);
    }

    #[test]
    fn register_from_report_requires_one_clear_face() {
        use crate::service::protocol::{DetectionReport, FaceEntry};

        let registry = registry();
        let crowded = DetectionReport {
            face_detected: true,
            total_faces: 2,
            faces: vec![
                FaceEntry {
                    embedding: vec![1.0, 0.0],
                    ..FaceEntry::default()
                },
                FaceEntry {
                    embedding: vec![0.0, 1.0],
                    ..FaceEntry::default()
                },
            ],
        };
        assert!(matches!(
            registry.register_from_report("Alice", &crowded, None, None),
            Err(EngineError::InvalidInput(_))
        ));

        let clear = DetectionReport {
            face_detected: true,
            total_faces: 1,
            faces: vec![FaceEntry {
                embedding: vec![1.0, 0.0],
                ..FaceEntry::default()
            }],
        };
        let identity = registry
            .register_from_report("Alice", &clear, Some("user-7".to_string()), None)
            .unwrap();
        assert_eq!(identity.embedding, vec![1.0, 0.0]);
        assert_eq!(identity.user_id.as_deref(), Some("user-7"));
    }

    #[test]
    fn update_renames_and_reclassifies() {
        let registry = registry();
        let identity = registry.register(registration("Alice", None)).unwrap();

        let updated = registry
            .update(
                &identity.id,
                IdentityUpdate {
                    name: Some("Alice Prime".to_string()),
                    watchlist: Some(blacklist_spec()),
                },
            )
            .unwrap();

        assert_eq!(updated.name, "Alice Prime");
        assert_eq!(registry.get(&identity.id).unwrap().name, "Alice Prime");
        assert!(registry.watchlist.get_active(&identity.id).unwrap().is_some());
    }

    #[test]
    fn update_of_missing_identity_fails() {
        let registry = registry();
        assert!(matches!(
            registry.update("missing", IdentityUpdate::default()),
            Err(EngineError::IdentityNotFound(_))
        ));
    }

    #[test]
    fn purge_removes_identity_and_watchlist_entry() {
        let registry = registry();
        let identity = registry
            .register(registration("Alice", Some(blacklist_spec())))
            .unwrap();

        let outcome = registry.purge(&identity.id).unwrap();
        assert!(outcome.identity_removed);
        assert!(outcome.watchlist_removed);
        assert!(!outcome.watchlist_cleanup_failed);

        assert!(matches!(
            registry.get(&identity.id),
            Err(EngineError::IdentityNotFound(_))
        ));
        assert!(registry.watchlist.get(&identity.id).unwrap().is_none());
    }

    #[test]
    fn purge_of_unknown_id_reports_nothing_removed() {
        let registry = registry();
        let outcome = registry.purge("missing").unwrap();
        assert!(!outcome.identity_removed);
        assert!(!outcome.watchlist_removed);
    }

    #[test]
    fn reconcile_collects_orphaned_entries() {
        let identities = Arc::new(MemoryIdentityStore::new());
        let watchlist = Arc::new(MemoryWatchlistStore::new());
        let registry = Registry::new(identities, watchlist.clone(), None);

        // An orphan, as an interrupted purge would leave it.
        watchlist
            .upsert(&WatchlistEntry {
                identity_id: "gone".to_string(),
                kind: WatchlistType::Vip,
                severity: Severity::Low,
                nickname: None,
                notes: String::new(),
                is_active: false,
                created_at: Utc::now(),
            })
            .unwrap();

        // A healthy classification that must survive.
        let kept = registry
            .register(registration("Alice", Some(blacklist_spec())))
            .unwrap();

        assert_eq!(registry.reconcile().unwrap(), 1);
        assert!(watchlist.get("gone").unwrap().is_none());
        assert!(watchlist.get(&kept.id).unwrap().is_some());
    }
}
