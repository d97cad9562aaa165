use crate::common::error::Result;
use crate::core::embedding::cosine_similarity;
use crate::storage::IdentityStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const UNKNOWN_NAME: &str = "Unknown";

/// Outcome of matching a probe against the identity registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    pub name: String,
    pub confidence: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_id: Option<String>,
}

impl Resolution {
    pub fn unknown() -> Self {
        Self {
            name: UNKNOWN_NAME.to_string(),
            confidence: 0.0,
            identity_id: None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.identity_id.is_none()
    }
}

/// Real-time identity matching: exhaustive cosine scan of every enrolled
/// embedding, O(N) per probe. Read-only; degenerate probes resolve to
/// Unknown instead of erroring.
pub struct IdentityResolver {
    store: Arc<dyn IdentityStore>,
    threshold: f32,
}

impl IdentityResolver {
    pub fn new(store: Arc<dyn IdentityStore>, threshold: f32) -> Self {
        Self { store, threshold }
    }

    /// Best match strictly above the threshold, or Unknown. Ties keep the
    /// first maximum in registry iteration order.
    pub fn resolve(&self, probe: &[f32]) -> Result<Resolution> {
        let mut best = Resolution::unknown();

        for identity in self.store.all()? {
            let similarity = cosine_similarity(probe, &identity.embedding);
            if similarity > self.threshold && similarity > best.confidence {
                best = Resolution {
                    name: identity.name,
                    confidence: similarity,
                    identity_id: Some(identity.id),
                };
            }
        }

        tracing::debug!(
            name = %best.name,
            confidence = best.confidence,
            "Probe resolved"
        );
        Ok(best)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::identity_store::EnrollmentMetadata;
    use crate::storage::{Identity, MemoryIdentityStore};
    use chrono::Utc;

    fn store_with(embeddings: Vec<(&str, Vec<f32>)>) -> Arc<MemoryIdentityStore> {
        let store = Arc::new(MemoryIdentityStore::new());
        for (i, (name, embedding)) in embeddings.into_iter().enumerate() {
            store
                .save(&Identity {
                    id: format!("id-{}", i),
                    name: name.to_string(),
                    embedding,
                    user_id: None,
                    metadata: EnrollmentMetadata::default(),
                    created_at: Utc::now(),
                })
                .unwrap();
        }
        store
    }

    /// Unit vector at `cos` similarity to the probe [1, 0].
    fn at_similarity(cos: f32) -> Vec<f32> {
        vec![cos, (1.0 - cos * cos).sqrt()]
    }

    #[test]
    fn empty_registry_resolves_to_unknown() {
        let resolver = IdentityResolver::new(store_with(vec![]), 0.6);
        let resolution = resolver.resolve(&[1.0, 0.0]).unwrap();
        assert_eq!(resolution.name, UNKNOWN_NAME);
        assert_eq!(resolution.confidence, 0.0);
        assert!(resolution.identity_id.is_none());
    }

    #[test]
    fn threshold_is_exclusive_at_the_boundary() {
        let resolver =
            IdentityResolver::new(store_with(vec![("Near", at_similarity(0.61))]), 0.6);
        let resolution = resolver.resolve(&[1.0, 0.0]).unwrap();
        assert_eq!(resolution.name, "Near");
        assert!((resolution.confidence - 0.61).abs() < 1e-3);

        let resolver =
            IdentityResolver::new(store_with(vec![("Far", at_similarity(0.59))]), 0.6);
        let resolution = resolver.resolve(&[1.0, 0.0]).unwrap();
        assert_eq!(resolution.name, UNKNOWN_NAME);
    }

    #[test]
    fn best_of_several_candidates_wins() {
        let store = store_with(vec![
            ("Close", at_similarity(0.7)),
            ("Closest", at_similarity(0.95)),
            ("Also close", at_similarity(0.8)),
        ]);
        let resolver = IdentityResolver::new(store, 0.6);
        let resolution = resolver.resolve(&[1.0, 0.0]).unwrap();
        assert_eq!(resolution.name, "Closest");
        assert_eq!(resolution.identity_id.as_deref(), Some("id-1"));
    }

    #[test]
    fn ties_keep_the_first_candidate_scanned() {
        let store = store_with(vec![
            ("First", at_similarity(0.8)),
            ("Second", at_similarity(0.8)),
        ]);
        let resolver = IdentityResolver::new(store, 0.6);
        assert_eq!(resolver.resolve(&[1.0, 0.0]).unwrap().name, "First");
    }

    #[test]
    fn dimension_mismatch_resolves_to_unknown_without_error() {
        let resolver =
            IdentityResolver::new(store_with(vec![("Wide", vec![1.0, 0.0, 0.0])]), 0.6);
        let resolution = resolver.resolve(&[1.0, 0.0]).unwrap();
        assert_eq!(resolution.name, UNKNOWN_NAME);
    }

    #[test]
    fn exact_enrollment_match_has_full_confidence() {
        let resolver =
            IdentityResolver::new(store_with(vec![("Alice", vec![0.2, 0.5, 0.8])]), 0.6);
        let resolution = resolver.resolve(&[0.2, 0.5, 0.8]).unwrap();
        assert_eq!(resolution.name, "Alice");
        assert!((resolution.confidence - 1.0).abs() < 1e-6);
    }
}
