use crate::common::config::SearchConfig;
use crate::common::error::{EngineError, Result};
use crate::core::embedding::cosine_similarity;
use crate::storage::{Sighting, SightingStore};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;

/// A sighting paired with its similarity to the probe. The similarity is
/// computed per search and never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SightingMatch {
    #[serde(flatten)]
    pub sighting: Sighting,
    pub similarity: f32,
}

/// Retrospective identity matching over the audit trail: exhaustive cosine
/// scan of every sighting inside the retention window. Scan cost is bounded
/// by the window, not by similarity.
pub struct ForensicSearchEngine {
    store: Arc<dyn SightingStore>,
    config: SearchConfig,
}

impl ForensicSearchEngine {
    pub fn new(store: Arc<dyn SightingStore>, config: SearchConfig) -> Self {
        Self { store, config }
    }

    /// Search with the configured threshold and limit.
    pub fn search(&self, probe: &[f32]) -> Result<Vec<SightingMatch>> {
        self.search_with(probe, self.config.threshold, self.config.limit)
    }

    pub fn search_with(
        &self,
        probe: &[f32],
        threshold: f32,
        limit: usize,
    ) -> Result<Vec<SightingMatch>> {
        self.search_at(Utc::now(), probe, threshold, limit)
    }

    /// `now` is injectable so the window boundary is testable.
    pub fn search_at(
        &self,
        now: DateTime<Utc>,
        probe: &[f32],
        threshold: f32,
        limit: usize,
    ) -> Result<Vec<SightingMatch>> {
        if probe.is_empty() {
            return Err(EngineError::InvalidInput(
                "Forensic search requires a probe embedding".into(),
            ));
        }

        let cutoff = now - Duration::days(self.config.window_days);
        let in_window = self.store.recorded_since(cutoff)?;
        let scanned = in_window.len();

        let mut matches: Vec<SightingMatch> = in_window
            .into_iter()
            .map(|sighting| {
                let similarity = cosine_similarity(probe, &sighting.embedding);
                SightingMatch {
                    sighting,
                    similarity,
                }
            })
            .filter(|m| m.similarity > threshold)
            .collect();

        matches.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(Ordering::Equal)
        });
        matches.truncate(limit);

        tracing::debug!(
            scanned,
            matched = matches.len(),
            threshold,
            "Forensic scan complete"
        );
        Ok(matches)
    }
}
