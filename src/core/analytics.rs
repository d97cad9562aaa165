use crate::common::error::Result;
use crate::storage::{Sighting, SightingStore};
use chrono::{DateTime, Duration, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: usize,
    pub page: usize,
    pub limit: usize,
    pub total_pages: usize,
}

impl Pagination {
    fn new(total: usize, page: usize, limit: usize) -> Self {
        Self {
            total,
            page,
            limit,
            total_pages: total.div_ceil(limit.max(1)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPage {
    pub history: Vec<Sighting>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DemographicBucket {
    pub gender: Option<String>,
    pub age: Option<String>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EmotionTrendPoint {
    pub hour: u32,
    pub emotion: String,
    pub count: usize,
}

/// Trailing-24h intelligence summary for the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvancedStats {
    pub total_sightings_24h: usize,
    pub unique_identities: usize,
    pub demographics: Vec<DemographicBucket>,
    pub trends: Vec<EmotionTrendPoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NameSummary {
    pub name: String,
    pub count: usize,
    pub avg_confidence: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportData {
    pub logs: Vec<Sighting>,
    pub summary: Vec<NameSummary>,
    pub pagination: Pagination,
}

/// Read-only aggregation over the audit trail. Export formatting (CSV/PDF)
/// belongs to downstream collaborators; this produces the data they read.
pub struct AnalyticsEngine {
    store: Arc<dyn SightingStore>,
}

impl AnalyticsEngine {
    pub fn new(store: Arc<dyn SightingStore>) -> Self {
        Self { store }
    }

    /// Sightings newest-first, 1-based pages.
    pub fn history(&self, page: usize, limit: usize) -> Result<HistoryPage> {
        let history = self.store.page_desc(page, limit)?;
        let total = self.store.count()?;
        Ok(HistoryPage {
            history,
            pagination: Pagination::new(total, page, limit),
        })
    }

    pub fn advanced_stats(&self) -> Result<AdvancedStats> {
        self.advanced_stats_at(Utc::now())
    }

    pub fn advanced_stats_at(&self, now: DateTime<Utc>) -> Result<AdvancedStats> {
        let recent = self.store.recorded_since(now - Duration::hours(24))?;

        let mut names: Vec<&str> = recent.iter().map(|s| s.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        let unique_identities = names.len();

        let mut demographic_counts: HashMap<(Option<String>, Option<String>), usize> =
            HashMap::new();
        for sighting in &recent {
            let key = (
                sighting.demographics.gender.clone(),
                sighting.demographics.age.clone(),
            );
            *demographic_counts.entry(key).or_default() += 1;
        }
        let mut demographics: Vec<DemographicBucket> = demographic_counts
            .into_iter()
            .map(|((gender, age), count)| DemographicBucket { gender, age, count })
            .collect();
        demographics.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| a.gender.cmp(&b.gender))
                .then_with(|| a.age.cmp(&b.age))
        });

        let mut trend_counts: HashMap<(u32, String), usize> = HashMap::new();
        for sighting in &recent {
            let key = (sighting.timestamp.hour(), sighting.dominant_emotion.clone());
            *trend_counts.entry(key).or_default() += 1;
        }
        let mut trends: Vec<EmotionTrendPoint> = trend_counts
            .into_iter()
            .map(|((hour, emotion), count)| EmotionTrendPoint {
                hour,
                emotion,
                count,
            })
            .collect();
        trends.sort_by(|a, b| a.hour.cmp(&b.hour).then_with(|| a.emotion.cmp(&b.emotion)));

        Ok(AdvancedStats {
            total_sightings_24h: recent.len(),
            unique_identities,
            demographics,
            trends,
        })
    }

    /// Date-range listing plus a per-name summary sorted by sighting count.
    pub fn report(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        page: usize,
        limit: usize,
    ) -> Result<ReportData> {
        let mut in_range = self.store.recorded_between(start, end)?;
        in_range.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        let total = in_range.len();

        let mut grouped: HashMap<String, (usize, f32)> = HashMap::new();
        for sighting in &in_range {
            let slot = grouped.entry(sighting.name.clone()).or_insert((0, 0.0));
            slot.0 += 1;
            slot.1 += sighting.confidence;
        }
        let mut summary: Vec<NameSummary> = grouped
            .into_iter()
            .map(|(name, (count, confidence_sum))| NameSummary {
                name,
                count,
                avg_confidence: confidence_sum / count as f32,
            })
            .collect();
        summary.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));

        let skip = page.saturating_sub(1).saturating_mul(limit);
        let logs = in_range.into_iter().skip(skip).take(limit).collect();

        Ok(ReportData {
            logs,
            summary,
            pagination: Pagination::new(total, page, limit),
        })
    }
}
