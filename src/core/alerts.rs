use crate::storage::{Severity, WatchlistStore, WatchlistType};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const BLACKLIST_MESSAGE: &str = "CRITICAL: Unauthorized Access Detected";
pub const PROFILE_MESSAGE: &str = "VIP: Identified Profile Detected";

/// Alert attached to a face entry when the resolved identity is watchlisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AlertDescriptor {
    #[serde(rename = "type")]
    pub kind: WatchlistType,
    pub severity: Severity,
    pub message: String,
    pub notes: String,
}

/// Maps a resolved identity to its watchlist alert, if any. Blacklist gets
/// the critical wording; every other active type shares the informational
/// "VIP" wording. That conflation matches the deployed behavior and is
/// pinned by tests.
pub struct AlertDispatcher {
    store: Arc<dyn WatchlistStore>,
}

impl AlertDispatcher {
    pub fn new(store: Arc<dyn WatchlistStore>) -> Self {
        Self { store }
    }

    /// None for unresolved probes, unlisted identities, inactive entries,
    /// and store failures. The live path never fails on a watchlist lookup.
    pub fn dispatch(&self, identity_id: Option<&str>) -> Option<AlertDescriptor> {
        let identity_id = identity_id?;

        match self.store.get_active(identity_id) {
            Ok(Some(entry)) => {
                let message = match entry.kind {
                    WatchlistType::Blacklist => BLACKLIST_MESSAGE,
                    _ => PROFILE_MESSAGE,
                };
                Some(AlertDescriptor {
                    kind: entry.kind,
                    severity: entry.severity,
                    message: message.to_string(),
                    notes: entry.notes,
                })
            }
            Ok(None) => None,
            Err(e) => {
                tracing::error!("Watchlist check error: {}", e);
                None
            }
        }
    }
}
