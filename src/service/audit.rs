use crate::common::config::AuditConfig;
use crate::common::error::Result;
use crate::service::protocol::FaceEntry;
use crate::storage::{new_record_id, Sighting, SightingStore};
use chrono::Utc;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::sync::Arc;
use std::thread::JoinHandle;

pub const GUEST_NAME: &str = "Guest";
pub const NEUTRAL_EMOTION: &str = "Neutral";

/// Builds the persisted sighting for a face entry, applying the Guest and
/// Neutral defaults. The embedding snapshot is copied here and never read
/// back from the identity registry.
pub fn sighting_from_entry(entry: &FaceEntry) -> Sighting {
    let (identity_id, name) = match &entry.identity {
        Some(resolution) if resolution.identity_id.is_some() => (
            resolution.identity_id.clone(),
            resolution.name.clone(),
        ),
        _ => (None, GUEST_NAME.to_string()),
    };

    let (dominant_emotion, emotion_scores) = match &entry.emotions {
        Some(readout) => (readout.dominant.clone(), readout.scores.clone()),
        None => (NEUTRAL_EMOTION.to_string(), Default::default()),
    };

    Sighting {
        id: new_record_id(),
        identity_id,
        name,
        confidence: entry.confidence,
        dominant_emotion,
        emotion_scores,
        demographics: entry.demographics.clone(),
        image_snapshot: entry.image_snapshot.clone(),
        embedding: entry.embedding.clone(),
        timestamp: Utc::now(),
    }
}

/// Persists sightings off the request path: a bounded queue drained by a
/// fixed pool of writer threads. Failures land in the log, never at the
/// caller; a saturated queue drops the sighting rather than blocking.
pub struct AuditWriter {
    sender: Option<Sender<Sighting>>,
    workers: Vec<JoinHandle<()>>,
    confidence_floor: f32,
}

impl AuditWriter {
    pub fn spawn(store: Arc<dyn SightingStore>, config: &AuditConfig) -> Result<Self> {
        let (sender, receiver) = bounded(config.queue_capacity);

        let mut workers = Vec::with_capacity(config.writer_threads);
        for i in 0..config.writer_threads {
            let receiver: Receiver<Sighting> = receiver.clone();
            let store = store.clone();
            let handle = std::thread::Builder::new()
                .name(format!("audit-writer-{}", i))
                .spawn(move || {
                    while let Ok(sighting) = receiver.recv() {
                        if let Err(e) = store.append(&sighting) {
                            tracing::warn!(
                                name = %sighting.name,
                                "Audit write failed, sighting lost: {}",
                                e
                            );
                        }
                    }
                })?;
            workers.push(handle);
        }

        Ok(Self {
            sender: Some(sender),
            workers,
            confidence_floor: config.confidence_floor,
        })
    }

    /// Best-effort, non-blocking. Entries below the confidence floor are
    /// discarded without a record or an error.
    pub fn record(&self, entry: &FaceEntry) {
        if entry.confidence < self.confidence_floor {
            tracing::debug!(
                confidence = entry.confidence,
                "Sighting below confidence floor, discarded"
            );
            return;
        }

        let sighting = sighting_from_entry(entry);
        let sender = match &self.sender {
            Some(sender) => sender,
            None => return,
        };
        match sender.try_send(sighting) {
            Ok(()) => {}
            Err(TrySendError::Full(sighting)) => {
                tracing::warn!(
                    name = %sighting.name,
                    "Audit queue full, sighting dropped"
                );
            }
            Err(TrySendError::Disconnected(_)) => {
                tracing::warn!("Audit queue closed, sighting dropped");
            }
        }
    }
}

impl Drop for AuditWriter {
    fn drop(&mut self) {
        // Closing the channel lets the workers drain what was accepted.
        self.sender.take();
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                tracing::warn!("Audit writer thread panicked");
            }
        }
    }
}
