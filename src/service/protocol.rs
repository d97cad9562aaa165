use crate::common::error::{EngineError, Result};
use crate::core::alerts::AlertDescriptor;
use crate::core::embedding::Embedding;
use crate::core::resolver::Resolution;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// Wire shapes produced by the external detection worker. Field names are a
// stable contract shared with the worker and downstream consumers.

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Demographics {
    #[serde(default)]
    pub age: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub liveness_score: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EmotionReadout {
    pub dominant: String,
    #[serde(default)]
    pub scores: HashMap<String, f32>,
}

/// One detected face. `identity` and `security_alert` are attached by the
/// detection pipeline; the worker never sends them.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct FaceEntry {
    #[serde(default)]
    pub embedding: Embedding,
    #[serde(default)]
    pub confidence: f32,
    #[serde(default)]
    pub emotions: Option<EmotionReadout>,
    #[serde(default)]
    pub demographics: Demographics,
    #[serde(default)]
    pub image_snapshot: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<Resolution>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_alert: Option<AlertDescriptor>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DetectionReport {
    pub face_detected: bool,
    #[serde(default)]
    pub total_faces: usize,
    #[serde(default)]
    pub faces: Vec<FaceEntry>,
}

impl DetectionReport {
    /// The probe embedding for a forensic search. A report with no face is a
    /// hard precondition failure; the scan must not start.
    pub fn probe(&self) -> Result<&Embedding> {
        if !self.face_detected {
            return Err(EngineError::NoFaceDetected);
        }
        let face = self
            .faces
            .first()
            .ok_or(EngineError::NoFaceDetected)?;
        if face.embedding.is_empty() {
            return Err(EngineError::InvalidInput(
                "Worker report carries no probe embedding".into(),
            ));
        }
        Ok(&face.embedding)
    }

    /// The probe embedding for enrollment, which additionally requires the
    /// image to contain exactly one face.
    pub fn single_clear_probe(&self) -> Result<&Embedding> {
        if self.face_detected && self.total_faces > 1 {
            return Err(EngineError::InvalidInput(
                "Single clear face required for registration".into(),
            ));
        }
        self.probe()
    }
}

/// Port for the external detection worker. Implementations wrap transport
/// failures as `EngineError::Worker`, preserving the collaborator's status
/// code when it returned one.
pub trait DetectionWorker: Send + Sync {
    fn detect(&self, image: &[u8], filename: &str, is_static: bool) -> Result<DetectionReport>;
}
