use crate::common::error::Result;
use crate::core::alerts::AlertDispatcher;
use crate::core::resolver::IdentityResolver;
use crate::service::audit::AuditWriter;
use crate::service::protocol::DetectionReport;

/// Live detection flow: resolve each face, attach its alert, hand it to the
/// audit writer. The caller gets the annotated report back before any audit
/// write completes; M faces mean M independent writes with no atomicity
/// across them.
pub struct DetectionPipeline {
    resolver: IdentityResolver,
    dispatcher: AlertDispatcher,
    audit: AuditWriter,
}

impl DetectionPipeline {
    pub fn new(
        resolver: IdentityResolver,
        dispatcher: AlertDispatcher,
        audit: AuditWriter,
    ) -> Self {
        Self {
            resolver,
            dispatcher,
            audit,
        }
    }

    pub fn process(&self, report: &mut DetectionReport) -> Result<()> {
        if !report.face_detected {
            return Ok(());
        }

        for face in &mut report.faces {
            if !face.embedding.is_empty() {
                let resolution = self.resolver.resolve(&face.embedding)?;
                face.security_alert = self
                    .dispatcher
                    .dispatch(resolution.identity_id.as_deref());
                face.identity = Some(resolution);
            }

            // Fire and forget; the response never waits on the audit trail.
            self.audit.record(face);
        }

        Ok(())
    }
}
