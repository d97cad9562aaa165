pub mod audit;
pub mod pipeline;
pub mod protocol;

pub use audit::AuditWriter;
pub use pipeline::DetectionPipeline;
pub use protocol::{DetectionReport, DetectionWorker, FaceEntry};
