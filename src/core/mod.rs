pub mod alerts;
pub mod analytics;
pub mod embedding;
pub mod forensic;
pub mod registry;
pub mod resolver;

pub use alerts::{AlertDescriptor, AlertDispatcher};
pub use analytics::AnalyticsEngine;
pub use embedding::{cosine_similarity, Embedding};
pub use forensic::{ForensicSearchEngine, SightingMatch};
pub use registry::{IdentityUpdate, PurgeOutcome, Registration, Registry, WatchlistSpec};
pub use resolver::{IdentityResolver, Resolution};
