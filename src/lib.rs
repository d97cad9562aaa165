// Core modules
pub mod common;
pub mod core;
pub mod service;
pub mod storage;

// Re-export commonly used types
pub use common::{EngineConfig, EngineError, Result};
pub use self::core::{
    cosine_similarity, AlertDescriptor, AlertDispatcher, AnalyticsEngine, Embedding,
    ForensicSearchEngine, IdentityResolver, Registry, Resolution, SightingMatch,
};
pub use service::{protocol, AuditWriter, DetectionPipeline, DetectionReport, FaceEntry};
pub use storage::{
    FileIdentityStore, FileSightingStore, FileWatchlistStore, Identity, IdentityStore,
    MemoryIdentityStore, MemorySightingStore, MemoryWatchlistStore, Severity, Sighting,
    SightingStore, WatchlistEntry, WatchlistStore, WatchlistType,
};
