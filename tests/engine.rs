use facewatch::common::config::{AuditConfig, SearchConfig};
use facewatch::core::alerts::BLACKLIST_MESSAGE;
use facewatch::core::registry::{Registration, Registry, WatchlistSpec};
use facewatch::protocol::{DetectionReport, FaceEntry};
use facewatch::{
    AlertDispatcher, AuditWriter, DetectionPipeline, ForensicSearchEngine, IdentityResolver,
    MemoryIdentityStore, MemorySightingStore, MemoryWatchlistStore, Sighting, SightingStore,
    WatchlistType,
};

use chrono::{DateTime, Utc};
use std::sync::{Arc, Condvar, Mutex};

struct Fixture {
    identities: Arc<MemoryIdentityStore>,
    watchlist: Arc<MemoryWatchlistStore>,
    sightings: Arc<MemorySightingStore>,
}

impl Fixture {
    fn new() -> Self {
        Self {
            identities: Arc::new(MemoryIdentityStore::new()),
            watchlist: Arc::new(MemoryWatchlistStore::new()),
            sightings: Arc::new(MemorySightingStore::new()),
        }
    }

    fn registry(&self) -> Registry {
        Registry::new(self.identities.clone(), self.watchlist.clone(), None)
    }

    fn pipeline(&self) -> DetectionPipeline {
        DetectionPipeline::new(
            IdentityResolver::new(self.identities.clone(), 0.6),
            AlertDispatcher::new(self.watchlist.clone()),
            AuditWriter::spawn(self.sightings.clone(), &AuditConfig::default()).unwrap(),
        )
    }

    fn resolver(&self) -> IdentityResolver {
        IdentityResolver::new(self.identities.clone(), 0.6)
    }
}

fn detection(embedding: Vec<f32>, confidence: f32) -> DetectionReport {
    DetectionReport {
        face_detected: true,
        total_faces: 1,
        faces: vec![FaceEntry {
            embedding,
            confidence,
            ..FaceEntry::default()
        }],
    }
}

fn register(registry: &Registry, name: &str, embedding: Vec<f32>, kind: Option<WatchlistType>) {
    registry
        .register(Registration {
            name: name.to_string(),
            embedding,
            user_id: None,
            source_image: None,
            watchlist: kind.map(|kind| WatchlistSpec {
                kind,
                severity: None,
                nickname: None,
                notes: None,
            }),
        })
        .unwrap();
}

#[test]
fn blacklisted_identity_is_resolved_alerted_and_audited() {
    let fixture = Fixture::new();
    let registry = fixture.registry();
    let enrollment = vec![0.12, -0.4, 0.88, 0.3];
    register(&registry, "Alice", enrollment.clone(), Some(WatchlistType::Blacklist));

    let pipeline = fixture.pipeline();
    let mut report = detection(enrollment, 0.92);
    pipeline.process(&mut report).unwrap();

    let face = &report.faces[0];
    let identity = face.identity.as_ref().unwrap();
    assert_eq!(identity.name, "Alice");
    assert!((identity.confidence - 1.0).abs() < 1e-6);
    assert_eq!(face.security_alert.as_ref().unwrap().message, BLACKLIST_MESSAGE);

    drop(pipeline);
    let recorded = fixture.sightings.page_desc(1, 10).unwrap();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].name, "Alice");
    assert!(recorded[0].identity_id.is_some());
}

#[test]
fn unmatched_detection_is_audited_as_guest_without_alert() {
    let fixture = Fixture::new();
    let registry = fixture.registry();
    register(&registry, "Alice", vec![1.0, 0.0, 0.0], None);

    let pipeline = fixture.pipeline();
    let mut report = detection(vec![0.0, 0.0, 1.0], 0.7);
    pipeline.process(&mut report).unwrap();

    let face = &report.faces[0];
    assert!(face.identity.as_ref().unwrap().is_unknown());
    assert!(face.security_alert.is_none());

    drop(pipeline);
    let recorded = fixture.sightings.page_desc(1, 10).unwrap();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].name, "Guest");
    assert!(recorded[0].identity_id.is_none());
}

#[test]
fn multi_face_detection_issues_independent_writes() {
    let fixture = Fixture::new();
    let pipeline = fixture.pipeline();

    let mut report = DetectionReport {
        face_detected: true,
        total_faces: 3,
        faces: vec![
            FaceEntry {
                embedding: vec![1.0, 0.0],
                confidence: 0.9,
                ..FaceEntry::default()
            },
            FaceEntry {
                embedding: vec![0.0, 1.0],
                confidence: 0.3, // below the floor, discarded
                ..FaceEntry::default()
            },
            FaceEntry {
                embedding: vec![0.5, 0.5],
                confidence: 0.6,
                ..FaceEntry::default()
            },
        ],
    };
    pipeline.process(&mut report).unwrap();

    drop(pipeline);
    assert_eq!(fixture.sightings.count().unwrap(), 2);
}

#[test]
fn purged_identity_leaves_its_sightings_intact() {
    let fixture = Fixture::new();
    let registry = fixture.registry();
    let enrollment = vec![0.2, 0.5, 0.7];
    register(&registry, "Alice", enrollment.clone(), Some(WatchlistType::Vip));
    let alice_id = registry.list().unwrap()[0].id.clone();

    let pipeline = fixture.pipeline();
    let mut report = detection(enrollment.clone(), 0.95);
    pipeline.process(&mut report).unwrap();
    drop(pipeline);

    let before: Vec<Sighting> = fixture.sightings.page_desc(1, 10).unwrap();
    assert_eq!(before[0].name, "Alice");

    let outcome = registry.purge(&alice_id).unwrap();
    assert!(outcome.identity_removed);
    assert!(outcome.watchlist_removed);

    // Resolution forgets her, the audit trail does not.
    let resolution = fixture.resolver().resolve(&enrollment).unwrap();
    assert_eq!(resolution.name, "Unknown");
    assert_eq!(resolution.confidence, 0.0);

    let after = fixture.sightings.page_desc(1, 10).unwrap();
    assert_eq!(after, before);
    assert_eq!(
        bincode::serialize(&after[0]).unwrap(),
        bincode::serialize(&before[0]).unwrap()
    );
}

#[test]
fn forensic_search_finds_historical_guest_sightings() {
    let fixture = Fixture::new();
    let pipeline = fixture.pipeline();

    let lurker = vec![0.3, 0.1, 0.9];
    for _ in 0..3 {
        let mut report = detection(lurker.clone(), 0.8);
        pipeline.process(&mut report).unwrap();
    }
    let mut other = detection(vec![-0.9, 0.1, 0.1], 0.8);
    pipeline.process(&mut other).unwrap();
    drop(pipeline);

    let engine = ForensicSearchEngine::new(fixture.sightings.clone(), SearchConfig::default());
    let matches = engine.search(&lurker).unwrap();

    assert_eq!(matches.len(), 3);
    for m in &matches {
        assert_eq!(m.sighting.name, "Guest");
        assert!((m.similarity - 1.0).abs() < 1e-6);
    }
}

/// Sighting store that parks its writer inside `append` until released,
/// to hold the audit queue at capacity.
struct GatedStore {
    inner: MemorySightingStore,
    gate: Mutex<bool>,
    opened: Condvar,
    entered: crossbeam_channel::Sender<()>,
}

impl GatedStore {
    fn new(entered: crossbeam_channel::Sender<()>) -> Self {
        Self {
            inner: MemorySightingStore::new(),
            gate: Mutex::new(false),
            opened: Condvar::new(),
            entered,
        }
    }

    fn open_gate(&self) {
        *self.gate.lock().unwrap() = true;
        self.opened.notify_all();
    }
}

impl SightingStore for GatedStore {
    fn append(&self, sighting: &Sighting) -> facewatch::Result<()> {
        let _ = self.entered.send(());
        let mut open = self.gate.lock().unwrap();
        while !*open {
            open = self.opened.wait(open).unwrap();
        }
        drop(open);
        self.inner.append(sighting)
    }

    fn get(&self, id: &str) -> facewatch::Result<Option<Sighting>> {
        self.inner.get(id)
    }

    fn recorded_since(&self, cutoff: DateTime<Utc>) -> facewatch::Result<Vec<Sighting>> {
        self.inner.recorded_since(cutoff)
    }

    fn recorded_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> facewatch::Result<Vec<Sighting>> {
        self.inner.recorded_between(start, end)
    }

    fn page_desc(&self, page: usize, limit: usize) -> facewatch::Result<Vec<Sighting>> {
        self.inner.page_desc(page, limit)
    }

    fn count(&self) -> facewatch::Result<usize> {
        self.inner.count()
    }
}

#[test]
fn saturated_audit_queue_drops_without_blocking_the_caller() {
    let (entered_tx, entered_rx) = crossbeam_channel::unbounded();
    let store = Arc::new(GatedStore::new(entered_tx));
    let config = AuditConfig {
        confidence_floor: 0.5,
        queue_capacity: 1,
        writer_threads: 1,
    };
    let writer = AuditWriter::spawn(store.clone(), &config).unwrap();

    let entry = FaceEntry {
        embedding: vec![1.0, 0.0],
        confidence: 0.9,
        ..FaceEntry::default()
    };

    // First record is picked up by the (now blocked) writer thread.
    writer.record(&entry);
    entered_rx.recv().unwrap();

    // Second fills the queue; third must be dropped, not block.
    writer.record(&entry);
    writer.record(&entry);

    store.open_gate();
    drop(writer);

    assert_eq!(store.count().unwrap(), 2);
}
