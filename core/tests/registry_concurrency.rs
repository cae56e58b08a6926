use std::sync::Arc;
use std::thread;

use disclosure_core::determinism::ids;
use disclosure_core::report::registry::ReportRegistry;
use disclosure_core::report::render::ArtifactRef;
use disclosure_core::report::tier::ReportTier;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

fn artifact() -> ArtifactRef {
    ArtifactRef {
        artifact_id: ids::artifact_id(),
        sha256: "0".repeat(64),
        media_type: "text/markdown".to_string(),
        size_bytes: 512,
    }
}

#[test]
fn concurrent_registrations_yield_a_gapless_version_sequence() {
    const WRITERS: u32 = 16;

    let registry = Arc::new(ReportRegistry::new());
    let now = OffsetDateTime::parse("2024-01-10T12:00:00Z", &Rfc3339).unwrap();

    let handles: Vec<_> = (0..WRITERS)
        .map(|_| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                registry
                    .register("inc_1", ReportTier::Preliminary, artifact(), "handler", now)
                    .unwrap()
                    .version
            })
        })
        .collect();

    let mut versions: Vec<u32> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    versions.sort_unstable();
    assert_eq!(versions, (1..=WRITERS).collect::<Vec<_>>());
}

#[test]
fn version_sequences_are_independent_per_incident_and_tier() {
    let registry = Arc::new(ReportRegistry::new());
    let now = OffsetDateTime::parse("2024-01-10T12:00:00Z", &Rfc3339).unwrap();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                let incident = if i % 2 == 0 { "inc_a" } else { "inc_b" };
                let tier = if i % 4 < 2 {
                    ReportTier::Preliminary
                } else {
                    ReportTier::Complete
                };
                registry
                    .register(incident, tier, artifact(), "handler", now)
                    .unwrap()
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }

    for incident in ["inc_a", "inc_b"] {
        for tier in [ReportTier::Preliminary, ReportTier::Complete] {
            // Two registrations landed on each (incident, tier) key.
            assert_eq!(registry.next_version(incident, tier), 3);
        }
    }
}
