//! Contract Test: Dry Run
//!
//! Constraints verified:
//! - Dry-run cycles list zones and records but never mutate
//! - The report and events describe what would have been done
//!
//! If this test fails, a dry run can change live DNS.

mod common;

use common::*;
use zonesync_core::model::{Changes, RecordType};
use zonesync_core::{CancelSignal, DomainFilter, EngineConfig, SyncEvent};

#[tokio::test]
async fn dry_run_never_mutates() {
    let provider = RecordingProvider::with_zones(["foo.com"]);
    provider
        .seed("foo.com", "old.foo.com", RecordType::A, "1.1.1.1")
        .await;
    let config = EngineConfig {
        dry_run: true,
        ..EngineConfig::default()
    };
    let (engine, mut rx) = engine_with(&provider, DomainFilter::any(), config);

    let changes = Changes {
        create: vec![a("new.foo.com", &["2.2.2.2"])],
        delete: vec![a("old.foo.com", &["1.1.1.1"])],
        ..Changes::default()
    };
    let report = engine.apply(&changes, &CancelSignal::never()).await.unwrap();

    assert_eq!(report.created, 1);
    assert_eq!(report.deleted, 1);
    assert!(provider.mutations().is_empty());
    assert!(provider
        .calls()
        .iter()
        .any(|call| matches!(call, Call::ListRecords { .. })));

    let records = provider.store().records("foo.com").await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "old.foo.com");

    let events = drain(&mut rx);
    let dry = events
        .iter()
        .filter(|event| matches!(event, SyncEvent::OperationApplied { dry_run: true, .. }))
        .count();
    assert_eq!(dry, 2);
}
