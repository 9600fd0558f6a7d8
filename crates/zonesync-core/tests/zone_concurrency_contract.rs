//! Contract Test: Zone Concurrency
//!
//! Constraints verified:
//! - Zones may run in parallel, each zone keeps delete-before-create order
//! - The outcome does not depend on task scheduling
//! - A listing failure in one zone aborts the whole cycle
//!
//! If this test fails, parallel zones can reorder writes within a zone.

mod common;

use common::*;
use zonesync_core::model::{Changes, RecordType};
use zonesync_core::{CancelSignal, DomainFilter, EngineConfig, Error};

const ZONES: [&str; 4] = ["a.com", "b.com", "c.com", "d.com"];

fn concurrent(limit: usize) -> EngineConfig {
    EngineConfig {
        zone_concurrency: limit,
        ..EngineConfig::default()
    }
}

async fn seeded() -> RecordingProvider {
    let provider = RecordingProvider::with_zones(ZONES);
    for zone in ZONES {
        provider
            .seed(zone, &format!("www.{zone}"), RecordType::A, "1.1.1.1")
            .await;
    }
    provider
}

fn swap_everywhere() -> Changes {
    Changes {
        delete: ZONES
            .iter()
            .map(|zone| a(&format!("www.{zone}"), &["1.1.1.1"]))
            .collect(),
        create: ZONES
            .iter()
            .map(|zone| a(&format!("www.{zone}"), &["2.2.2.2"]))
            .collect(),
        ..Changes::default()
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn per_zone_order_survives_parallelism() {
    let provider = seeded().await;
    let (engine, _rx) = engine_with(&provider, DomainFilter::any(), concurrent(4));

    let report = engine
        .apply(&swap_everywhere(), &CancelSignal::never())
        .await
        .unwrap();
    assert_eq!(report.deleted, 4);
    assert_eq!(report.created, 4);

    for zone in ZONES {
        let zone_calls: Vec<Call> = provider
            .mutations()
            .into_iter()
            .filter(|call| call.zone() == Some(zone))
            .collect();
        assert_eq!(zone_calls.len(), 2, "zone {zone}");
        assert!(matches!(zone_calls[0], Call::Delete { .. }), "zone {zone}");
        assert!(matches!(zone_calls[1], Call::Create { .. }), "zone {zone}");

        let records = provider.store().records(zone).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].data, "2.2.2.2");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn first_error_is_deterministic_under_parallelism() {
    let provider = seeded().await;
    provider.fail_mutations_for("www.b.com");
    provider.fail_mutations_for("www.d.com");
    let (engine, _rx) = engine_with(&provider, DomainFilter::any(), concurrent(4));

    let err = engine
        .apply(&swap_everywhere(), &CancelSignal::never())
        .await
        .unwrap_err();

    match err {
        Error::RecordMutation { zone, name, .. } => {
            assert_eq!(zone, "b.com");
            assert_eq!(name, "www.b.com");
        }
        other => panic!("expected RecordMutation, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn record_list_failure_in_one_zone_aborts() {
    let provider = seeded().await;
    provider.fail_record_list("c.com");
    let (engine, _rx) = engine_with(&provider, DomainFilter::any(), concurrent(2));

    let err = engine
        .apply(&swap_everywhere(), &CancelSignal::never())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::RecordList { ref zone, .. } if zone == "c.com"));
    assert!(provider
        .mutations()
        .iter()
        .all(|call| call.zone() != Some("c.com")));
}

#[tokio::test]
async fn concurrency_limit_of_one_matches_sequential_order() {
    let provider = seeded().await;
    let (engine, _rx) = engine_with(&provider, DomainFilter::any(), concurrent(1));

    engine
        .apply(&swap_everywhere(), &CancelSignal::never())
        .await
        .unwrap();

    let zones: Vec<String> = provider
        .mutations()
        .iter()
        .filter_map(|call| call.zone().map(str::to_string))
        .collect();
    assert_eq!(
        zones,
        vec!["a.com", "a.com", "b.com", "b.com", "c.com", "c.com", "d.com", "d.com"]
    );
}
