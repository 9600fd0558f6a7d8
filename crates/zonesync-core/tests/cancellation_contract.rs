//! Contract Test: Cancellation
//!
//! Constraints verified:
//! - A signal raised before the cycle prevents every provider call
//! - A signal raised mid-cycle stops further mutations
//! - Calls issued before the signal are not rolled back
//!
//! If this test fails, shutdown can leave the daemon issuing calls.

mod common;

use common::*;
use zonesync_core::model::Changes;
use zonesync_core::{CancelSignal, DomainFilter, EngineConfig, Error, cancel_pair};

fn three_creates() -> Changes {
    Changes {
        create: vec![
            a("one.foo.com", &["1.1.1.1"]),
            a("two.foo.com", &["2.2.2.2"]),
            a("three.foo.com", &["3.3.3.3"]),
        ],
        ..Changes::default()
    }
}

#[tokio::test]
async fn cancelled_before_start_issues_no_calls() {
    let provider = RecordingProvider::with_zones(["foo.com"]);
    let (engine, _rx) = engine(&provider);
    let (handle, signal) = cancel_pair();
    handle.cancel();

    let err = engine.apply(&three_creates(), &signal).await.unwrap_err();

    assert!(matches!(err, Error::Cancelled));
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn cancelled_mid_cycle_stops_remaining_operations() {
    let provider = RecordingProvider::with_zones(["foo.com"]);
    let (engine, _rx) = engine(&provider);
    let (handle, signal) = cancel_pair();
    provider.cancel_after(1, handle);

    let err = engine.apply(&three_creates(), &signal).await.unwrap_err();

    assert!(matches!(err, Error::Cancelled));
    assert_eq!(provider.mutations().len(), 1);
    // Already issued call is kept
    assert_eq!(provider.store().records("foo.com").await.len(), 1);
}

#[tokio::test]
async fn cancellation_reaches_concurrent_zone_workers() {
    let provider = RecordingProvider::with_zones(["a.com", "b.com", "c.com"]);
    let config = EngineConfig {
        zone_concurrency: 3,
        ..EngineConfig::default()
    };
    let (engine, _rx) = engine_with(&provider, DomainFilter::any(), config);
    let (handle, signal) = cancel_pair();
    provider.cancel_after(1, handle);

    let changes = Changes {
        create: ["a.com", "b.com", "c.com"]
            .iter()
            .flat_map(|zone| {
                (0..5).map(move |i| a(&format!("r{i}.{zone}"), &["1.1.1.1"]))
            })
            .collect(),
        ..Changes::default()
    };

    let err = engine.apply(&changes, &signal).await.unwrap_err();

    assert!(matches!(err, Error::Cancelled));
    // At most one in-flight call per zone after the signal
    assert!(provider.mutations().len() <= 3, "mutations: {:?}", provider.mutations());
}

#[tokio::test]
async fn never_signal_runs_to_completion() {
    let provider = RecordingProvider::with_zones(["foo.com"]);
    let (engine, _rx) = engine(&provider);

    let report = engine
        .apply(&three_creates(), &CancelSignal::never())
        .await
        .unwrap();
    assert_eq!(report.created, 3);
}
