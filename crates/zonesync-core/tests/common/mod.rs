//! Test doubles and common utilities for engine contract tests
//!
//! [`RecordingProvider`] wraps a [`MemoryProvider`] and journals every call
//! the engine makes, so tests can assert on call order and call counts.
//! Failures and cancellation can be injected per zone or per record name.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use zonesync_core::error::{Error, Result};
use zonesync_core::model::{ProviderRecord, RecordDraft, RecordId, RecordType, Zone};
use zonesync_core::pagination::{Cursor, Page};
use zonesync_core::provider::MemoryProvider;
use zonesync_core::{
    CancelHandle, DnsProvider, DomainFilter, EngineConfig, Endpoint, SyncEngine, SyncEvent,
};

/// One provider call as seen by the double
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListZones,
    ListRecords { zone: String },
    Create { zone: String, name: String, data: String },
    Edit { zone: String, id: RecordId, data: String },
    Delete { zone: String, id: RecordId },
}

impl Call {
    /// Whether the call changes provider state
    pub fn is_mutation(&self) -> bool {
        matches!(self, Call::Create { .. } | Call::Edit { .. } | Call::Delete { .. })
    }

    /// Zone the call targets, if any
    pub fn zone(&self) -> Option<&str> {
        match self {
            Call::ListZones => None,
            Call::ListRecords { zone }
            | Call::Create { zone, .. }
            | Call::Edit { zone, .. }
            | Call::Delete { zone, .. } => Some(zone),
        }
    }
}

/// A DnsProvider that journals calls and can be told to fail
///
/// Clones share the journal, the backing store and the failure switches.
#[derive(Clone)]
pub struct RecordingProvider {
    inner: MemoryProvider,
    calls: Arc<Mutex<Vec<Call>>>,
    fail_zone_list: Arc<AtomicBool>,
    fail_record_list: Arc<Mutex<HashSet<String>>>,
    fail_mutations: Arc<Mutex<HashSet<String>>>,
    mutation_count: Arc<AtomicUsize>,
    cancel_after: Arc<Mutex<Option<(usize, CancelHandle)>>>,
    record_list_count: Arc<AtomicUsize>,
    cancel_on_record_list: Arc<Mutex<Option<(usize, CancelHandle)>>>,
}

impl RecordingProvider {
    /// Provider hosting the given empty zones
    pub fn with_zones<const N: usize>(zones: [&str; N]) -> Self {
        Self::wrap(MemoryProvider::with_zones(zones))
    }

    /// Journal calls made against an existing memory provider
    pub fn wrap(inner: MemoryProvider) -> Self {
        Self {
            inner,
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_zone_list: Arc::new(AtomicBool::new(false)),
            fail_record_list: Arc::new(Mutex::new(HashSet::new())),
            fail_mutations: Arc::new(Mutex::new(HashSet::new())),
            mutation_count: Arc::new(AtomicUsize::new(0)),
            cancel_after: Arc::new(Mutex::new(None)),
            record_list_count: Arc::new(AtomicUsize::new(0)),
            cancel_on_record_list: Arc::new(Mutex::new(None)),
        }
    }

    /// The backing store
    pub fn store(&self) -> &MemoryProvider {
        &self.inner
    }

    /// Seed a record without journaling it
    pub async fn seed(&self, zone: &str, name: &str, record_type: RecordType, data: &str) -> RecordId {
        self.inner
            .insert(
                zone,
                RecordDraft {
                    name: name.to_string(),
                    record_type,
                    data: data.to_string(),
                    ttl: None,
                },
            )
            .await
            .expect("seed zone exists")
    }

    /// Every call so far, in order
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Only create/edit/delete calls, in order
    pub fn mutations(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_mutation).collect()
    }

    /// Number of calls of any kind
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Forget the journal
    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Make list_zones fail
    pub fn fail_zone_list(&self) {
        self.fail_zone_list.store(true, Ordering::SeqCst);
    }

    /// Make list_records fail for one zone
    pub fn fail_record_list(&self, zone: &str) {
        self.fail_record_list.lock().unwrap().insert(zone.to_string());
    }

    /// Make every mutation of a record name fail
    pub fn fail_mutations_for(&self, name: &str) {
        self.fail_mutations.lock().unwrap().insert(name.to_string());
    }

    /// Raise `handle` once `count` mutations have been issued
    pub fn cancel_after(&self, count: usize, handle: CancelHandle) {
        *self.cancel_after.lock().unwrap() = Some((count, handle));
    }

    /// Raise `handle` once `count` record pages have been served
    pub fn cancel_on_record_list(&self, count: usize, handle: CancelHandle) {
        *self.cancel_on_record_list.lock().unwrap() = Some((count, handle));
    }

    /// Number of list_records calls for one zone
    pub fn record_list_calls(&self, zone: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, Call::ListRecords { zone: z } if z == zone))
            .count()
    }

    fn journal(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn mutation(&self, name: &str) -> Result<()> {
        let issued = self.mutation_count.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((count, handle)) = self.cancel_after.lock().unwrap().as_ref() {
            if issued >= *count {
                handle.cancel();
            }
        }

        if self.fail_mutations.lock().unwrap().contains(name) {
            return Err(Error::http(format!("injected failure for {name}")));
        }
        Ok(())
    }

    fn record_page_served(&self) {
        let served = self.record_list_count.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((count, handle)) = self.cancel_on_record_list.lock().unwrap().as_ref() {
            if served >= *count {
                handle.cancel();
            }
        }
    }

    fn name_of(&self, records: &[ProviderRecord], id: RecordId) -> String {
        records
            .iter()
            .find(|record| record.id == id)
            .map(|record| record.name.clone())
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl DnsProvider for RecordingProvider {
    async fn list_zones(&self, cursor: Option<Cursor>) -> Result<Page<Zone>> {
        self.journal(Call::ListZones);
        if self.fail_zone_list.load(Ordering::SeqCst) {
            return Err(Error::http("injected zone list failure"));
        }
        self.inner.list_zones(cursor).await
    }

    async fn list_records(&self, zone: &Zone, cursor: Option<Cursor>) -> Result<Page<ProviderRecord>> {
        self.journal(Call::ListRecords {
            zone: zone.name.clone(),
        });
        if self.fail_record_list.lock().unwrap().contains(&zone.name) {
            return Err(Error::http("injected record list failure"));
        }
        self.record_page_served();
        self.inner.list_records(zone, cursor).await
    }

    async fn create_record(&self, zone: &Zone, draft: &RecordDraft) -> Result<ProviderRecord> {
        self.journal(Call::Create {
            zone: zone.name.clone(),
            name: draft.name.clone(),
            data: draft.data.clone(),
        });
        self.mutation(&draft.name)?;
        self.inner.create_record(zone, draft).await
    }

    async fn edit_record(&self, zone: &Zone, id: RecordId, draft: &RecordDraft) -> Result<ProviderRecord> {
        self.journal(Call::Edit {
            zone: zone.name.clone(),
            id,
            data: draft.data.clone(),
        });
        self.mutation(&draft.name)?;
        self.inner.edit_record(zone, id, draft).await
    }

    async fn delete_record(&self, zone: &Zone, id: RecordId) -> Result<()> {
        self.journal(Call::Delete {
            zone: zone.name.clone(),
            id,
        });
        let records = self.inner.records(&zone.name).await;
        self.mutation(&self.name_of(&records, id))?;
        self.inner.delete_record(zone, id).await
    }

    fn provider_name(&self) -> &'static str {
        "recording"
    }
}

/// Engine over `provider` with no domain filter and default settings
pub fn engine(provider: &RecordingProvider) -> (SyncEngine, tokio::sync::mpsc::Receiver<SyncEvent>) {
    engine_with(provider, DomainFilter::any(), EngineConfig::default())
}

/// Engine over `provider` with explicit filter and settings
pub fn engine_with(
    provider: &RecordingProvider,
    filter: DomainFilter,
    config: EngineConfig,
) -> (SyncEngine, tokio::sync::mpsc::Receiver<SyncEvent>) {
    SyncEngine::new(Arc::new(provider.clone()), filter, config).expect("engine construction succeeds")
}

/// A-record endpoint
pub fn a(name: &str, targets: &[&str]) -> Endpoint {
    Endpoint::new(name, RecordType::A, targets.iter().copied())
}

/// CNAME endpoint
pub fn cname(name: &str, target: &str) -> Endpoint {
    Endpoint::new(name, RecordType::Cname, [target])
}

/// Drain every event currently buffered
pub fn drain(rx: &mut tokio::sync::mpsc::Receiver<SyncEvent>) -> Vec<SyncEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
