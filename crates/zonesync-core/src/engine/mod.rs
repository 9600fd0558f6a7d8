//! Provider synchronization engine
//!
//! The SyncEngine is responsible for:
//! - Listing the zones this account may touch (domain filter applied)
//! - Translating a [`Changes`] set into ordered record operations
//! - Routing each operation to its most specific zone
//! - Resolving record ids and issuing provider calls
//! - Reporting the outcome of the cycle
//!
//! ## Architecture
//!
//! ```text
//!   Changes ──► translate ──► [Delete.., Update.., Create..]
//!                                      │
//!                         suitable_zone│ (zones from paginate)
//!                                      ▼
//!                    ┌─────────┬───────────────┬─────────┐
//!                    │ zone A  │    zone B     │  miss   │──► skipped
//!                    └────┬────┴───────┬───────┴─────────┘
//!                         ▼            ▼
//!                    ZoneWorker   ZoneWorker     (records snapshot,
//!                         │            │          id claim, call)
//!                         └─────┬──────┘
//!                               ▼
//!                     ApplyReport / first error
//! ```
//!
//! ## Failure Policy
//!
//! 1. Zone or record listing fails: the cycle aborts at once
//! 2. A create/edit/delete fails: logged, remaining operations still run
//! 3. After every operation was attempted, the first failure (in operation
//!    order) is returned
//!
//! Nothing is cached between cycles. The next cycle re-lists everything, so a
//! partially applied cycle is repaired by the following one.

pub mod cancel;
mod worker;

pub use cancel::{CancelHandle, CancelSignal, cancel_pair};

use crate::config::{EngineConfig, ZoneMissPolicy};
use crate::domain_filter::DomainFilter;
use crate::error::{Error, Result};
use crate::model::{ChangeAction, Changes, Endpoint, ProviderRecord, RecordType, Zone};
use crate::pagination::paginate;
use crate::plan::Plan;
use crate::resolver::suitable_zone;
use crate::traits::DnsProvider;
use crate::translate::plan_operations;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use worker::{ZoneBatch, ZoneOutcome, ZoneWorker};

/// Events emitted by the SyncEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// A non-empty cycle started
    CycleStarted {
        operations: usize,
    },

    /// No managed zone owns the record; the operation was skipped
    ZoneMiss {
        name: String,
        record_type: RecordType,
    },

    /// A record operation succeeded (or was logged in dry-run mode)
    OperationApplied {
        action: ChangeAction,
        zone: String,
        name: String,
        record_type: RecordType,
        dry_run: bool,
    },

    /// A record operation failed
    OperationFailed {
        action: ChangeAction,
        zone: String,
        name: String,
        record_type: RecordType,
        error: String,
    },

    /// Every operation of the cycle was attempted
    CycleFinished {
        report: ApplyReport,
    },

    /// The cycle stopped early (listing failed or cancelled)
    CycleAborted {
        error: String,
    },
}

/// Counts of one apply cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Records created
    pub created: usize,
    /// Records edited in place
    pub updated: usize,
    /// Records deleted
    pub deleted: usize,
    /// Operations outside every managed zone
    pub skipped: usize,
    /// Operations the provider rejected
    pub failed: usize,
}

impl ApplyReport {
    /// Operations that reached the provider successfully
    pub fn applied(&self) -> usize {
        self.created + self.updated + self.deleted
    }

    fn merge(&mut self, outcome: &ZoneOutcome) {
        self.created += outcome.created;
        self.updated += outcome.updated;
        self.deleted += outcome.deleted;
        self.failed += outcome.failures.len();
    }
}

/// Provider synchronization engine
///
/// The engine is invoked once per cycle by a host loop. It holds no record
/// state between calls; every [`SyncEngine::apply`] starts from a fresh zone
/// and record listing.
///
/// ## Lifecycle
///
/// 1. Create with [`SyncEngine::new()`]
/// 2. Each cycle: [`SyncEngine::records()`], plan, [`SyncEngine::apply()`]
///    (or [`SyncEngine::reconcile()`] for all three)
/// 3. Drop to cleanup
pub struct SyncEngine {
    /// DNS provider shared with zone workers
    provider: Arc<dyn DnsProvider>,

    /// Zones the engine may touch
    domain_filter: DomainFilter,

    /// Engine settings
    config: EngineConfig,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<SyncEvent>,
}

impl SyncEngine {
    /// Create a new sync engine
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields engine events
    pub fn new(
        provider: Arc<dyn DnsProvider>,
        domain_filter: DomainFilter,
        config: EngineConfig,
    ) -> Result<(Self, mpsc::Receiver<SyncEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.event_channel_capacity);

        let engine = Self {
            provider,
            domain_filter,
            config,
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// Name of the underlying provider
    pub fn provider_name(&self) -> &'static str {
        self.provider.provider_name()
    }

    /// List every zone of the account that passes the domain filter
    pub async fn zones(&self) -> Result<Vec<Zone>> {
        self.list_zones(&CancelSignal::never()).await
    }

    /// Every record in every in-scope zone, grouped into endpoints
    ///
    /// Records sharing a name and type become one endpoint whose targets are
    /// in provider order. The TTL is taken from the first record. The signal
    /// is checked before every page.
    pub async fn records(&self, cancel: &CancelSignal) -> Result<Vec<Endpoint>> {
        let zones = self.list_zones(cancel).await?;
        let mut endpoints: Vec<Endpoint> = Vec::new();
        let mut index: HashMap<(String, RecordType), usize> = HashMap::new();

        for zone in &zones {
            let provider = &self.provider;
            let records: Vec<ProviderRecord> = paginate(|cursor| async move {
                cancel.check()?;
                provider.list_records(zone, cursor).await
            })
            .await
            .map_err(|e| match e.error {
                Error::Cancelled => Error::Cancelled,
                error => Error::record_list(&zone.name, error.to_string()),
            })?;

            for record in records {
                let key = (record.name.clone(), record.record_type.clone());
                match index.get(&key) {
                    Some(&i) => endpoints[i].targets.push(record.data),
                    None => {
                        index.insert(key, endpoints.len());
                        let mut endpoint = Endpoint::new(&record.name, record.record_type, [record.data]);
                        endpoint.ttl = record.ttl;
                        endpoints.push(endpoint);
                    }
                }
            }
        }

        debug!(zones = zones.len(), endpoints = endpoints.len(), "Listed provider records");
        Ok(endpoints)
    }

    /// Apply a change set to the provider
    ///
    /// Deletes run first, then updates, then creates. An empty change set
    /// returns immediately without any provider call.
    ///
    /// # Returns
    ///
    /// - `Ok(ApplyReport)`: every operation succeeded or was skipped
    /// - `Err(Error::RecordMutation)`: the first failed operation; all others were attempted
    /// - `Err(Error::ZoneList | Error::RecordList)`: listing failed, cycle aborted
    /// - `Err(Error::Cancelled)`: the signal was raised, no further calls were issued
    pub async fn apply(&self, changes: &Changes, cancel: &CancelSignal) -> Result<ApplyReport> {
        changes.validate()?;

        if changes.is_empty() {
            debug!("No changes to apply");
            return Ok(ApplyReport::default());
        }

        let operations = plan_operations(changes);
        if operations.is_empty() {
            debug!("Changes produced no record operations");
            return Ok(ApplyReport::default());
        }

        self.emit_event(SyncEvent::CycleStarted {
            operations: operations.len(),
        });

        match self.run_cycle(operations, cancel).await {
            Ok(report) => {
                info!(
                    created = report.created,
                    updated = report.updated,
                    deleted = report.deleted,
                    skipped = report.skipped,
                    failed = report.failed,
                    "Apply cycle finished"
                );
                self.emit_event(SyncEvent::CycleFinished { report });
                Ok(report)
            }
            Err(e) => {
                if e.is_fatal_to_cycle() {
                    error!("Apply cycle aborted: {}", e);
                    self.emit_event(SyncEvent::CycleAborted {
                        error: e.to_string(),
                    });
                }
                Err(e)
            }
        }
    }

    /// Observe the provider, plan against `desired` and apply the difference
    pub async fn reconcile(
        &self,
        desired: &[Endpoint],
        plan: &Plan,
        cancel: &CancelSignal,
    ) -> Result<ApplyReport> {
        let current = self.records(cancel).await?;
        let changes = plan.calculate(&current, desired);

        debug!(
            create = changes.create.len(),
            update = changes.update_new.len(),
            delete = changes.delete.len(),
            "Planned changes"
        );

        self.apply(&changes, cancel).await
    }

    async fn run_cycle(
        &self,
        operations: Vec<crate::translate::TaggedOperation>,
        cancel: &CancelSignal,
    ) -> Result<ApplyReport> {
        let zones = self.list_zones(cancel).await?;
        let mut report = ApplyReport::default();

        // Route operations to zones, keeping first-appearance order of zones
        let mut batches: Vec<ZoneBatch> = Vec::new();
        let mut batch_index: HashMap<String, usize> = HashMap::new();

        for (index, operation) in operations.into_iter().enumerate() {
            let Some(zone) = suitable_zone(&operation.record.name, &zones) else {
                report.skipped += 1;
                self.zone_miss(&operation.record.name, &operation.record.record_type);
                continue;
            };

            let slot = *batch_index.entry(zone.name.clone()).or_insert_with(|| {
                batches.push(ZoneBatch {
                    zone: zone.clone(),
                    operations: Vec::new(),
                });
                batches.len() - 1
            });
            batches[slot].operations.push((index, operation));
        }

        let outcomes = if self.config.zone_concurrency > 1 && batches.len() > 1 {
            self.run_concurrent(batches, cancel).await?
        } else {
            self.run_sequential(batches, cancel).await?
        };

        let mut failures = Vec::new();
        for outcome in outcomes {
            report.merge(&outcome);
            failures.extend(outcome.failures);
        }

        failures.sort_by_key(|(index, _)| *index);
        match failures.into_iter().next() {
            Some((_, first)) => {
                warn!(
                    failed = report.failed,
                    applied = report.applied(),
                    "Apply cycle finished with failures"
                );
                self.emit_event(SyncEvent::CycleFinished { report });
                Err(first)
            }
            None => Ok(report),
        }
    }

    async fn run_sequential(
        &self,
        batches: Vec<ZoneBatch>,
        cancel: &CancelSignal,
    ) -> Result<Vec<ZoneOutcome>> {
        let worker = self.worker();
        let mut outcomes = Vec::with_capacity(batches.len());

        for batch in batches {
            outcomes.push(worker.run(batch, cancel).await?);
        }

        Ok(outcomes)
    }

    async fn run_concurrent(
        &self,
        batches: Vec<ZoneBatch>,
        cancel: &CancelSignal,
    ) -> Result<Vec<ZoneOutcome>> {
        let permits = Arc::new(Semaphore::new(self.config.zone_concurrency));
        let mut tasks = JoinSet::new();
        let total = batches.len();

        for (position, batch) in batches.into_iter().enumerate() {
            let worker = self.worker();
            let cancel = cancel.clone();
            let permits = Arc::clone(&permits);

            tasks.spawn(async move {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|e| Error::Other(format!("zone semaphore closed: {e}")))?;
                let outcome = worker.run(batch, &cancel).await?;
                Ok::<_, Error>((position, outcome))
            });
        }

        let mut slots: Vec<Option<ZoneOutcome>> = (0..total).map(|_| None).collect();

        while let Some(joined) = tasks.join_next().await {
            let result = joined.map_err(|e| Error::Other(format!("zone task failed: {e}")));
            match result.and_then(|inner| inner) {
                Ok((position, outcome)) => slots[position] = Some(outcome),
                Err(e) => {
                    tasks.abort_all();
                    return Err(e);
                }
            }
        }

        Ok(slots.into_iter().flatten().collect())
    }

    async fn list_zones(&self, cancel: &CancelSignal) -> Result<Vec<Zone>> {
        cancel.check()?;

        let provider = &self.provider;
        let zones = paginate(|cursor| async move {
            cancel.check()?;
            provider.list_zones(cursor).await
        })
        .await
        .map_err(|e| match e.error {
            Error::Cancelled => Error::Cancelled,
            error => {
                warn!(page = e.page, partial = e.items.len(), "Zone listing failed");
                Error::zone_list(error.to_string())
            }
        })?;

        let total = zones.len();
        let zones: Vec<Zone> = zones
            .into_iter()
            .filter(|zone| self.domain_filter.matches(&zone.name))
            .collect();

        debug!(total, in_scope = zones.len(), "Listed zones");
        Ok(zones)
    }

    fn zone_miss(&self, name: &str, record_type: &RecordType) {
        if self.config.zone_miss == ZoneMissPolicy::Log {
            warn!("No managed zone for {} {}, skipping", record_type, name);
        }
        self.emit_event(SyncEvent::ZoneMiss {
            name: name.to_string(),
            record_type: record_type.clone(),
        });
    }

    fn worker(&self) -> ZoneWorker {
        ZoneWorker::new(
            Arc::clone(&self.provider),
            self.config.dry_run,
            self.event_tx.clone(),
        )
    }

    fn emit_event(&self, event: SyncEvent) {
        emit_event(&self.event_tx, event);
    }
}

/// Send an event without blocking, dropping it when the channel is full
pub(crate) fn emit_event(tx: &mpsc::Sender<SyncEvent>, event: SyncEvent) {
    match tx.try_send(event) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(_)) => {
            warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
        }
        // Nobody is listening
        Err(mpsc::error::TrySendError::Closed(_)) => {}
    }
}
