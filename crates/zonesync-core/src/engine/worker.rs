//! Per-zone operation runner
//!
//! A [`ZoneWorker`] owns one zone for the duration of a cycle. It lists the
//! zone's records once, resolves identifiers against that snapshot and issues
//! the zone's operations strictly in the order they were queued.

use super::{SyncEvent, emit_event};
use crate::engine::cancel::CancelSignal;
use crate::error::{Error, Result};
use crate::model::{ChangeAction, ProviderRecord, RecordDraft, RecordId, Zone, find_record_id};
use crate::pagination::paginate;
use crate::traits::DnsProvider;
use crate::translate::TaggedOperation;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Operations of one zone, tagged with their position in the cycle
#[derive(Debug, Clone)]
pub(crate) struct ZoneBatch {
    pub zone: Zone,
    pub operations: Vec<(usize, TaggedOperation)>,
}

/// What happened to a batch that ran to completion
#[derive(Debug, Default)]
pub(crate) struct ZoneOutcome {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    /// Failed operations with their cycle position
    pub failures: Vec<(usize, Error)>,
}

impl ZoneOutcome {
    fn applied(&mut self, action: ChangeAction) {
        match action {
            ChangeAction::Create => self.created += 1,
            ChangeAction::Update => self.updated += 1,
            ChangeAction::Delete => self.deleted += 1,
        }
    }
}

/// Cycle-local view of a zone's records
///
/// Every id handed out is claimed, so two operations on the same name and
/// type (e.g. two round-robin targets) never resolve to the same record.
#[derive(Debug, Default)]
struct RecordSnapshot {
    records: Vec<ProviderRecord>,
    claimed: HashSet<RecordId>,
}

impl RecordSnapshot {
    fn new(records: Vec<ProviderRecord>) -> Self {
        Self {
            records,
            claimed: HashSet::new(),
        }
    }

    /// Claim the id of the record described by `lookup`
    ///
    /// Prefers an unclaimed record whose data matches. Otherwise the first
    /// unclaimed record with the same name and type wins, as in
    /// [`find_record_id`], which also yields [`RecordId::ABSENT`] when
    /// nothing is left.
    fn claim(&mut self, lookup: &RecordDraft) -> RecordId {
        let unclaimed: Vec<ProviderRecord> = self
            .records
            .iter()
            .filter(|record| !self.claimed.contains(&record.id))
            .cloned()
            .collect();

        let id = unclaimed
            .iter()
            .find(|record| {
                record.matches(&lookup.name, &lookup.record_type)
                    && lookup.record_type.same_target(&record.data, &lookup.data)
            })
            .map(|record| record.id)
            .unwrap_or_else(|| find_record_id(&unclaimed, lookup));

        if !id.is_absent() {
            self.claimed.insert(id);
        }
        id
    }
}

/// Runs the batch of a single zone
#[derive(Clone)]
pub(crate) struct ZoneWorker {
    provider: Arc<dyn DnsProvider>,
    dry_run: bool,
    event_tx: mpsc::Sender<SyncEvent>,
}

impl ZoneWorker {
    pub fn new(provider: Arc<dyn DnsProvider>, dry_run: bool, event_tx: mpsc::Sender<SyncEvent>) -> Self {
        Self {
            provider,
            dry_run,
            event_tx,
        }
    }

    /// Run every operation of the batch
    ///
    /// Returns `Err` only when the cycle must stop: the record list could not
    /// be fetched or cancellation was raised. Failed mutations are collected
    /// in the outcome.
    pub async fn run(&self, batch: ZoneBatch, cancel: &CancelSignal) -> Result<ZoneOutcome> {
        let ZoneBatch { zone, operations } = batch;

        let mut snapshot = if operations.iter().any(|(_, op)| op.needs_record_id()) {
            RecordSnapshot::new(self.list_records(&zone, cancel).await?)
        } else {
            RecordSnapshot::default()
        };

        let mut outcome = ZoneOutcome::default();

        for (index, operation) in operations {
            cancel.check()?;

            let id = if operation.needs_record_id() {
                snapshot.claim(operation.lookup())
            } else {
                RecordId::ABSENT
            };

            match self.execute(&zone, &operation, id).await {
                Ok(()) => {
                    outcome.applied(operation.action);
                    emit_event(
                        &self.event_tx,
                        SyncEvent::OperationApplied {
                            action: operation.action,
                            zone: zone.name.clone(),
                            name: operation.record.name.clone(),
                            record_type: operation.record.record_type.clone(),
                            dry_run: self.dry_run,
                        },
                    );
                }
                Err(e) => {
                    let error = Error::RecordMutation {
                        action: operation.action,
                        zone: zone.name.clone(),
                        name: operation.record.name.clone(),
                        record_type: operation.record.record_type.clone(),
                        message: e.to_string(),
                    };
                    warn!("{}", error);
                    emit_event(
                        &self.event_tx,
                        SyncEvent::OperationFailed {
                            action: operation.action,
                            zone: zone.name.clone(),
                            name: operation.record.name.clone(),
                            record_type: operation.record.record_type.clone(),
                            error: e.to_string(),
                        },
                    );
                    outcome.failures.push((index, error));
                }
            }
        }

        Ok(outcome)
    }

    async fn list_records(&self, zone: &Zone, cancel: &CancelSignal) -> Result<Vec<ProviderRecord>> {
        cancel.check()?;

        let provider = &self.provider;
        let records = paginate(|cursor| async move {
            cancel.check()?;
            provider.list_records(zone, cursor).await
        })
        .await
        .map_err(|e| match e.error {
            Error::Cancelled => Error::Cancelled,
            error => {
                warn!(
                    zone = %zone,
                    page = e.page,
                    partial = e.items.len(),
                    "Record listing failed"
                );
                Error::record_list(&zone.name, error.to_string())
            }
        })?;

        debug!(zone = %zone, records = records.len(), "Loaded record snapshot");
        Ok(records)
    }

    async fn execute(&self, zone: &Zone, operation: &TaggedOperation, id: RecordId) -> Result<()> {
        if self.dry_run {
            info!("[DRY-RUN] Would {} in zone {} (record id {})", operation, zone, id);
            return Ok(());
        }

        match operation.action {
            ChangeAction::Create => {
                let created = self.provider.create_record(zone, &operation.record).await?;
                debug!("Provider assigned id {} to {}", created.id, created.name);
            }
            ChangeAction::Update => {
                self.provider.edit_record(zone, id, &operation.record).await?;
            }
            ChangeAction::Delete => {
                self.provider.delete_record(zone, id).await?;
            }
        }

        info!("Applied {} in zone {}", operation, zone);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RecordType;

    fn record(id: u64, name: &str, data: &str) -> ProviderRecord {
        ProviderRecord {
            id: RecordId(id),
            name: name.to_string(),
            record_type: RecordType::A,
            data: data.to_string(),
            ttl: None,
        }
    }

    fn lookup(name: &str, data: &str) -> RecordDraft {
        RecordDraft {
            name: name.to_string(),
            record_type: RecordType::A,
            data: data.to_string(),
            ttl: None,
        }
    }

    #[test]
    fn test_claim_prefers_matching_data() {
        let mut snapshot = RecordSnapshot::new(vec![
            record(1, "www.foo.com", "1.1.1.1"),
            record(2, "www.foo.com", "2.2.2.2"),
        ]);

        assert_eq!(snapshot.claim(&lookup("www.foo.com", "2.2.2.2")), RecordId(2));
        assert_eq!(snapshot.claim(&lookup("www.foo.com", "2.2.2.2")), RecordId(1));
        assert_eq!(snapshot.claim(&lookup("www.foo.com", "2.2.2.2")), RecordId::ABSENT);
    }

    #[test]
    fn test_claim_falls_back_to_first_match() {
        let mut snapshot = RecordSnapshot::new(vec![
            record(5, "api.foo.com", "9.9.9.9"),
            record(7, "www.foo.com", "1.1.1.1"),
            record(3, "www.foo.com", "3.3.3.3"),
        ]);

        assert_eq!(snapshot.claim(&lookup("www.foo.com", "8.8.8.8")), RecordId(7));
    }

    #[test]
    fn test_claim_on_empty_snapshot_is_absent() {
        let mut snapshot = RecordSnapshot::default();
        assert!(snapshot.claim(&lookup("www.foo.com", "1.1.1.1")).is_absent());
    }

    fn typed(id: u64, record_type: RecordType, data: &str) -> ProviderRecord {
        ProviderRecord {
            record_type,
            ..record(id, "foo.com", data)
        }
    }

    fn typed_lookup(record_type: RecordType, data: &str) -> RecordDraft {
        RecordDraft {
            record_type,
            ..lookup("foo.com", data)
        }
    }

    #[test]
    fn test_hostname_data_matches_across_spelling() {
        let mut snapshot = RecordSnapshot::new(vec![
            typed(1, RecordType::Cname, "a.foo.com"),
            typed(2, RecordType::Cname, "target.foo.com"),
        ]);

        assert_eq!(
            snapshot.claim(&typed_lookup(RecordType::Cname, "Target.Foo.com.")),
            RecordId(2)
        );
    }

    #[test]
    fn test_txt_data_is_case_sensitive() {
        let mut snapshot = RecordSnapshot::new(vec![
            typed(1, RecordType::Txt, "token=ABC"),
            typed(2, RecordType::Txt, "token=abc"),
        ]);

        assert_eq!(snapshot.claim(&typed_lookup(RecordType::Txt, "token=abc")), RecordId(2));
        assert_eq!(snapshot.claim(&typed_lookup(RecordType::Txt, "token=abc")), RecordId(1));
    }
}
