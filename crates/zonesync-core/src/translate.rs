//! Change translation
//!
//! Turns a [`Changes`] set into an ordered list of single-record operations.
//! The provider record model is single-valued per record, so an endpoint with
//! several targets expands into one operation per target.

use crate::model::{ChangeAction, Changes, Endpoint, RecordDraft};
use std::fmt;

/// One record operation tagged with its action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedOperation {
    /// What to do
    pub action: ChangeAction,
    /// Record body for create/update, record to locate for delete
    pub record: RecordDraft,
    /// For updates: the record as it currently exists, used to find its id
    pub previous: Option<RecordDraft>,
}

impl TaggedOperation {
    /// Create operation
    pub fn create(record: RecordDraft) -> Self {
        Self {
            action: ChangeAction::Create,
            record,
            previous: None,
        }
    }

    /// In-place edit of `previous` into `record`
    pub fn update(previous: RecordDraft, record: RecordDraft) -> Self {
        Self {
            action: ChangeAction::Update,
            record,
            previous: Some(previous),
        }
    }

    /// Delete operation
    pub fn delete(record: RecordDraft) -> Self {
        Self {
            action: ChangeAction::Delete,
            record,
            previous: None,
        }
    }

    /// The draft used to look up an existing record id
    pub fn lookup(&self) -> &RecordDraft {
        self.previous.as_ref().unwrap_or(&self.record)
    }

    /// Whether the operation needs an existing record id
    pub fn needs_record_id(&self) -> bool {
        self.action != ChangeAction::Create
    }
}

impl fmt::Display for TaggedOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.previous {
            Some(previous) => write!(
                f,
                "{} {} {} ({} -> {})",
                self.action, self.record.record_type, self.record.name, previous.data, self.record.data
            ),
            None => write!(
                f,
                "{} {} {} ({})",
                self.action, self.record.record_type, self.record.name, self.record.data
            ),
        }
    }
}

/// Expand endpoints into one operation per target, all with the same action
///
/// For [`ChangeAction::Update`] the record is looked up by its own name,
/// type and data; use [`translate_updates`] when the old state is known.
pub fn translate(action: ChangeAction, endpoints: &[Endpoint]) -> Vec<TaggedOperation> {
    endpoints
        .iter()
        .flat_map(|endpoint| {
            endpoint.targets.iter().map(move |target| TaggedOperation {
                action,
                record: RecordDraft::from_endpoint(endpoint, target),
                previous: None,
            })
        })
        .collect()
}

/// Translate index-aligned update pairs into edits, deletes and creates
///
/// Targets unchanged between old and new (same data, same TTL) produce no
/// operation. The remaining old and new targets are paired by position into
/// in-place edits; surplus old targets are deleted and surplus new targets
/// are created. After applying, the record set holds exactly the new targets.
pub fn translate_updates(old: &[Endpoint], new: &[Endpoint]) -> Vec<TaggedOperation> {
    let mut operations = Vec::new();

    for (before, after) in old.iter().zip(new) {
        let record_type = &after.record_type;
        let kept_in = |targets: &[String], target: &str| {
            targets.iter().any(|t| record_type.same_target(t, target))
        };

        let (stale, fresh): (Vec<&String>, Vec<&String>) = if before.ttl == after.ttl {
            (
                before
                    .targets
                    .iter()
                    .filter(|t| !kept_in(&after.targets, t))
                    .collect(),
                after
                    .targets
                    .iter()
                    .filter(|t| !kept_in(&before.targets, t))
                    .collect(),
            )
        } else {
            (before.targets.iter().collect(), after.targets.iter().collect())
        };

        let paired = stale.len().min(fresh.len());

        for target in &stale[paired..] {
            operations.push(TaggedOperation::delete(RecordDraft::from_endpoint(
                before, target,
            )));
        }
        for (old_target, new_target) in stale.iter().zip(&fresh) {
            operations.push(TaggedOperation::update(
                RecordDraft::from_endpoint(before, old_target),
                RecordDraft::from_endpoint(after, new_target),
            ));
        }
        for target in &fresh[paired..] {
            operations.push(TaggedOperation::create(RecordDraft::from_endpoint(
                after, target,
            )));
        }
    }

    operations
}

/// Ordered operations for a whole change set: deletes, then updates, then creates
pub fn plan_operations(changes: &Changes) -> Vec<TaggedOperation> {
    let mut operations = translate(ChangeAction::Delete, &changes.delete);
    operations.extend(translate_updates(&changes.update_old, &changes.update_new));
    operations.extend(translate(ChangeAction::Create, &changes.create));
    operations
}
