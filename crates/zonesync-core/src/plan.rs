//! Desired-state planning
//!
//! Computes the [`Changes`] that turn the observed endpoint set into the
//! desired one. The host loop runs this before every [`crate::SyncEngine::apply`];
//! when the provider already matches the desired state the result is empty.

use crate::model::{Changes, Endpoint, RecordType, normalize_name};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Which kinds of changes a plan may contain
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlanPolicy {
    /// Create, update and delete
    Sync,
    /// Create and update, never delete
    #[default]
    UpsertOnly,
    /// Only create missing record sets
    CreateOnly,
}

/// Diff calculator between observed and desired endpoints
#[derive(Debug, Clone)]
pub struct Plan {
    policy: PlanPolicy,
    managed_types: Vec<RecordType>,
}

impl Default for Plan {
    fn default() -> Self {
        Self::new(PlanPolicy::default())
    }
}

impl Plan {
    /// Plan with the given policy, managing A, AAAA and CNAME record sets
    pub fn new(policy: PlanPolicy) -> Self {
        Self {
            policy,
            managed_types: vec![RecordType::A, RecordType::Aaaa, RecordType::Cname],
        }
    }

    /// Replace the set of record types the plan may touch
    pub fn with_managed_types(mut self, types: impl IntoIterator<Item = RecordType>) -> Self {
        self.managed_types = types.into_iter().collect();
        self
    }

    /// The configured policy
    pub fn policy(&self) -> PlanPolicy {
        self.policy
    }

    /// Compute the changes from `current` to `desired`
    ///
    /// Endpoints of unmanaged types are ignored on both sides. Endpoints that
    /// share a name and type are merged. A desired endpoint without a TTL
    /// accepts whatever TTL is currently set.
    pub fn calculate(&self, current: &[Endpoint], desired: &[Endpoint]) -> Changes {
        let current = self.group(current);
        let desired = self.group(desired);

        let current_index: HashMap<_, _> = current
            .iter()
            .enumerate()
            .map(|(i, endpoint)| (endpoint.key(), i))
            .collect();
        let desired_index: HashMap<_, _> = desired
            .iter()
            .enumerate()
            .map(|(i, endpoint)| (endpoint.key(), i))
            .collect();

        let mut changes = Changes::new();

        for wanted in &desired {
            match current_index.get(&wanted.key()) {
                None => changes.create.push(wanted.clone()),
                Some(&i) => {
                    let observed = &current[i];
                    if self.policy != PlanPolicy::CreateOnly && needs_update(observed, wanted) {
                        let mut new = wanted.clone();
                        if new.ttl.is_none() {
                            new.ttl = observed.ttl;
                        }
                        changes.update_old.push(observed.clone());
                        changes.update_new.push(new);
                    }
                }
            }
        }

        if self.policy == PlanPolicy::Sync {
            changes.delete = current
                .iter()
                .filter(|observed| !desired_index.contains_key(&observed.key()))
                .cloned()
                .collect();
        }

        changes
    }

    /// Keep managed types and merge endpoints sharing a name and type
    fn group(&self, endpoints: &[Endpoint]) -> Vec<Endpoint> {
        let mut grouped: Vec<Endpoint> = Vec::new();
        let mut index: HashMap<(String, RecordType), usize> = HashMap::new();

        for endpoint in endpoints {
            if !self.managed_types.contains(&endpoint.record_type) {
                continue;
            }
            match index.get(&endpoint.key()) {
                Some(&i) => {
                    let merged = &mut grouped[i];
                    for target in &endpoint.targets {
                        let known = merged
                            .targets
                            .iter()
                            .any(|t| endpoint.record_type.same_target(t, target));
                        if !known {
                            merged.targets.push(target.clone());
                        }
                    }
                    merged.ttl = merged.ttl.or(endpoint.ttl);
                }
                None => {
                    index.insert(endpoint.key(), grouped.len());
                    let mut endpoint = endpoint.clone();
                    endpoint.dns_name = normalize_name(&endpoint.dns_name);
                    grouped.push(endpoint);
                }
            }
        }

        grouped
    }
}

fn needs_update(observed: &Endpoint, wanted: &Endpoint) -> bool {
    let record_type = &wanted.record_type;
    let same_targets = observed.targets.len() == wanted.targets.len()
        && wanted
            .targets
            .iter()
            .all(|t| observed.targets.iter().any(|o| record_type.same_target(o, t)));
    let ttl_changed = wanted.ttl.is_some() && wanted.ttl != observed.ttl;
    !same_targets || ttl_changed
}
