//! Provider-independent data model
//!
//! - [`Endpoint`]: a desired or observed name/type/targets tuple
//! - [`Changes`]: the four-way diff handed to the engine every cycle
//! - [`Zone`], [`ProviderRecord`], [`RecordDraft`]: the provider's view of a zone

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Normalize a DNS name for comparison: trailing dot removed, ASCII-lowercased.
pub fn normalize_name(name: &str) -> String {
    name.trim().trim_end_matches('.').to_ascii_lowercase()
}

fn deserialize_name<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(normalize_name(&raw))
}

/// DNS record type
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RecordType {
    /// IPv4 address
    A,
    /// IPv6 address
    Aaaa,
    /// Canonical name
    Cname,
    /// Text
    Txt,
    /// Mail exchange
    Mx,
    /// Name server
    Ns,
    /// Service locator
    Srv,
    /// Certification authority authorization
    Caa,
    /// Any other type, stored upper-case
    Other(String),
}

impl RecordType {
    /// Upper-case wire representation (e.g. "CNAME")
    pub fn as_str(&self) -> &str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Cname => "CNAME",
            RecordType::Txt => "TXT",
            RecordType::Mx => "MX",
            RecordType::Ns => "NS",
            RecordType::Srv => "SRV",
            RecordType::Caa => "CAA",
            RecordType::Other(other) => other,
        }
    }

    /// Whether record data of this type is a domain name
    pub fn is_hostname(&self) -> bool {
        matches!(
            self,
            RecordType::Cname | RecordType::Mx | RecordType::Ns | RecordType::Srv
        )
    }

    /// Whether two record values of this type denote the same target
    ///
    /// Hostname data ignores case and the trailing dot. Everything else,
    /// TXT included, must match exactly apart from surrounding whitespace.
    pub fn same_target(&self, a: &str, b: &str) -> bool {
        if self.is_hostname() {
            normalize_name(a) == normalize_name(b)
        } else {
            a.trim() == b.trim()
        }
    }
}

impl From<&str> for RecordType {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "A" => RecordType::A,
            "AAAA" => RecordType::Aaaa,
            "CNAME" => RecordType::Cname,
            "TXT" => RecordType::Txt,
            "MX" => RecordType::Mx,
            "NS" => RecordType::Ns,
            "SRV" => RecordType::Srv,
            "CAA" => RecordType::Caa,
            other => RecordType::Other(other.to_string()),
        }
    }
}

impl From<String> for RecordType {
    fn from(value: String) -> Self {
        RecordType::from(value.as_str())
    }
}

impl From<RecordType> for String {
    fn from(value: RecordType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A desired or observed DNS record set
///
/// A single endpoint may carry several targets (round-robin A records).
/// Providers whose record model is single-valued receive one operation
/// per target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Fully-qualified name, normalized
    #[serde(deserialize_with = "deserialize_name")]
    pub dns_name: String,

    /// Record type
    pub record_type: RecordType,

    /// Record data, in order
    #[serde(default)]
    pub targets: Vec<String>,

    /// Time-to-live in seconds, provider default when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
}

impl Endpoint {
    /// Create a new endpoint with a normalized name
    pub fn new(
        dns_name: impl AsRef<str>,
        record_type: RecordType,
        targets: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            dns_name: normalize_name(dns_name.as_ref()),
            record_type,
            targets: targets.into_iter().map(Into::into).collect(),
            ttl: None,
        }
    }

    /// Set the TTL (seconds)
    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Identity of the record set: normalized name plus type
    pub fn key(&self) -> (String, RecordType) {
        (normalize_name(&self.dns_name), self.record_type.clone())
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} [{}]",
            self.dns_name,
            self.record_type,
            self.targets.join(", ")
        )
    }
}

/// Action tag of a single record operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    /// Create a new record
    Create,
    /// Edit an existing record in place
    Update,
    /// Delete an existing record
    Delete,
}

impl fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ChangeAction::Create => "create",
            ChangeAction::Update => "update",
            ChangeAction::Delete => "delete",
        })
    }
}

/// The diff between desired and observed endpoint sets
///
/// `update_old[i]` and `update_new[i]` describe the same record set
/// before and after the change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Changes {
    /// Record sets to create
    #[serde(default)]
    pub create: Vec<Endpoint>,

    /// Record sets as currently observed, index-aligned with `update_new`
    #[serde(default)]
    pub update_old: Vec<Endpoint>,

    /// Record sets as desired, index-aligned with `update_old`
    #[serde(default)]
    pub update_new: Vec<Endpoint>,

    /// Record sets to delete
    #[serde(default)]
    pub delete: Vec<Endpoint>,
}

impl Changes {
    /// Create an empty change set
    pub fn new() -> Self {
        Self::default()
    }

    /// True when there is nothing to do
    pub fn is_empty(&self) -> bool {
        self.create.is_empty()
            && self.update_old.is_empty()
            && self.update_new.is_empty()
            && self.delete.is_empty()
    }

    /// Check the structural invariants of the change set
    pub fn validate(&self) -> crate::Result<()> {
        if self.update_old.len() != self.update_new.len() {
            return Err(crate::Error::invalid_input(format!(
                "update_old has {} entries but update_new has {}",
                self.update_old.len(),
                self.update_new.len()
            )));
        }

        for (old, new) in self.update_old.iter().zip(&self.update_new) {
            if old.key() != new.key() {
                return Err(crate::Error::invalid_input(format!(
                    "update pair refers to different record sets: {} {} vs {} {}",
                    old.dns_name, old.record_type, new.dns_name, new.record_type
                )));
            }
        }

        Ok(())
    }
}

/// A DNS zone hosted by the provider account
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Zone {
    /// Zone apex, normalized
    #[serde(deserialize_with = "deserialize_name")]
    pub name: String,
}

impl Zone {
    /// Create a zone with a normalized name
    pub fn new(name: impl AsRef<str>) -> Self {
        Self {
            name: normalize_name(name.as_ref()),
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Provider-assigned record identifier
///
/// [`RecordId::ABSENT`] stands for "no matching record"; calls made with it
/// are expected to fail at the provider with a not-found error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub u64);

impl RecordId {
    /// Sentinel for an unresolved identifier
    pub const ABSENT: RecordId = RecordId(0);

    /// Whether this is the sentinel value
    pub fn is_absent(self) -> bool {
        self == Self::ABSENT
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A concrete record inside one zone, as the provider reports it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderRecord {
    /// Provider-assigned identifier
    pub id: RecordId,
    /// Fully-qualified name, normalized
    pub name: String,
    /// Record type
    pub record_type: RecordType,
    /// Single record value
    pub data: String,
    /// Time-to-live in seconds
    pub ttl: Option<u32>,
}

impl ProviderRecord {
    /// Whether this record has the given name and type
    pub fn matches(&self, name: &str, record_type: &RecordType) -> bool {
        normalize_name(&self.name) == normalize_name(name) && &self.record_type == record_type
    }
}

/// Body of a create or edit call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordDraft {
    /// Fully-qualified name, normalized
    pub name: String,
    /// Record type
    pub record_type: RecordType,
    /// Single record value
    pub data: String,
    /// Time-to-live in seconds
    pub ttl: Option<u32>,
}

impl RecordDraft {
    /// Build the draft for one target of an endpoint
    pub fn from_endpoint(endpoint: &Endpoint, target: &str) -> Self {
        Self {
            name: normalize_name(&endpoint.dns_name),
            record_type: endpoint.record_type.clone(),
            data: target.to_string(),
            ttl: endpoint.ttl,
        }
    }
}

/// Return the id of the first record with the draft's name and type
///
/// Yields [`RecordId::ABSENT`] when nothing matches.
pub fn find_record_id(records: &[ProviderRecord], draft: &RecordDraft) -> RecordId {
    records
        .iter()
        .find(|record| record.matches(&draft.name, &draft.record_type))
        .map(|record| record.id)
        .unwrap_or(RecordId::ABSENT)
}
