// # Memory Provider
//
// In-memory implementation of DnsProvider.
//
// ## Purpose
//
// Behaves like a small paginated provider account without any network I/O.
// Useful for tests, dry runs of a desired-state file, and embedding the
// engine where the "provider" is a local model.
//
// ## Behavior
//
// - Zones are listed in name order, records in insertion order
// - Cursors are decimal offsets into those lists
// - Record ids start at 1 and are never reused; 0 is never assigned
// - Editing or deleting an unknown id fails with `Error::NotFound`
// - All state is lost when the provider is dropped

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::config::ProviderConfig;
use crate::model::{ProviderRecord, RecordDraft, RecordId, Zone, normalize_name};
use crate::pagination::{Cursor, Page};
use crate::traits::{DnsProvider, DnsProviderFactory};

/// Default number of items per page
pub const DEFAULT_PAGE_SIZE: usize = 20;

#[derive(Debug, Default)]
struct MemoryState {
    zones: BTreeMap<String, Vec<ProviderRecord>>,
    last_id: u64,
}

/// In-memory provider implementation
///
/// Cloning shares the underlying state, so a test can keep a handle while
/// the engine owns another.
///
/// # Example
///
/// ```rust,no_run
/// use zonesync_core::provider::MemoryProvider;
/// use zonesync_core::DnsProvider;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let provider = MemoryProvider::with_zones(["example.com"]);
///
///     let page = provider.list_zones(None).await?;
///     assert_eq!(page.items.len(), 1);
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct MemoryProvider {
    inner: Arc<RwLock<MemoryState>>,
    page_size: usize,
}

impl MemoryProvider {
    /// Create a provider with no zones
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(MemoryState::default())),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Create a provider hosting the given (empty) zones
    pub fn with_zones<I, S>(zones: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let state = MemoryState {
            zones: zones
                .into_iter()
                .map(|zone| (normalize_name(zone.as_ref()), Vec::new()))
                .collect(),
            last_id: 0,
        };
        Self {
            inner: Arc::new(RwLock::new(state)),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Set the number of items returned per page (at least 1)
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Add an empty zone; existing zones are left untouched
    pub async fn add_zone(&self, zone: &str) {
        let mut guard = self.inner.write().await;
        guard.zones.entry(normalize_name(zone)).or_default();
    }

    /// Insert a record directly, bypassing the trait
    pub async fn insert(&self, zone: &str, draft: RecordDraft) -> Result<RecordId, Error> {
        let record = self.create_record(&Zone::new(zone), &draft).await?;
        Ok(record.id)
    }

    /// All records of a zone, in insertion order
    pub async fn records(&self, zone: &str) -> Vec<ProviderRecord> {
        let guard = self.inner.read().await;
        guard
            .zones
            .get(&normalize_name(zone))
            .cloned()
            .unwrap_or_default()
    }

    /// Total number of records across all zones
    pub async fn len(&self) -> usize {
        let guard = self.inner.read().await;
        guard.zones.values().map(Vec::len).sum()
    }

    /// Check if no zone holds any record
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn page_of<T: Clone>(&self, items: &[T], cursor: Option<Cursor>) -> Result<Page<T>, Error> {
        let offset = match cursor {
            None => 0,
            Some(cursor) => cursor
                .parse::<usize>()
                .map_err(|_| Error::invalid_input(format!("Invalid cursor: {cursor}")))?,
        };

        let start = offset.min(items.len());
        let end = (start + self.page_size).min(items.len());
        let next = (end < items.len()).then(|| end.to_string());

        Ok(Page::new(items[start..end].to_vec(), next))
    }
}

impl Default for MemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DnsProvider for MemoryProvider {
    async fn list_zones(&self, cursor: Option<Cursor>) -> Result<Page<Zone>, Error> {
        let guard = self.inner.read().await;
        let zones: Vec<Zone> = guard.zones.keys().map(Zone::new).collect();
        self.page_of(&zones, cursor)
    }

    async fn list_records(
        &self,
        zone: &Zone,
        cursor: Option<Cursor>,
    ) -> Result<Page<ProviderRecord>, Error> {
        let guard = self.inner.read().await;
        let records = guard
            .zones
            .get(&zone.name)
            .ok_or_else(|| Error::not_found(format!("Zone not found: {}", zone.name)))?;
        self.page_of(records, cursor)
    }

    async fn create_record(&self, zone: &Zone, draft: &RecordDraft) -> Result<ProviderRecord, Error> {
        let mut guard = self.inner.write().await;
        let state = &mut *guard;

        let records = state
            .zones
            .get_mut(&zone.name)
            .ok_or_else(|| Error::not_found(format!("Zone not found: {}", zone.name)))?;

        state.last_id += 1;
        let record = ProviderRecord {
            id: RecordId(state.last_id),
            name: normalize_name(&draft.name),
            record_type: draft.record_type.clone(),
            data: draft.data.clone(),
            ttl: draft.ttl,
        };
        records.push(record.clone());

        Ok(record)
    }

    async fn edit_record(
        &self,
        zone: &Zone,
        id: RecordId,
        draft: &RecordDraft,
    ) -> Result<ProviderRecord, Error> {
        let mut guard = self.inner.write().await;
        let record = guard
            .zones
            .get_mut(&zone.name)
            .and_then(|records| records.iter_mut().find(|record| record.id == id))
            .ok_or_else(|| Error::not_found(format!("Record {id} not found in {}", zone.name)))?;

        record.name = normalize_name(&draft.name);
        record.record_type = draft.record_type.clone();
        record.data = draft.data.clone();
        record.ttl = draft.ttl;

        Ok(record.clone())
    }

    async fn delete_record(&self, zone: &Zone, id: RecordId) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        let records = guard
            .zones
            .get_mut(&zone.name)
            .ok_or_else(|| Error::not_found(format!("Zone not found: {}", zone.name)))?;

        let position = records
            .iter()
            .position(|record| record.id == id)
            .ok_or_else(|| Error::not_found(format!("Record {id} not found in {}", zone.name)))?;
        records.remove(position);

        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "memory"
    }
}

/// Factory for creating memory providers
pub struct MemoryProviderFactory;

impl DnsProviderFactory for MemoryProviderFactory {
    fn create(&self, config: &ProviderConfig) -> Result<Arc<dyn DnsProvider>, Error> {
        match config {
            ProviderConfig::Memory { zones, page_size } => {
                let mut provider = MemoryProvider::with_zones(zones);
                if let Some(page_size) = page_size {
                    provider = provider.with_page_size(*page_size as usize);
                }
                Ok(Arc::new(provider))
            }
            _ => Err(Error::config("Invalid config for memory provider")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RecordType;
    use crate::pagination::paginate;

    fn draft(name: &str, data: &str) -> RecordDraft {
        RecordDraft {
            name: name.to_string(),
            record_type: RecordType::A,
            data: data.to_string(),
            ttl: None,
        }
    }

    #[tokio::test]
    async fn test_memory_provider_basic() {
        let provider = MemoryProvider::with_zones(["foo.com"]);
        let zone = Zone::new("foo.com");

        assert!(provider.is_empty().await);

        let created = provider
            .create_record(&zone, &draft("www.foo.com", "1.1.1.1"))
            .await
            .unwrap();
        assert_eq!(created.id, RecordId(1));
        assert_eq!(provider.len().await, 1);

        let edited = provider
            .edit_record(&zone, created.id, &draft("www.foo.com", "2.2.2.2"))
            .await
            .unwrap();
        assert_eq!(edited.data, "2.2.2.2");
        assert_eq!(edited.id, created.id);

        provider.delete_record(&zone, created.id).await.unwrap();
        assert!(provider.is_empty().await);
    }

    #[tokio::test]
    async fn test_unknown_ids_are_not_found() {
        let provider = MemoryProvider::with_zones(["foo.com"]);
        let zone = Zone::new("foo.com");

        let err = provider.delete_record(&zone, RecordId::ABSENT).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        let err = provider
            .edit_record(&zone, RecordId(42), &draft("www.foo.com", "1.1.1.1"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_unknown_zone_is_not_found() {
        let provider = MemoryProvider::new();
        let err = provider
            .create_record(&Zone::new("nope.com"), &draft("a.nope.com", "1.1.1.1"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_pages_cover_all_zones() {
        let provider = MemoryProvider::with_zones(["a.com", "b.com", "c.com", "d.com", "e.com"])
            .with_page_size(2);

        let first = provider.list_zones(None).await.unwrap();
        assert_eq!(first.items.len(), 2);
        assert_eq!(first.next.as_deref(), Some("2"));

        let zones = paginate(|cursor| provider.list_zones(cursor)).await.unwrap();
        let names: Vec<_> = zones.iter().map(|zone| zone.name.as_str()).collect();
        assert_eq!(names, vec!["a.com", "b.com", "c.com", "d.com", "e.com"]);
    }

    #[tokio::test]
    async fn test_invalid_cursor() {
        let provider = MemoryProvider::with_zones(["a.com"]);
        let err = provider.list_zones(Some("abc".to_string())).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_factory() {
        let config = ProviderConfig::Memory {
            zones: vec!["foo.com".to_string()],
            page_size: Some(5),
        };
        let provider = MemoryProviderFactory.create(&config).unwrap();
        assert_eq!(provider.provider_name(), "memory");

        let config = ProviderConfig::DigitalOcean {
            api_token: "token".to_string(),
            base_url: None,
            page_size: None,
        };
        assert!(MemoryProviderFactory.create(&config).is_err());
    }
}
