// # DNS Provider Trait
//
// Defines the capability set the engine needs from a DNS provider account.
//
// ## Implementations
//
// - DigitalOcean: `zonesync-provider-digitalocean` crate
// - In-memory: `zonesync_core::provider::MemoryProvider` (tests, dry runs)
//
// ## Usage
//
// ```rust,ignore
// use zonesync_core::DnsProvider;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let provider = /* DnsProvider implementation */;
//
//     let page = provider.list_zones(None).await?;
//     for zone in page.items {
//         println!("{}", zone.name);
//     }
//
//     Ok(())
// }
// ```

use crate::model::{ProviderRecord, RecordDraft, RecordId, Zone};
use crate::pagination::{Cursor, Page};
use async_trait::async_trait;
use std::sync::Arc;

/// Trait for DNS provider implementations
///
/// Each method maps to exactly one provider API call. Listing calls are
/// paginated; the engine walks them with [`crate::pagination::paginate`].
///
/// # Thread Safety
///
/// Implementations must be thread-safe: the engine may drive different
/// zones from different tasks at the same time.
///
/// # Responsibilities
///
/// Providers translate calls to their API and report success or failure.
/// They do not:
/// - decide which records should exist (owned by the caller's planner)
/// - pick the zone of a record (owned by the engine)
/// - cache records between calls (every cycle re-lists)
/// - retry on top of the HTTP transport
///
/// A failed call is returned as an error; the engine records it and the next
/// cycle re-diffs against fresh state.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// List one page of the zones hosted by the account
    ///
    /// # Parameters
    ///
    /// - `cursor`: `None` for the first page, otherwise the previous page's `next`
    async fn list_zones(&self, cursor: Option<Cursor>) -> Result<Page<Zone>, crate::Error>;

    /// List one page of the records in a zone
    ///
    /// Record names in the result are fully qualified.
    async fn list_records(
        &self,
        zone: &Zone,
        cursor: Option<Cursor>,
    ) -> Result<Page<ProviderRecord>, crate::Error>;

    /// Create a record in a zone
    ///
    /// # Returns
    ///
    /// The record as stored by the provider, including its new identifier
    async fn create_record(
        &self,
        zone: &Zone,
        draft: &RecordDraft,
    ) -> Result<ProviderRecord, crate::Error>;

    /// Replace the data of an existing record
    ///
    /// `id` may be [`RecordId::ABSENT`]; the provider then fails with a
    /// not-found error.
    async fn edit_record(
        &self,
        zone: &Zone,
        id: RecordId,
        draft: &RecordDraft,
    ) -> Result<ProviderRecord, crate::Error>;

    /// Delete an existing record
    async fn delete_record(&self, zone: &Zone, id: RecordId) -> Result<(), crate::Error>;

    /// Get the provider name (for logging/debugging)
    ///
    /// # Returns
    ///
    /// A static string identifying the provider (e.g., "digitalocean", "memory")
    fn provider_name(&self) -> &'static str;
}

/// Helper trait for constructing DNS providers from configuration
pub trait DnsProviderFactory: Send + Sync {
    /// Create a DnsProvider instance from configuration
    ///
    /// # Parameters
    ///
    /// - `config`: Configuration specific to this provider
    ///
    /// # Returns
    ///
    /// A shared DnsProvider trait object, or [`crate::Error::Credential`]
    /// when the credentials are missing or unusable
    fn create(
        &self,
        config: &crate::config::ProviderConfig,
    ) -> Result<Arc<dyn DnsProvider>, crate::Error>;
}
