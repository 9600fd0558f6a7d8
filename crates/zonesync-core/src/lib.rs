// # zonesync-core
//
// Core library for declarative DNS record synchronization.
//
// ## Architecture Overview
//
// This library keeps the records of a DNS provider account in line with a
// desired endpoint set:
// - **DomainFilter**: Restricts which zones may be touched
// - **paginate**: Walks any cursor-paged provider collection
// - **suitable_zone**: Picks the most specific zone for a record name
// - **translate**: Turns a Changes set into ordered single-record operations
// - **SyncEngine**: Resolves ids and applies operations, zone by zone
// - **Plan**: Diffs observed against desired endpoints
// - **DnsProvider**: Trait for provider accounts
// - **ProviderRegistry**: Plugin-based registry for DNS providers
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from provider backends
// 2. **No Cross-Cycle State**: Zones and records are listed fresh every cycle
// 3. **Plugin-Based**: Providers are registered dynamically, no hard-coded if-else
// 4. **Library-First**: All core functionality can be used as a library
// 5. **Self-Healing**: A partially applied cycle is repaired by the next one

pub mod traits;
pub mod model;
pub mod domain_filter;
pub mod pagination;
pub mod resolver;
pub mod translate;
pub mod plan;
pub mod engine;
pub mod registry;
pub mod config;
pub mod error;
pub mod provider;

// Re-export core types for convenience
pub use traits::{DnsProvider, DnsProviderFactory};
pub use model::{
    ChangeAction, Changes, Endpoint, ProviderRecord, RecordDraft, RecordId, RecordType, Zone,
};
pub use domain_filter::DomainFilter;
pub use pagination::{Cursor, Page, paginate};
pub use resolver::suitable_zone;
pub use translate::{TaggedOperation, plan_operations, translate, translate_updates};
pub use plan::{Plan, PlanPolicy};
pub use engine::{ApplyReport, CancelHandle, CancelSignal, SyncEngine, SyncEvent, cancel_pair};
pub use registry::ProviderRegistry;
pub use config::{EngineConfig, ProviderConfig, SyncConfig, ZoneMissPolicy};
pub use error::{Error, Result};
pub use provider::MemoryProvider;
