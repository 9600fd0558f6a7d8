//! Core traits for the zonesync system
//!
//! - [`DnsProvider`]: list zones and records, mutate records via provider APIs
//! - [`DnsProviderFactory`]: build providers from configuration

pub mod dns_provider;

pub use dns_provider::{DnsProvider, DnsProviderFactory};
