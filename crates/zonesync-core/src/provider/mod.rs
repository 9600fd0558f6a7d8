// # Provider Implementations
//
// Providers that ship with the core crate. Network-backed providers live in
// their own crates.

pub mod memory;

pub use memory::{MemoryProvider, MemoryProviderFactory};
