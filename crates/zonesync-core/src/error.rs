//! Error types for the zonesync system
//!
//! This module defines all error types used throughout the crate.
//!
//! The variants fall into three groups:
//! - inventory failures ([`Error::ZoneList`], [`Error::RecordList`]) abort a cycle
//! - [`Error::RecordMutation`] is collected per operation and reported after the cycle
//! - construction failures ([`Error::Credential`], [`Error::Config`]) prevent the engine from starting
//!
//! A record whose name falls outside every managed zone is not an error at all.

use crate::model::{ChangeAction, RecordType};
use thiserror::Error;

/// Result type alias for zonesync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the zonesync system
#[derive(Error, Debug)]
pub enum Error {
    /// Listing the provider's zones failed
    #[error("Zone list error: {0}")]
    ZoneList(String),

    /// Listing the records of one zone failed
    #[error("Record list error in zone {zone}: {message}")]
    RecordList {
        /// Zone whose records could not be listed
        zone: String,
        /// Underlying failure
        message: String,
    },

    /// A create, edit or delete call failed for one record
    #[error("Failed to {action} {record_type} record {name} in zone {zone}: {message}")]
    RecordMutation {
        /// Operation that was attempted
        action: ChangeAction,
        /// Zone the record belongs to
        zone: String,
        /// Fully-qualified record name
        name: String,
        /// Record type
        record_type: RecordType,
        /// Underlying failure
        message: String,
    },

    /// Missing or invalid provider credentials
    #[error("Credential error: {0}")]
    Credential(String),

    /// The cycle was cancelled before all operations were issued
    #[error("Cycle cancelled")]
    Cancelled,

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(String),

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Rate limiting errors
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Record or zone not found at the provider
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Provider-specific error
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a zone list error
    pub fn zone_list(msg: impl Into<String>) -> Self {
        Self::ZoneList(msg.into())
    }

    /// Create a record list error for a zone
    pub fn record_list(zone: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::RecordList {
            zone: zone.into(),
            message: msg.into(),
        }
    }

    /// Create a credential error
    pub fn credential(msg: impl Into<String>) -> Self {
        Self::Credential(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a rate limit error
    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::RateLimited(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Whether this error aborts the whole cycle rather than a single operation
    pub fn is_fatal_to_cycle(&self) -> bool {
        matches!(
            self,
            Self::ZoneList(_) | Self::RecordList { .. } | Self::Cancelled
        )
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
