//! Configuration types for the zonesync system
//!
//! This module defines all configuration structures used throughout the crate.

use crate::domain_filter::DomainFilter;
use serde::{Deserialize, Serialize};

/// Main zonesync configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    /// DNS provider configuration
    pub provider: ProviderConfig,

    /// Zones the engine may touch (empty = all)
    #[serde(default)]
    pub domain_filter: DomainFilter,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl SyncConfig {
    /// Create a new configuration with defaults
    pub fn new(provider: ProviderConfig) -> Self {
        Self {
            provider,
            domain_filter: DomainFilter::any(),
            engine: EngineConfig::default(),
        }
    }

    /// Restrict the zones the engine may touch
    pub fn with_domain_filter(mut self, filter: DomainFilter) -> Self {
        self.domain_filter = filter;
        self
    }

    /// Replace the engine settings
    pub fn with_engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.provider.validate()?;
        self.engine.validate()?;
        Ok(())
    }
}

/// DNS provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// DigitalOcean DNS
    #[serde(rename = "digitalocean")]
    DigitalOcean {
        /// Personal access token with write scope
        api_token: String,
        /// API base URL override (defaults to the public v2 endpoint)
        #[serde(default)]
        base_url: Option<String>,
        /// Items requested per page
        #[serde(default)]
        page_size: Option<u32>,
    },

    /// In-memory provider, seeded with empty zones
    Memory {
        /// Zones to create up front
        #[serde(default)]
        zones: Vec<String>,
        /// Items returned per page
        #[serde(default)]
        page_size: Option<u32>,
    },

    /// Custom provider
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl ProviderConfig {
    /// Validate the provider configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ProviderConfig::DigitalOcean {
                api_token,
                page_size,
                ..
            } => {
                if api_token.trim().is_empty() {
                    return Err(crate::Error::credential(
                        "DigitalOcean API token cannot be empty",
                    ));
                }
                validate_page_size(*page_size)
            }
            ProviderConfig::Memory { page_size, .. } => validate_page_size(*page_size),
            ProviderConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config(
                        "Custom provider factory cannot be empty",
                    ));
                }
                if config.is_null() {
                    return Err(crate::Error::config(
                        "Custom provider config cannot be null",
                    ));
                }
                Ok(())
            }
        }
    }

    /// Get the provider type name
    pub fn type_name(&self) -> &str {
        match self {
            ProviderConfig::DigitalOcean { .. } => "digitalocean",
            ProviderConfig::Memory { .. } => "memory",
            ProviderConfig::Custom { factory, .. } => factory,
        }
    }
}

fn validate_page_size(page_size: Option<u32>) -> Result<(), crate::Error> {
    match page_size {
        Some(0) => Err(crate::Error::config("Page size must be > 0")),
        _ => Ok(()),
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig::Memory {
            zones: Vec::new(),
            page_size: None,
        }
    }
}

/// What to do with an endpoint that no managed zone owns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneMissPolicy {
    /// Skip and log a warning
    #[default]
    Log,
    /// Skip without logging (the event is still emitted)
    Silent,
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Number of zones processed at the same time
    ///
    /// Operations within one zone always run in order. 1 = fully sequential.
    #[serde(default = "default_zone_concurrency")]
    pub zone_concurrency: usize,

    /// List and resolve, but do not issue create/edit/delete calls
    #[serde(default)]
    pub dry_run: bool,

    /// Handling of endpoints outside every managed zone
    #[serde(default)]
    pub zone_miss: ZoneMissPolicy,

    /// Capacity of the internal event channel
    ///
    /// When full, new events are dropped (with a warning log).
    ///
    /// Default: 1000 events
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl EngineConfig {
    /// Validate the engine settings
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.zone_concurrency == 0 {
            return Err(crate::Error::config("Zone concurrency must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            zone_concurrency: default_zone_concurrency(),
            dry_run: false,
            zone_miss: ZoneMissPolicy::default(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_zone_concurrency() -> usize {
    1
}

fn default_event_channel_capacity() -> usize {
    1000
}
