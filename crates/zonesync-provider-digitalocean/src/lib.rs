// # DigitalOcean DNS Provider
//
// This crate provides a DigitalOcean DNS provider implementation for zonesync.
//
// ## Implementation Status
//
// - Zones and records are listed page by page (`links.pages.next`)
// - One HTTP request per trait call; the engine owns ordering and failure policy
// - HTTP timeout configured (30 seconds)
// - Specific error handling for HTTP status codes (401/403, 404, 429, 5xx)
// - Record names are zone-relative at the API (`@` for the apex) and
//   fully-qualified everywhere else
// - No retry, backoff or caching: transient errors surface to the caller and
//   the next cycle re-lists everything
//
// ## Security Requirements
//
// - API token NEVER appears in logs
// - Provider MUST fail fast if token is empty
//
// ## API Reference
//
// - DigitalOcean API v2: https://docs.digitalocean.com/reference/api/
// - List Domains: GET `/domains?page=&per_page=`
// - List Records: GET `/domains/:domain/records?page=&per_page=`
// - Create Record: POST `/domains/:domain/records`
// - Update Record: PUT `/domains/:domain/records/:id`
// - Delete Record: DELETE `/domains/:domain/records/:id`

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use zonesync_core::config::ProviderConfig;
use zonesync_core::model::{ProviderRecord, RecordDraft, RecordId, RecordType, Zone, normalize_name};
use zonesync_core::pagination::{Cursor, Page};
use zonesync_core::traits::{DnsProvider, DnsProviderFactory};
use zonesync_core::{Error, Result};

/// DigitalOcean API base URL
pub const DIGITALOCEAN_API_BASE: &str = "https://api.digitalocean.com/v2";

/// Environment variable holding the API token
pub const TOKEN_ENV: &str = "DO_TOKEN";

/// Items requested per page unless configured
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Largest page size the API accepts
pub const MAX_PAGE_SIZE: u32 = 200;

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

const PROVIDER_NAME: &str = "digitalocean";

/// DigitalOcean DNS provider
///
/// Stateless apart from the HTTP client: every call goes to the API.
///
/// # Security
///
/// The Debug implementation intentionally does NOT expose the API token.
pub struct DigitalOceanProvider {
    /// Personal access token
    /// ⚠️ NEVER log this value
    api_token: String,

    /// API base URL without trailing slash
    base_url: String,

    /// Items requested per page
    page_size: u32,

    /// HTTP client for API requests
    client: reqwest::Client,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for DigitalOceanProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DigitalOceanProvider")
            .field("api_token", &"<REDACTED>")
            .field("base_url", &self.base_url)
            .field("page_size", &self.page_size)
            .finish()
    }
}

impl DigitalOceanProvider {
    /// Create a new DigitalOcean provider
    ///
    /// # Parameters
    ///
    /// - `api_token`: Personal access token with write scope
    /// - `base_url`: API base URL override (tests, proxies)
    /// - `page_size`: Items per page, clamped to 1..=200
    ///
    /// # Errors
    ///
    /// - `Error::Credential` if the token is empty
    /// - `Error::Http` if the HTTP client cannot be built
    pub fn new(
        api_token: impl Into<String>,
        base_url: Option<String>,
        page_size: Option<u32>,
    ) -> Result<Self> {
        let api_token = api_token.into().trim().to_string();
        if api_token.is_empty() {
            return Err(Error::credential("DigitalOcean API token cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        let base_url = base_url
            .unwrap_or_else(|| DIGITALOCEAN_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            api_token,
            base_url,
            page_size: page_size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
            client,
        })
    }

    /// Create a provider from the `DO_TOKEN` environment variable
    pub fn from_env() -> Result<Self> {
        let token = std::env::var(TOKEN_ENV)
            .map_err(|_| Error::credential(format!("{} is not set", TOKEN_ENV)))?;
        Self::new(token, None, None)
    }

    /// Items requested per page
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    fn records_url(&self, zone: &Zone) -> String {
        format!("{}/domains/{}/records", self.base_url, zone.name)
    }

    fn record_url(&self, zone: &Zone, id: RecordId) -> String {
        format!("{}/domains/{}/records/{}", self.base_url, zone.name, id)
    }

    fn paged(&self, request: reqwest::RequestBuilder, cursor: Option<Cursor>) -> reqwest::RequestBuilder {
        let page = cursor.unwrap_or_else(|| "1".to_string());
        let per_page = self.page_size.to_string();
        request.query(&[("page", page.as_str()), ("per_page", per_page.as_str())])
    }

    /// Send an authenticated request and map non-success statuses to errors
    async fn send(&self, request: reqwest::RequestBuilder, context: &str) -> Result<reqwest::Response> {
        let response = request
            .bearer_auth(&self.api_token)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|e| Error::http(format!("{}: request failed: {}", context, e)))?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read error response".to_string());
        let detail = serde_json::from_str::<ApiErrorBody>(&body)
            .map(|parsed| parsed.message)
            .unwrap_or(body);

        Err(match status.as_u16() {
            401 | 403 => Error::auth(format!(
                "{}: invalid API token or insufficient scope. Status: {}",
                context, status
            )),
            404 => Error::not_found(format!("{}: {}", context, detail)),
            429 => Error::rate_limited(format!("{}: please retry later. Status: {}", context, status)),
            500..=599 => Error::provider(
                PROVIDER_NAME,
                format!("{}: server error (transient): {} - {}", context, status, detail),
            ),
            _ => Error::provider(PROVIDER_NAME, format!("{}: {} - {}", context, status, detail)),
        })
    }

    async fn parse<T: serde::de::DeserializeOwned>(response: reqwest::Response, context: &str) -> Result<T> {
        response
            .json::<T>()
            .await
            .map_err(|e| Error::provider(PROVIDER_NAME, format!("{}: failed to parse response: {}", context, e)))
    }
}

#[async_trait]
impl DnsProvider for DigitalOceanProvider {
    async fn list_zones(&self, cursor: Option<Cursor>) -> Result<Page<Zone>> {
        let request = self.paged(self.client.get(format!("{}/domains", self.base_url)), cursor);
        let response = self.send(request, "List domains").await?;
        let body: DomainsResponse = Self::parse(response, "List domains").await?;

        let next = body.links.next_cursor()?;
        tracing::debug!("Fetched {} domains (next page: {:?})", body.domains.len(), next);

        Ok(Page::new(
            body.domains.into_iter().map(|domain| Zone::new(domain.name)).collect(),
            next,
        ))
    }

    async fn list_records(&self, zone: &Zone, cursor: Option<Cursor>) -> Result<Page<ProviderRecord>> {
        let context = format!("List records of {}", zone);
        let request = self.paged(self.client.get(self.records_url(zone)), cursor);
        let response = self.send(request, &context).await?;
        let body: RecordsResponse = Self::parse(response, &context).await?;

        let next = body.links.next_cursor()?;
        tracing::debug!(
            "Fetched {} records of {} (next page: {:?})",
            body.domain_records.len(),
            zone,
            next
        );

        Ok(Page::new(
            body.domain_records
                .into_iter()
                .map(|record| record.into_provider_record(zone))
                .collect(),
            next,
        ))
    }

    async fn create_record(&self, zone: &Zone, draft: &RecordDraft) -> Result<ProviderRecord> {
        let context = format!("Create {} record {}", draft.record_type, draft.name);
        let payload = RecordRequest::from_draft(zone, draft)?;

        tracing::debug!("POST {} {}", self.records_url(zone), payload.name);
        let request = self.client.post(self.records_url(zone)).json(&payload);
        let response = self.send(request, &context).await?;
        let body: RecordResponse = Self::parse(response, &context).await?;

        Ok(body.domain_record.into_provider_record(zone))
    }

    async fn edit_record(&self, zone: &Zone, id: RecordId, draft: &RecordDraft) -> Result<ProviderRecord> {
        let context = format!("Update {} record {} ({})", draft.record_type, draft.name, id);
        let payload = RecordRequest::from_draft(zone, draft)?;

        tracing::debug!("PUT {}", self.record_url(zone, id));
        let request = self.client.put(self.record_url(zone, id)).json(&payload);
        let response = self.send(request, &context).await?;
        let body: RecordResponse = Self::parse(response, &context).await?;

        Ok(body.domain_record.into_provider_record(zone))
    }

    async fn delete_record(&self, zone: &Zone, id: RecordId) -> Result<()> {
        let context = format!("Delete record {} in {}", id, zone);

        tracing::debug!("DELETE {}", self.record_url(zone, id));
        self.send(self.client.delete(self.record_url(zone, id)), &context)
            .await?;

        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER_NAME
    }
}

/// Zone-relative API name for a fully-qualified record name
///
/// The apex becomes `@`. Names outside the zone are rejected.
pub fn relative_name(fqdn: &str, zone: &Zone) -> Result<String> {
    let fqdn = normalize_name(fqdn);
    if fqdn == zone.name {
        return Ok("@".to_string());
    }
    fqdn.strip_suffix(&zone.name)
        .and_then(|prefix| prefix.strip_suffix('.'))
        .filter(|prefix| !prefix.is_empty())
        .map(str::to_string)
        .ok_or_else(|| Error::invalid_input(format!("{} is not inside zone {}", fqdn, zone)))
}

/// Fully-qualified name for a zone-relative API name
///
/// A name with a trailing dot is already absolute and only normalized.
pub fn absolute_name(name: &str, zone: &Zone) -> String {
    match name.trim() {
        "" | "@" => zone.name.clone(),
        absolute if absolute.ends_with('.') => normalize_name(absolute),
        relative => normalize_name(&format!("{}.{}", relative, zone.name)),
    }
}

/// Error body returned by the API
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

#[derive(Debug, Default, Deserialize)]
struct Links {
    #[serde(default)]
    pages: Option<PageLinks>,
}

#[derive(Debug, Default, Deserialize)]
struct PageLinks {
    #[serde(default)]
    next: Option<String>,
}

impl Links {
    /// The `page` query parameter of the next-page link
    fn next_cursor(&self) -> Result<Option<Cursor>> {
        let Some(next) = self.pages.as_ref().and_then(|pages| pages.next.as_deref()) else {
            return Ok(None);
        };

        let url = reqwest::Url::parse(next)
            .map_err(|e| Error::provider(PROVIDER_NAME, format!("Invalid next page link {}: {}", next, e)))?;

        url.query_pairs()
            .find(|(key, _)| key == "page")
            .map(|(_, value)| Some(value.into_owned()))
            .ok_or_else(|| Error::provider(PROVIDER_NAME, format!("Next page link has no page parameter: {}", next)))
    }
}

#[derive(Debug, Deserialize)]
struct DomainsResponse {
    #[serde(default)]
    domains: Vec<ApiDomain>,
    #[serde(default)]
    links: Links,
}

#[derive(Debug, Deserialize)]
struct ApiDomain {
    name: String,
}

#[derive(Debug, Deserialize)]
struct RecordsResponse {
    #[serde(default)]
    domain_records: Vec<ApiRecord>,
    #[serde(default)]
    links: Links,
}

#[derive(Debug, Deserialize)]
struct RecordResponse {
    domain_record: ApiRecord,
}

/// Record as the API returns it
#[derive(Debug, Deserialize)]
struct ApiRecord {
    id: u64,
    #[serde(rename = "type")]
    record_type: String,
    name: String,
    data: String,
    #[serde(default)]
    ttl: Option<u32>,
}

impl ApiRecord {
    fn into_provider_record(self, zone: &Zone) -> ProviderRecord {
        let record_type = RecordType::from(self.record_type);
        // The API echoes hostnames with or without the trailing dot
        let data = if record_type.is_hostname() {
            match self.data.trim() {
                "@" => zone.name.clone(),
                hostname => normalize_name(hostname),
            }
        } else {
            self.data
        };

        ProviderRecord {
            id: RecordId(self.id),
            name: absolute_name(&self.name, zone),
            record_type,
            data,
            ttl: self.ttl,
        }
    }
}

/// Body of create and update calls
#[derive(Debug, Serialize)]
struct RecordRequest {
    #[serde(rename = "type")]
    record_type: String,
    name: String,
    data: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    ttl: Option<u32>,
}

impl RecordRequest {
    fn from_draft(zone: &Zone, draft: &RecordDraft) -> Result<Self> {
        // Hostname data must be absolute, with the trailing dot
        let data = if draft.record_type.is_hostname() && !draft.data.ends_with('.') {
            format!("{}.", draft.data)
        } else {
            draft.data.clone()
        };

        Ok(Self {
            record_type: draft.record_type.to_string(),
            name: relative_name(&draft.name, zone)?,
            data,
            ttl: draft.ttl,
        })
    }
}

/// Factory for creating DigitalOcean providers
pub struct DigitalOceanFactory;

impl DnsProviderFactory for DigitalOceanFactory {
    fn create(&self, config: &ProviderConfig) -> Result<Arc<dyn DnsProvider>> {
        match config {
            ProviderConfig::DigitalOcean {
                api_token,
                base_url,
                page_size,
            } => {
                // An empty configured token falls back to DO_TOKEN
                let token = if api_token.trim().is_empty() {
                    std::env::var(TOKEN_ENV).map_err(|_| {
                        Error::credential(format!("No API token configured and {} is not set", TOKEN_ENV))
                    })?
                } else {
                    api_token.clone()
                };

                Ok(Arc::new(DigitalOceanProvider::new(
                    token,
                    base_url.clone(),
                    *page_size,
                )?))
            }
            _ => Err(Error::config("Invalid config for DigitalOcean provider")),
        }
    }
}

/// Register the DigitalOcean provider with a registry
///
/// # Example
///
/// ```rust
/// use zonesync_core::ProviderRegistry;
///
/// let registry = ProviderRegistry::with_builtin();
/// zonesync_provider_digitalocean::register(&registry);
/// assert!(registry.has_provider("digitalocean"));
/// ```
pub fn register(registry: &zonesync_core::ProviderRegistry) {
    registry.register_provider(PROVIDER_NAME, Box::new(DigitalOceanFactory));
}
