// # Cloudflare DNS Backend
//
// Maintains the coordination record pair through the Cloudflare API v4.
//
// Cloudflare has no multi-record change sets, so the pair is applied
// sequentially, A record first, then TXT: an interruption between the
// two leaves the lease metadata naming the old owner, which the
// coordinator re-evaluates on its next read.
//
// ## Error mapping
//
// - 401/403 → `Error::Auth` (not retryable; fix the token)
// - 404 → `Error::NotFound`
// - 409 → `Error::Conflict`
// - 429 and 5xx → `Error::Network` (the coordinator retries next tick)
//
// ## Security
//
// The API token never appears in logs or `Debug` output.
//
// ## API Reference
//
// - List records: GET `/zones/:zone_id/dns_records?type=...&name=...`
// - Update:       PUT `/zones/:zone_id/dns_records/:record_id`
// - Create:       POST `/zones/:zone_id/dns_records`

use async_trait::async_trait;
use serde_json::{json, Value};
use std::net::Ipv4Addr;
use std::time::Duration;

use dnslease_core::config::BackendConfig;
use dnslease_core::lease::Lease;
use dnslease_core::registry::BackendRegistry;
use dnslease_core::traits::{DnsBackend, DnsBackendFactory, RecordPair};
use dnslease_core::{Error, FailoverConfig, Result, Site};

/// Cloudflare API base URL
const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Timeout for individual API requests
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Cloudflare DNS backend
pub struct CloudflareBackend {
    /// ⚠️ never log this value
    api_token: String,
    zone_id: String,
    record_name: String,
    client: reqwest::Client,
}

// The Debug implementation intentionally hides the API token.
impl std::fmt::Debug for CloudflareBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareBackend")
            .field("api_token", &"<REDACTED>")
            .field("zone_id", &self.zone_id)
            .field("record_name", &self.record_name)
            .finish()
    }
}

/// Map a non-success Cloudflare response status to an error kind
fn status_error(status: u16, context: &str, body: &str) -> Error {
    match status {
        401 | 403 => Error::auth(format!(
            "{context}: invalid API token or insufficient permissions (status {status})"
        )),
        404 => Error::not_found(format!("{context}: status {status}")),
        409 => Error::conflict(format!(
            "{context}: record is being modified by another process (status {status})"
        )),
        429 => Error::network(format!("{context}: rate limited (status {status})")),
        500..=599 => Error::network(format!(
            "{context}: Cloudflare server error (status {status}) - {body}"
        )),
        _ => Error::network(format!("{context}: status {status} - {body}")),
    }
}

impl CloudflareBackend {
    /// Create a backend for one record in one zone
    pub fn new(
        api_token: impl Into<String>,
        zone_id: impl Into<String>,
        record_name: impl Into<String>,
    ) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.is_empty() {
            return Err(Error::config("Cloudflare API token cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_token,
            zone_id: zone_id.into(),
            record_name: record_name.into(),
            client,
        })
    }

    async fn api_get(&self, url: &str, context: &str) -> Result<Value> {
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(|e| Error::network(format!("{context}: HTTP request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, context, &body));
        }

        response
            .json()
            .await
            .map_err(|e| Error::network(format!("{context}: failed to parse response: {e}")))
    }

    /// Find the existing record of `record_type` at the coordination name
    async fn find_record(&self, record_type: &str) -> Result<Option<Value>> {
        let url = format!(
            "{}/zones/{}/dns_records?type={}&name={}",
            CLOUDFLARE_API_BASE, self.zone_id, record_type, self.record_name
        );
        let json = self.api_get(&url, "record lookup").await?;

        Ok(json["result"]
            .as_array()
            .and_then(|records| records.first())
            .cloned())
    }

    /// Create or replace one record
    async fn upsert_record(&self, record_type: &str, content: &str, ttl: u32) -> Result<()> {
        let existing = self.find_record(record_type).await?;
        let payload = json!({
            "type": record_type,
            "name": self.record_name,
            "content": content,
            "ttl": ttl,
        });

        let context = format!("{record_type} record write");
        let request = match existing.as_ref().and_then(|r| r["id"].as_str()) {
            Some(record_id) => self.client.put(format!(
                "{}/zones/{}/dns_records/{}",
                CLOUDFLARE_API_BASE, self.zone_id, record_id
            )),
            None => self.client.post(format!(
                "{}/zones/{}/dns_records",
                CLOUDFLARE_API_BASE, self.zone_id
            )),
        };

        let response = request
            .bearer_auth(&self.api_token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::network(format!("{context}: HTTP request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &context, &body));
        }

        Ok(())
    }
}

#[async_trait]
impl DnsBackend for CloudflareBackend {
    async fn set_records(
        &self,
        ip: Ipv4Addr,
        owner: Site,
        expires_at: u64,
        ttl: u32,
    ) -> Result<()> {
        let txt = Lease::new(owner, expires_at).to_txt();

        // A first, then TXT (no change-batch support).
        self.upsert_record("A", &ip.to_string(), ttl).await?;
        self.upsert_record("TXT", &txt, ttl).await?;

        tracing::info!(record = %self.record_name, a = %ip, txt = %txt, "[cloudflare] records written");
        Ok(())
    }

    async fn get_records(&self) -> Result<RecordPair> {
        let a = self
            .find_record("A")
            .await?
            .and_then(|r| r["content"].as_str().map(str::to_string));
        let txt = self
            .find_record("TXT")
            .await?
            .and_then(|r| r["content"].as_str().map(str::to_string));

        Ok(RecordPair { a, txt })
    }

    fn backend_name(&self) -> &'static str {
        "cloudflare"
    }
}

/// Factory for Cloudflare backends
pub struct CloudflareFactory;

impl DnsBackendFactory for CloudflareFactory {
    fn create(&self, config: &FailoverConfig) -> Result<Box<dyn DnsBackend>> {
        match &config.backend {
            BackendConfig::Cloudflare { api_token, zone_id } => Ok(Box::new(
                CloudflareBackend::new(
                    api_token.clone(),
                    zone_id.clone(),
                    config.dns_record.clone(),
                )?,
            )),
            _ => Err(Error::config("invalid config for cloudflare backend")),
        }
    }

    fn type_name(&self) -> &'static str {
        "cloudflare"
    }
}

/// Register the Cloudflare backend with a registry
pub fn register(registry: &BackendRegistry) {
    registry.register(Box::new(CloudflareFactory));
}
