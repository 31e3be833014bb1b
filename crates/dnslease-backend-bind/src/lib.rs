// # RFC2136 DNS Backend (nsupdate + TSIG)
//
// Maintains the coordination record pair on a BIND-compatible server
// through dynamic updates. The whole pair — delete A, delete TXT, add
// A, add TXT — is sent as ONE update transaction terminated by a single
// `send`, so the server applies it atomically; this is the write
// ordering the protocol prefers wherever a backend supports it.
//
// Reads go through `dig @server <record> <type> +short`.
//
// Both tools run under the bounded-wait exec helper: writes get 10
// seconds, reads 5, and a blown deadline surfaces as a retryable
// network error.

use async_trait::async_trait;
use std::net::Ipv4Addr;
use std::time::Duration;

use dnslease_core::config::BackendConfig;
use dnslease_core::exec::run_with_deadline;
use dnslease_core::lease::Lease;
use dnslease_core::registry::BackendRegistry;
use dnslease_core::traits::{DnsBackend, DnsBackendFactory, RecordPair};
use dnslease_core::{Error, FailoverConfig, Result, Site};

const UPDATE_DEADLINE: Duration = Duration::from_secs(10);
const QUERY_DEADLINE: Duration = Duration::from_secs(5);

/// RFC2136 backend driving `nsupdate` with a TSIG key
#[derive(Debug, Clone)]
pub struct BindTsigBackend {
    server: String,
    zone: String,
    record_name: String,
    keyfile: String,
}

impl BindTsigBackend {
    /// Create a backend for one record in one zone
    pub fn new(
        server: impl Into<String>,
        zone: impl Into<String>,
        record_name: impl Into<String>,
        keyfile: impl Into<String>,
    ) -> Self {
        Self {
            server: server.into(),
            zone: zone.into(),
            record_name: record_name.into(),
            keyfile: keyfile.into(),
        }
    }

    /// The nsupdate command stream replacing both records in one transaction
    fn update_script(&self, ip: Ipv4Addr, txt_value: &str, ttl: u32) -> String {
        format!(
            "server {server}\n\
             zone {zone}\n\
             update delete {record} A\n\
             update delete {record} TXT\n\
             update add {record} {ttl} A {ip}\n\
             update add {record} {ttl} TXT \"{txt_value}\"\n\
             send\n",
            server = self.server,
            zone = self.zone,
            record = self.record_name,
        )
    }

    async fn dig_short(&self, record_type: &str) -> Result<Option<String>> {
        let args = vec![
            format!("@{}", self.server),
            self.record_name.clone(),
            record_type.to_string(),
            "+short".to_string(),
        ];

        let output = run_with_deadline("dig", &args, &[], None, QUERY_DEADLINE)
            .await
            .map_err(|e| Error::backend_read(format!("dig {record_type} failed: {e}")))?;

        if !output.success() {
            return Err(Error::backend_read(format!(
                "dig {record_type} failed: {}",
                output.failure_message()
            )));
        }

        // +short prints one value per line; the pair holds a single
        // record of each type, so the first line is the answer.
        Ok(parse_short_answer(&output.stdout))
    }
}

/// First line of a `dig +short` answer, quotes stripped
fn parse_short_answer(stdout: &str) -> Option<String> {
    stdout
        .lines()
        .map(|line| line.trim().replace('"', ""))
        .find(|line| !line.is_empty())
}

#[async_trait]
impl DnsBackend for BindTsigBackend {
    async fn set_records(
        &self,
        ip: Ipv4Addr,
        owner: Site,
        expires_at: u64,
        ttl: u32,
    ) -> Result<()> {
        let txt = Lease::new(owner, expires_at).to_txt();
        let script = self.update_script(ip, &txt, ttl);

        let args = vec!["-k".to_string(), self.keyfile.clone()];
        let output = run_with_deadline("nsupdate", &args, &[], Some(&script), UPDATE_DEADLINE)
            .await
            .map_err(|e| Error::backend_write(format!("nsupdate failed: {e}")))?;

        if !output.success() {
            return Err(Error::backend_write(format!(
                "nsupdate failed: {}",
                output.failure_message()
            )));
        }

        tracing::info!(record = %self.record_name, a = %ip, txt = %txt, "[bind-tsig] records written");
        Ok(())
    }

    async fn get_records(&self) -> Result<RecordPair> {
        let a = self.dig_short("A").await?;
        let txt = self.dig_short("TXT").await?;
        Ok(RecordPair { a, txt })
    }

    fn backend_name(&self) -> &'static str {
        "bind-tsig"
    }
}

/// Factory for RFC2136 backends
pub struct BindTsigFactory;

impl DnsBackendFactory for BindTsigFactory {
    fn create(&self, config: &FailoverConfig) -> Result<Box<dyn DnsBackend>> {
        match &config.backend {
            BackendConfig::BindTsig { keyfile } => Ok(Box::new(BindTsigBackend::new(
                config.dns_server.clone(),
                config.dns_zone.clone(),
                config.dns_record.clone(),
                keyfile.clone(),
            ))),
            _ => Err(Error::config("invalid config for bind-tsig backend")),
        }
    }

    fn type_name(&self) -> &'static str {
        "bind-tsig"
    }
}

/// Register the RFC2136 backend with a registry
pub fn register(registry: &BackendRegistry) {
    registry.register(Box::new(BindTsigFactory));
}
