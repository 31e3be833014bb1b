// # Script DNS Backend
//
// Integrates DNS platforms nothing else speaks to: the operator supplies
// two programs, written in any language.
//
// **Set program** — invoked when the record pair must change:
//
// ```text
// $1=record  $2=ip  $3=owner  $4=expiry_unix  $5=ttl  $6=zone
// ```
//
// Nonzero exit means the write failed. **Get program** — invoked to read
// current state:
//
// ```text
// $1=record  $2=zone
// stdout: {"A": "10.10.10.10", "TXT": "owner=primary exp=1699567890"}
// ```
//
// Both also receive the parameters as `DNS_*` environment variables for
// convenience, and both run under a hard 30-second wall-time deadline
// with captured output.

use async_trait::async_trait;
use std::net::Ipv4Addr;

use dnslease_core::config::BackendConfig;
use dnslease_core::exec::{run_with_deadline, SCRIPT_DEADLINE};
use dnslease_core::registry::BackendRegistry;
use dnslease_core::traits::{DnsBackend, DnsBackendFactory, RecordPair};
use dnslease_core::{Error, FailoverConfig, Result, Site};

/// Backend invoking operator-supplied set/get programs
#[derive(Debug, Clone)]
pub struct ScriptBackend {
    set_program: String,
    get_program: String,
    record_name: String,
    zone: String,
    server: String,
}

impl ScriptBackend {
    /// Create a backend around the two programs
    pub fn new(
        set_program: impl Into<String>,
        get_program: impl Into<String>,
        record_name: impl Into<String>,
        zone: impl Into<String>,
        server: impl Into<String>,
    ) -> Self {
        Self {
            set_program: set_program.into(),
            get_program: get_program.into(),
            record_name: record_name.into(),
            zone: zone.into(),
            server: server.into(),
        }
    }

    fn common_envs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("DNS_RECORD", self.record_name.clone()),
            ("DNS_ZONE", self.zone.clone()),
            ("DNS_SERVER", self.server.clone()),
        ]
    }
}

#[async_trait]
impl DnsBackend for ScriptBackend {
    async fn set_records(
        &self,
        ip: Ipv4Addr,
        owner: Site,
        expires_at: u64,
        ttl: u32,
    ) -> Result<()> {
        let args = vec![
            self.record_name.clone(),
            ip.to_string(),
            owner.to_string(),
            expires_at.to_string(),
            ttl.to_string(),
            self.zone.clone(),
        ];

        let mut envs = self.common_envs();
        envs.push(("DNS_IP", ip.to_string()));
        envs.push(("DNS_OWNER", owner.to_string()));
        envs.push(("DNS_EXPIRY", expires_at.to_string()));
        envs.push(("DNS_TTL", ttl.to_string()));

        let output =
            run_with_deadline(&self.set_program, &args, &envs, None, SCRIPT_DEADLINE)
                .await
                .map_err(|e| Error::backend_write(format!("SCRIPT_SET failed: {e}")))?;

        if !output.success() {
            return Err(Error::backend_write(format!(
                "SCRIPT_SET failed: {}",
                output.failure_message()
            )));
        }

        tracing::info!(record = %self.record_name, a = %ip, owner = %owner, exp = expires_at, "[script] records written");
        Ok(())
    }

    async fn get_records(&self) -> Result<RecordPair> {
        let args = vec![self.record_name.clone(), self.zone.clone()];

        let output = run_with_deadline(
            &self.get_program,
            &args,
            &self.common_envs(),
            None,
            SCRIPT_DEADLINE,
        )
        .await
        .map_err(|e| Error::backend_read(format!("SCRIPT_GET failed: {e}")))?;

        if !output.success() {
            return Err(Error::backend_read(format!(
                "SCRIPT_GET failed: {}",
                output.failure_message()
            )));
        }

        serde_json::from_str(output.stdout.trim())
            .map_err(|e| Error::backend_read(format!("SCRIPT_GET returned invalid JSON: {e}")))
    }

    fn backend_name(&self) -> &'static str {
        "script"
    }
}

/// Factory for script backends
pub struct ScriptFactory;

impl DnsBackendFactory for ScriptFactory {
    fn create(&self, config: &FailoverConfig) -> Result<Box<dyn DnsBackend>> {
        match &config.backend {
            BackendConfig::Script { set_program, get_program } => {
                Ok(Box::new(ScriptBackend::new(
                    set_program.clone(),
                    get_program.clone(),
                    config.dns_record.clone(),
                    config.dns_zone.clone(),
                    config.dns_server.clone(),
                )))
            }
            _ => Err(Error::config("invalid config for script backend")),
        }
    }

    fn type_name(&self) -> &'static str {
        "script"
    }
}

/// Register the script backend with a registry
pub fn register(registry: &BackendRegistry) {
    registry.register(Box::new(ScriptFactory));
}
