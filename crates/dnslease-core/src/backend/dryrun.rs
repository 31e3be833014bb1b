// # Dry-run Backend
//
// A local JSON file standing in for the DNS zone. Used for testing the
// full coordination loop on one machine, for rehearsing failovers, and
// by the contract tests.
//
// ## File format
//
// ```json
// {
//   "A": "10.10.10.10",
//   "TXT": "owner=primary exp=1699567890",
//   "updated_at": "2025-01-09T12:00:00Z"
// }
// ```
//
// Writes are atomic (temp file, then rename) so a crashed writer never
// leaves a half-written zone behind.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::config::{BackendConfig, FailoverConfig};
use crate::error::{Error, Result};
use crate::lease::{Lease, Site};
use crate::traits::{DnsBackend, DnsBackendFactory, RecordPair};

/// On-disk zone stand-in
#[derive(Debug, Serialize, Deserialize)]
struct ZoneFile {
    #[serde(rename = "A")]
    a: Option<String>,
    #[serde(rename = "TXT")]
    txt: Option<String>,
    updated_at: String,
}

/// File-backed backend for dry runs and tests
#[derive(Debug, Clone)]
pub struct DryRunBackend {
    path: PathBuf,
}

impl DryRunBackend {
    /// Create a backend writing to the given state file
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.set_extension("tmp");
        temp
    }
}

#[async_trait]
impl DnsBackend for DryRunBackend {
    async fn set_records(
        &self,
        ip: Ipv4Addr,
        owner: Site,
        expires_at: u64,
        _ttl: u32,
    ) -> Result<()> {
        let txt = Lease::new(owner, expires_at).to_txt();
        let zone = ZoneFile {
            a: Some(ip.to_string()),
            txt: Some(txt.clone()),
            updated_at: Utc::now().to_rfc3339(),
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    Error::backend_write(format!(
                        "failed to create state directory {}: {e}",
                        parent.display()
                    ))
                })?;
            }
        }

        let json = serde_json::to_string_pretty(&zone)?;

        // Write to a temp file, then rename over the live one.
        let temp_path = self.temp_path();
        {
            let mut file = fs::File::create(&temp_path).await.map_err(|e| {
                Error::backend_write(format!("failed to create {}: {e}", temp_path.display()))
            })?;
            file.write_all(json.as_bytes()).await.map_err(|e| {
                Error::backend_write(format!("failed to write {}: {e}", temp_path.display()))
            })?;
            file.flush().await.map_err(|e| {
                Error::backend_write(format!("failed to flush {}: {e}", temp_path.display()))
            })?;
        }
        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::backend_write(format!(
                "failed to rename {} to {}: {e}",
                temp_path.display(),
                self.path.display()
            ))
        })?;

        tracing::info!(a = %ip, txt = %txt, "[dry-run] records written");
        Ok(())
    }

    async fn get_records(&self) -> Result<RecordPair> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(RecordPair::default());
            }
            Err(e) => {
                return Err(Error::backend_read(format!(
                    "failed to read {}: {e}",
                    self.path.display()
                )));
            }
        };

        let zone: ZoneFile = serde_json::from_str(&content).map_err(|e| {
            Error::backend_read(format!("corrupt zone file {}: {e}", self.path.display()))
        })?;

        Ok(RecordPair {
            a: zone.a,
            txt: zone.txt,
        })
    }

    fn backend_name(&self) -> &'static str {
        "dry-run"
    }
}

/// Factory for dry-run backends
pub struct DryRunFactory;

impl DnsBackendFactory for DryRunFactory {
    fn create(&self, config: &FailoverConfig) -> Result<Box<dyn DnsBackend>> {
        match &config.backend {
            BackendConfig::DryRun { state_file } => {
                Ok(Box::new(DryRunBackend::new(state_file)))
            }
            _ => Err(Error::config("invalid config for dry-run backend")),
        }
    }

    fn type_name(&self) -> &'static str {
        "dry-run"
    }
}
