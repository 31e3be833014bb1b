//! Configuration types for the failover system
//!
//! All configuration is environment-driven (containers are the target
//! deployment). The structures here are the validated, typed form; the
//! raw `std::env` reads live in the `from_env` constructors so both the
//! coordinator and the watcher binaries share one loading path.

use serde::{Deserialize, Serialize};
use std::env;
use std::net::Ipv4Addr;

use crate::error::{Error, Result};
use crate::lease::Site;

fn env_string(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

fn env_u64(key: &str, default: u64) -> Result<u64> {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| Error::config(format!("{key} must be an integer, got {raw:?}"))),
        Err(_) => Ok(default),
    }
}

fn env_u32(key: &str, default: u32) -> Result<u32> {
    env_u64(key, default as u64).map(|v| v as u32)
}

fn env_ipv4(key: &str, default: &str) -> Result<Ipv4Addr> {
    let raw = env_string(key, default);
    raw.parse()
        .map_err(|_| Error::config(format!("{key} must be an IPv4 address, got {raw:?}")))
}

/// Coordinator configuration, immutable for the process lifetime
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailoverConfig {
    /// Role of this process: selects the primary or DR loop
    pub role: Site,

    /// DNS zone containing the coordination record
    pub dns_zone: String,

    /// Fully qualified coordination record name
    pub dns_record: String,

    /// TTL applied to the A and TXT records (seconds)
    pub dns_ttl: u32,

    /// Authoritative server, used by backends that speak to one directly
    pub dns_server: String,

    /// Address of the primary site
    pub primary_ip: Ipv4Addr,

    /// Address of the DR site
    pub dr_ip: Ipv4Addr,

    /// Lease lifetime in seconds
    pub lease_ttl: u64,

    /// Loop cadence in seconds
    pub update_interval: u64,

    /// Consecutive unhealthy verdicts before the lease is inspected
    pub fail_threshold: u32,

    /// Health oracle selection and parameters
    pub health: HealthConfig,

    /// Backend adapter selection and parameters
    pub backend: BackendConfig,
}

impl FailoverConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let role: Site = env_string("ROLE", "primary")
            .parse()
            .map_err(|_| Error::config("ROLE must be 'primary' or 'dr'"))?;

        Ok(Self {
            role,
            dns_zone: env_string("DNS_ZONE", "example.local"),
            dns_record: env_string("DNS_RECORD", "syslog.example.local"),
            dns_ttl: env_u32("DNS_TTL", 30)?,
            dns_server: env_string("DNS_SERVER", "127.0.0.1"),
            primary_ip: env_ipv4("PRIMARY_IP", "10.10.10.10")?,
            dr_ip: env_ipv4("DR_IP", "10.20.20.10")?,
            lease_ttl: env_u64("LEASE_TTL", 60)?,
            update_interval: env_u64("UPDATE_INTERVAL", 10)?,
            fail_threshold: env_u32("FAIL_THRESHOLD", 3)?,
            health: HealthConfig::from_env()?,
            backend: BackendConfig::from_env()?,
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.dns_record.is_empty() {
            return Err(Error::config("DNS_RECORD cannot be empty"));
        }
        if self.lease_ttl <= self.update_interval {
            return Err(Error::config(format!(
                "LEASE_TTL ({}) must be > UPDATE_INTERVAL ({})",
                self.lease_ttl, self.update_interval
            )));
        }
        if self.fail_threshold == 0 {
            return Err(Error::config("FAIL_THRESHOLD must be >= 1"));
        }
        if self.primary_ip == self.dr_ip {
            return Err(Error::config("PRIMARY_IP and DR_IP must differ"));
        }
        if self.role == Site::Dr {
            self.health.validate()?;
        }
        self.backend.validate()
    }

    /// The address record value published when `site` holds the lease
    pub fn site_ip(&self, site: Site) -> Ipv4Addr {
        match site {
            Site::Primary => self.primary_ip,
            Site::Dr => self.dr_ip,
        }
    }

    /// This process's own site address
    pub fn self_ip(&self) -> Ipv4Addr {
        self.site_ip(self.role)
    }
}

/// Health oracle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum HealthConfig {
    /// TCP-connect probe against the active site
    Tcp {
        /// Host to connect to
        host: String,
        /// Port to connect to
        port: u16,
        /// Connect timeout in seconds
        timeout_secs: u64,
    },

    /// Metric-liveness probe against a text-format exposition endpoint
    Metrics {
        /// URL of the metric exposition (e.g. `http://host:8888/metrics`)
        url: String,
        /// Name of a monotonically non-decreasing counter
        metric: String,
        /// Flat readings tolerated before the verdict turns unhealthy
        stale_count: u32,
        /// Fetch timeout in seconds
        timeout_secs: u64,
    },
}

impl HealthConfig {
    fn from_env() -> Result<Self> {
        let timeout_secs = env_u64("HEALTH_TIMEOUT", 2)?;
        match env_string("HEALTH_MODE", "tcp").as_str() {
            "tcp" => Ok(HealthConfig::Tcp {
                host: env_string("HEALTH_HOST", "10.10.10.10"),
                port: env_u32("HEALTH_PORT", 6514)? as u16,
                timeout_secs,
            }),
            "metrics" => Ok(HealthConfig::Metrics {
                url: env_string("HEALTH_URL", ""),
                metric: env_string(
                    "HEALTH_METRIC",
                    "otelcol_receiver_accepted_metric_points",
                ),
                stale_count: env_u32("HEALTH_STALE_COUNT", 3)?,
                timeout_secs,
            }),
            other => Err(Error::config(format!(
                "HEALTH_MODE {other:?} is not supported. Valid modes: tcp, metrics"
            ))),
        }
    }

    /// Validate the health configuration
    pub fn validate(&self) -> Result<()> {
        match self {
            HealthConfig::Tcp { host, .. } => {
                if host.is_empty() {
                    return Err(Error::config("HEALTH_HOST cannot be empty"));
                }
                Ok(())
            }
            HealthConfig::Metrics { url, metric, stale_count, .. } => {
                if url.is_empty() {
                    return Err(Error::config(
                        "HEALTH_URL is required when HEALTH_MODE=metrics",
                    ));
                }
                if metric.is_empty() {
                    return Err(Error::config(
                        "HEALTH_METRIC is required when HEALTH_MODE=metrics",
                    ));
                }
                if *stale_count == 0 {
                    return Err(Error::config("HEALTH_STALE_COUNT must be >= 1"));
                }
                Ok(())
            }
        }
    }
}

/// DNS backend adapter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum BackendConfig {
    /// Local JSON zone file, for testing and dry runs
    DryRun {
        /// Path of the state file standing in for the zone
        state_file: String,
    },

    /// Cloudflare API
    Cloudflare {
        /// API token with DNS edit permission on the zone
        api_token: String,
        /// Zone identifier
        zone_id: String,
    },

    /// RFC2136 dynamic update via `nsupdate` with a TSIG key
    BindTsig {
        /// Path to the TSIG key file handed to `nsupdate -k`
        keyfile: String,
    },

    /// Operator-supplied set/get programs
    Script {
        /// Program invoked to write the record pair
        set_program: String,
        /// Program invoked to read the record pair
        get_program: String,
    },

    /// Externally registered adapter
    Custom {
        /// Factory name to look up in the registry
        factory: String,
        /// Adapter-specific configuration
        config: serde_json::Value,
    },
}

impl BackendConfig {
    fn from_env() -> Result<Self> {
        match env_string("DNS_PROVIDER", "dry-run").as_str() {
            "dry-run" => Ok(BackendConfig::DryRun {
                state_file: env_string("DRYRUN_STATEFILE", "/state/zone.json"),
            }),
            "cloudflare" => Ok(BackendConfig::Cloudflare {
                api_token: env_string("CLOUDFLARE_API_TOKEN", ""),
                zone_id: env_string("CLOUDFLARE_ZONE_ID", ""),
            }),
            "bind-tsig" => Ok(BackendConfig::BindTsig {
                keyfile: env_string("TSIG_KEYFILE", "/secrets/tsig.key"),
            }),
            "script" => Ok(BackendConfig::Script {
                set_program: env_string("SCRIPT_SET", ""),
                get_program: env_string("SCRIPT_GET", ""),
            }),
            other => Ok(BackendConfig::Custom {
                factory: other.to_string(),
                config: serde_json::Value::Null,
            }),
        }
    }

    /// Validate the backend configuration
    pub fn validate(&self) -> Result<()> {
        match self {
            BackendConfig::DryRun { state_file } => {
                if state_file.is_empty() {
                    return Err(Error::config("DRYRUN_STATEFILE cannot be empty"));
                }
                Ok(())
            }
            BackendConfig::Cloudflare { api_token, zone_id } => {
                if api_token.is_empty() {
                    return Err(Error::config("CLOUDFLARE_API_TOKEN required"));
                }
                if zone_id.is_empty() {
                    return Err(Error::config("CLOUDFLARE_ZONE_ID required"));
                }
                Ok(())
            }
            BackendConfig::BindTsig { keyfile } => {
                if keyfile.is_empty() {
                    return Err(Error::config("TSIG_KEYFILE cannot be empty"));
                }
                Ok(())
            }
            BackendConfig::Script { set_program, get_program } => {
                if set_program.is_empty() {
                    return Err(Error::config(
                        "SCRIPT_SET required (program that writes DNS records)",
                    ));
                }
                if get_program.is_empty() {
                    return Err(Error::config(
                        "SCRIPT_GET required (program that reads DNS records)",
                    ));
                }
                Ok(())
            }
            BackendConfig::Custom { factory, .. } => {
                if factory.is_empty() {
                    return Err(Error::config("custom backend factory cannot be empty"));
                }
                Ok(())
            }
        }
    }

    /// Registry key for this backend type
    pub fn type_name(&self) -> &str {
        match self {
            BackendConfig::DryRun { .. } => "dry-run",
            BackendConfig::Cloudflare { .. } => "cloudflare",
            BackendConfig::BindTsig { .. } => "bind-tsig",
            BackendConfig::Script { .. } => "script",
            BackendConfig::Custom { factory, .. } => factory,
        }
    }
}

/// Watcher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatcherConfig {
    /// Coordination record the watcher resolves
    pub dns_record: String,

    /// This site's address; the worker runs only while the record points here
    pub my_ip: Ipv4Addr,

    /// Seconds between resolution checks
    pub check_interval: u64,

    /// Optional authoritative server to query directly, bypassing caches
    pub dns_server: Option<String>,

    /// Grace period handed to `ensure_stopped` (seconds)
    pub stop_grace_secs: u64,
}

impl WatcherConfig {
    /// Load configuration from environment variables
    ///
    /// `MY_IP` falls back to `DR_IP`; the watcher only ever runs on the DR
    /// site and the two must name the same address.
    pub fn from_env() -> Result<Self> {
        let my_ip = env_opt("MY_IP")
            .or_else(|| env_opt("DR_IP"))
            .ok_or_else(|| Error::config("MY_IP or DR_IP must be set"))?;
        let my_ip = my_ip
            .parse()
            .map_err(|_| Error::config(format!("MY_IP must be an IPv4 address, got {my_ip:?}")))?;

        Ok(Self {
            dns_record: env_string("DNS_RECORD", "syslog.example.local"),
            my_ip,
            check_interval: env_u64("OTEL_CHECK_INTERVAL", 15)?,
            dns_server: env_opt("DNS_SERVER"),
            stop_grace_secs: 10,
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.dns_record.is_empty() {
            return Err(Error::config("DNS_RECORD cannot be empty"));
        }
        if self.check_interval == 0 {
            return Err(Error::config("OTEL_CHECK_INTERVAL must be >= 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> FailoverConfig {
        FailoverConfig {
            role: Site::Primary,
            dns_zone: "example.local".to_string(),
            dns_record: "syslog.example.local".to_string(),
            dns_ttl: 30,
            dns_server: "127.0.0.1".to_string(),
            primary_ip: "10.10.10.10".parse().unwrap(),
            dr_ip: "10.20.20.10".parse().unwrap(),
            lease_ttl: 60,
            update_interval: 10,
            fail_threshold: 3,
            health: HealthConfig::Tcp {
                host: "10.10.10.10".to_string(),
                port: 6514,
                timeout_secs: 2,
            },
            backend: BackendConfig::DryRun {
                state_file: "/state/zone.json".to_string(),
            },
        }
    }

    #[test]
    fn sample_validates() {
        sample_config().validate().unwrap();
    }

    #[test]
    fn lease_ttl_must_exceed_interval() {
        let mut cfg = sample_config();
        cfg.lease_ttl = 10;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn metrics_health_requires_url() {
        let mut cfg = sample_config();
        cfg.role = Site::Dr;
        cfg.health = HealthConfig::Metrics {
            url: String::new(),
            metric: "otelcol_receiver_accepted_metric_points".to_string(),
            stale_count: 3,
            timeout_secs: 2,
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn cloudflare_requires_token_and_zone() {
        let cfg = BackendConfig::Cloudflare {
            api_token: String::new(),
            zone_id: "abc".to_string(),
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn site_ip_follows_owner() {
        let cfg = sample_config();
        assert_eq!(cfg.site_ip(Site::Primary), cfg.primary_ip);
        assert_eq!(cfg.site_ip(Site::Dr), cfg.dr_ip);
        assert_eq!(cfg.self_ip(), cfg.primary_ip);
    }

    #[test]
    fn backend_type_names_are_stable() {
        assert_eq!(
            BackendConfig::DryRun { state_file: "x".into() }.type_name(),
            "dry-run"
        );
        assert_eq!(
            BackendConfig::BindTsig { keyfile: "k".into() }.type_name(),
            "bind-tsig"
        );
    }
}
