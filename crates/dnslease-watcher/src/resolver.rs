//! Resolver implementations for the watcher
//!
//! Two ways to observe the coordination record: the system resolver
//! (what every other client on the box sees) or a direct query to a
//! configured authoritative server, which bypasses local caching and
//! reacts to failover within one record TTL.

use async_trait::async_trait;
use hickory_resolver::config::{NameServerConfigGroup, ResolverConfig, ResolverOpts};
use hickory_resolver::TokioAsyncResolver;
use std::net::{IpAddr, Ipv4Addr};

use dnslease_core::traits::AddressResolver;
use dnslease_core::{Error, Result};

/// Resolver backed by hickory, in either system or direct mode
pub struct HickoryResolver {
    resolver: TokioAsyncResolver,
    description: String,
}

impl HickoryResolver {
    /// Resolver using the system configuration (/etc/resolv.conf)
    pub fn system() -> Result<Self> {
        let resolver = TokioAsyncResolver::tokio_from_system_conf()
            .map_err(|e| Error::config(format!("system resolver unavailable: {e}")))?;
        Ok(Self {
            resolver,
            description: "system".to_string(),
        })
    }

    /// Resolver querying one server directly, with caching disabled
    pub fn direct(server: &str) -> Result<Self> {
        let ip: IpAddr = server.parse().map_err(|_| {
            Error::config(format!("DNS_SERVER must be an IP address, got {server:?}"))
        })?;

        let config = ResolverConfig::from_parts(
            None,
            vec![],
            NameServerConfigGroup::from_ips_clear(&[ip], 53, true),
        );
        let mut opts = ResolverOpts::default();
        opts.cache_size = 0;

        Ok(Self {
            resolver: TokioAsyncResolver::tokio(config, opts),
            description: format!("direct({server})"),
        })
    }
}

#[async_trait]
impl AddressResolver for HickoryResolver {
    async fn resolve_a(&self, fqdn: &str) -> Result<Ipv4Addr> {
        let lookup = self.resolver.ipv4_lookup(fqdn).await.map_err(|e| {
            Error::network(format!("{} lookup of {fqdn} failed: {e}", self.description))
        })?;

        lookup
            .iter()
            .next()
            .map(|a| a.0)
            .ok_or_else(|| Error::not_found(format!("no A record for {fqdn}")))
    }
}
