// # Address Resolver Trait
//
// The watcher observes the coordination record the same way clients do:
// by resolving its A record. This trait exists so the loop can be
// driven with the system resolver, a direct query to a configured
// server, or canned responses in tests.

use async_trait::async_trait;
use std::net::Ipv4Addr;

use crate::error::Result;

/// Trait for A-record resolution
#[async_trait]
pub trait AddressResolver: Send + Sync {
    /// Resolve `fqdn` to a single IPv4 address
    ///
    /// When the name resolves to several addresses, the first is
    /// returned; the coordination record only ever carries one.
    async fn resolve_a(&self, fqdn: &str) -> Result<Ipv4Addr>;
}
