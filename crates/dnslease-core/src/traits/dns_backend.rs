// # DNS Backend Trait
//
// Defines the interface for reading and writing the coordination record
// pair (one A record, one TXT record at the configured name) through an
// external authoritative DNS system.
//
// ## Implementations
//
// - Dry-run: local JSON zone file, in this crate (`backend::DryRunBackend`)
// - Cloudflare: `dnslease-backend-cloudflare` crate
// - RFC2136/TSIG: `dnslease-backend-bind` crate
// - Script escape hatch: `dnslease-backend-script` crate
//
// ## Write ordering
//
// Where the DNS system offers an atomic multi-record change (RFC2136
// update transactions, Route53 ChangeBatch), implementations MUST apply
// the A and TXT records in one change set. Where it does not, the A
// record is written FIRST, then the TXT record: an interruption between
// the two leaves the lease metadata naming the old owner, which the
// state machine re-evaluates; clients briefly resolving the new address
// without an updated lease is harmless.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

use crate::config::FailoverConfig;
use crate::error::Result;
use crate::lease::Site;

/// Raw record pair as read from the DNS system
///
/// Field names mirror the record types; this is also the exact JSON
/// shape the script backend's read program must print.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordPair {
    /// The A record value, if present
    #[serde(rename = "A")]
    pub a: Option<String>,

    /// The TXT record value, if present (lease parsing happens outside
    /// the backend)
    #[serde(rename = "TXT")]
    pub txt: Option<String>,
}

/// Trait for DNS backend adapters
///
/// Adapters are thin, stateless translators to one DNS system's API.
/// All coordination decisions (when to write, how to react to failures,
/// retry cadence) belong to the coordinator; adapters perform exactly
/// the requested operation once and report the outcome.
///
/// # Error mapping
///
/// - Transient 5xx responses and timeouts map to [`Error::Network`] so
///   the caller retries on its next iteration.
/// - 4xx and credential failures map to [`Error::Auth`] and are not
///   retried blindly.
/// - An adapter must never report success for a half-applied pair: either
///   both records observe the new values, or the call returns an error
///   (subject to the A-before-TXT ordering caveat above).
///
/// [`Error::Network`]: crate::Error::Network
/// [`Error::Auth`]: crate::Error::Auth
#[async_trait]
pub trait DnsBackend: Send + Sync {
    /// Replace the A and TXT records at the configured name
    ///
    /// Idempotent: repeating a call with the same arguments leaves the
    /// zone in the same state.
    async fn set_records(
        &self,
        ip: Ipv4Addr,
        owner: Site,
        expires_at: u64,
        ttl: u32,
    ) -> Result<()>;

    /// Read the current record pair
    ///
    /// Absent records come back as `None`; only transport-level failures
    /// are errors.
    async fn get_records(&self) -> Result<RecordPair>;

    /// Adapter name for logging (e.g. "cloudflare", "bind-tsig")
    fn backend_name(&self) -> &'static str;
}

/// Helper trait for constructing backends from configuration
pub trait DnsBackendFactory: Send + Sync {
    /// Create a backend instance
    ///
    /// The full coordinator configuration is provided because adapters
    /// need the record name, zone and server in addition to their own
    /// [`BackendConfig`](crate::config::BackendConfig) variant.
    fn create(&self, config: &FailoverConfig) -> Result<Box<dyn DnsBackend>>;

    /// The backend type name this factory serves (the `DNS_PROVIDER` value)
    fn type_name(&self) -> &'static str;
}
