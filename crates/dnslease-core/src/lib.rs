// # dnslease-core
//
// Core library for the DNS-lease active/passive coordination system:
// exactly one of two geographically separated sites collects telemetry
// from devices that cannot tolerate concurrent scraping. Authority is a
// DNS record pair — an A record clients resolve plus a TXT lease
// `owner=<site> exp=<unix_seconds>` — so neither site needs to reach
// the other to know who is active; both observe shared DNS state.
//
// ## Architecture Overview
//
// - **Lease / Site**: the authority model and its TXT wire codec
// - **DnsBackend**: trait for reading/writing the record pair, with a
//   registry of per-provider factories (`DNS_PROVIDER` selects one)
// - **HealthCheck**: three-valued liveness oracle (TCP connect or
//   metric liveness) consulted by the DR loop
// - **Coordinator**: the state machine — primary renewer, DR takeover
//   guard, operator-initiated failback
// - **WatcherEngine**: DR-side loop translating the resolved A record
//   into start/stop actions on the external collector
//
// ## Design Principles
//
// 1. **Fail closed**: no state-changing write without a readable lease
// 2. **Sequential loops**: one decision at a time, total order per site
// 3. **Pure decision core**: the DR procedure is a function of
//    (state, verdict, lease read); the loop driver is trivial
// 4. **Plugin backends**: adapters are registered, not hardcoded

pub mod backend;
pub mod clock;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod exec;
pub mod health;
pub mod lease;
pub mod registry;
pub mod traits;
pub mod watcher;

// Re-export core types for convenience
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{BackendConfig, FailoverConfig, HealthConfig, WatcherConfig};
pub use coordinator::{Coordinator, CoordinatorEvent, LeaseSummary};
pub use error::{Error, Result};
pub use lease::{Lease, Site};
pub use registry::BackendRegistry;
pub use traits::{
    AddressResolver, DnsBackend, DnsBackendFactory, HealthCheck, HealthStatus, RecordPair,
    WorkerController,
};
pub use watcher::WatcherEngine;
