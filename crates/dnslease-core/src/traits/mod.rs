//! Core trait definitions
//!
//! These traits are the seams of the system:
//! - [`DnsBackend`]: reading and writing the coordination record pair
//! - [`HealthCheck`]: liveness verdicts about the active site
//! - [`WorkerController`]: starting and stopping the telemetry worker
//! - [`AddressResolver`]: resolving the coordination name like a client would

pub mod dns_backend;
pub mod health;
pub mod resolver;
pub mod worker;

pub use dns_backend::{DnsBackend, DnsBackendFactory, RecordPair};
pub use health::{HealthCheck, HealthStatus};
pub use resolver::AddressResolver;
pub use worker::WorkerController;
