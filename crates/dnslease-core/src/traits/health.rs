// # Health Check Trait
//
// Defines the interface for the health oracle consulted by the DR
// coordinator. Implementations live in `crate::health` (TCP connect and
// metric liveness).

use async_trait::async_trait;
use std::fmt;

/// Three-valued liveness verdict about the currently-active site
///
/// `Unknown` means the oracle could not form an opinion (probe error,
/// unparseable response). The coordinator counts it against the failure
/// streak the same way as `Unhealthy`; the distinction exists for logs
/// and for oracles that must not mutate their state on blind samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    /// The active site shows signs of life
    Healthy,
    /// The active site is observably down or wedged
    Unhealthy,
    /// No information could be gathered this interval
    Unknown,
}

impl HealthStatus {
    /// Whether this verdict counts toward the failure streak
    pub fn counts_as_failure(self) -> bool {
        !matches!(self, HealthStatus::Healthy)
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Unhealthy => "unhealthy",
            HealthStatus::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Trait for health oracle implementations
///
/// Called at most once per DR decision iteration. Implementations may
/// keep state across calls (the metric oracle tracks the last counter
/// value), hence `&mut self`. Probe failures are not errors: they map
/// to a verdict.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    /// Evaluate the active site once
    async fn check(&mut self) -> HealthStatus;
}
