// # Worker Controller Trait
//
// Defines the boundary between the watcher and the external telemetry
// worker it starts and stops. Implementations live in the watcher
// binary crate (container lifecycle via `docker`, deployment scale via
// `kubectl`).

use async_trait::async_trait;

use crate::error::Result;

/// Trait for worker lifecycle controllers
///
/// Both operations are idempotent: starting an already-running worker
/// and stopping an already-stopped one are no-ops. Calls return once
/// the worker has observably reached the target state or an internal
/// timeout fires; a timeout is an error the watcher logs and retries on
/// its next tick.
#[async_trait]
pub trait WorkerController: Send + Sync {
    /// Bring the worker up if it is not already running
    async fn ensure_running(&self) -> Result<()>;

    /// Bring the worker down, allowing `grace_secs` for a clean exit
    async fn ensure_stopped(&self, grace_secs: u64) -> Result<()>;

    /// Human-readable identity of the controlled worker, for logs
    fn worker_name(&self) -> String;
}
