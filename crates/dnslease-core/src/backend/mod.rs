//! Built-in backend adapters
//!
//! Only the dry-run adapter lives in core; real DNS systems get their
//! own crates (`dnslease-backend-cloudflare`, `dnslease-backend-bind`,
//! `dnslease-backend-script`).

mod dryrun;

pub use dryrun::{DryRunBackend, DryRunFactory};

use crate::registry::BackendRegistry;

/// Register the built-in adapters with a registry
pub fn register_builtin(registry: &BackendRegistry) {
    registry.register(Box::new(DryRunFactory));
}
