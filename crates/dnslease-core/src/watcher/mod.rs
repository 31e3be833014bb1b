//! Collector watcher
//!
//! Runs on the DR site, independent of and peer to the DR coordinator.
//! It never reads the lease TXT and never writes DNS: it simply
//! resolves the coordination name like any client would and mirrors the
//! answer onto the worker process — record points here, worker runs;
//! record points elsewhere, worker stops.

use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::config::WatcherConfig;
use crate::error::Result;
use crate::traits::{AddressResolver, WorkerController};

/// The watcher loop
pub struct WatcherEngine {
    resolver: Box<dyn AddressResolver>,
    controller: Box<dyn WorkerController>,
    config: WatcherConfig,

    /// Last observed "record points at us" flag, only for log de-duplication
    last_active: Option<bool>,
}

impl WatcherEngine {
    /// Create a watcher engine
    pub fn new(
        resolver: Box<dyn AddressResolver>,
        controller: Box<dyn WorkerController>,
        config: WatcherConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            resolver,
            controller,
            config,
            last_active: None,
        })
    }

    /// Run the loop until SIGINT/SIGTERM
    pub async fn run(&mut self) -> Result<()> {
        self.run_with_shutdown(None).await
    }

    /// Run the loop until the given shutdown signal
    ///
    /// **TESTING ONLY**: contract tests need a controlled shutdown.
    /// Production code uses [`WatcherEngine::run`].
    pub async fn run_with_shutdown(
        &mut self,
        shutdown_rx: Option<oneshot::Receiver<()>>,
    ) -> Result<()> {
        info!(
            record = %self.config.dns_record,
            my_ip = %self.config.my_ip,
            interval = self.config.check_interval,
            worker = %self.controller.worker_name(),
            "watcher started"
        );

        let interval = Duration::from_secs(self.config.check_interval);
        let mut shutdown_rx = shutdown_rx;

        loop {
            self.tick().await;

            let stop = if let Some(rx) = shutdown_rx.as_mut() {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => false,
                    _ = rx => true,
                }
            } else {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => false,
                    _ = tokio::signal::ctrl_c() => true,
                }
            };

            if stop {
                info!("shutdown signal received");
                return Ok(());
            }
        }
    }

    /// One resolution check
    ///
    /// Exposed so contract tests can drive the loop directly.
    pub async fn tick(&mut self) {
        let resolved = match self.resolver.resolve_a(&self.config.dns_record).await {
            Ok(ip) => ip,
            Err(e) => {
                // No information: preserve the current worker state.
                warn!(record = %self.config.dns_record, error = %e, "DNS lookup failed - keeping current state");
                return;
            }
        };

        let active = resolved == self.config.my_ip;
        if self.last_active != Some(active) {
            if active {
                info!(resolved = %resolved, "DNS points to us - activating worker");
            } else {
                info!(resolved = %resolved, "DNS points elsewhere - deactivating worker");
            }
            self.last_active = Some(active);
        }

        // Controllers are idempotent, so asserting the target state every
        // tick also restarts a worker that died while we are active.
        let result = if active {
            self.controller.ensure_running().await
        } else {
            self.controller
                .ensure_stopped(self.config.stop_grace_secs)
                .await
        };

        match result {
            Ok(()) => debug!(active, "worker state asserted"),
            Err(e) => warn!(error = %e, "worker control failed; will retry next tick"),
        }
    }
}
