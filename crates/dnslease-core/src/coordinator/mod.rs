//! Lease coordinator
//!
//! Drives the DNS lease forward according to role:
//!
//! - **primary**: re-assert `A=primary_ip`, `TXT=owner=primary` every
//!   `UPDATE_INTERVAL` seconds. Write-only; the primary never reads the
//!   lease.
//! - **dr**: one observation per interval (health verdict + lease read)
//!   fed through the pure decision procedure in [`decision`], which
//!   gates the takeover write behind the failure streak and the lease
//!   expiry.
//!
//! ```text
//! ┌─────────────┐  check()   ┌──────────────┐  set/get   ┌────────────┐
//! │ HealthCheck │───────────▶│ Coordinator  │───────────▶│ DnsBackend │
//! └─────────────┘            └──────┬───────┘            └────────────┘
//!                                   │ events
//!                                   ▼
//!                            (logs, tests)
//! ```
//!
//! The loop is strictly sequential: one decision at a time, suspension
//! only at the interval sleep and inside timeout-bounded I/O. Shutdown
//! lets the in-flight iteration finish.

pub mod decision;

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::clock::Clock;
use crate::config::FailoverConfig;
use crate::error::{Error, Result};
use crate::lease::{Lease, Site};
use crate::traits::{DnsBackend, HealthCheck, HealthStatus};
use decision::{step, DrAction, DrState, LeaseObservation};

/// Capacity of the coordinator event channel
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Events emitted by the coordinator
///
/// Purely informational: logs and tests consume them; dropping the
/// receiver never stalls the loop.
#[derive(Debug, Clone, PartialEq)]
pub enum CoordinatorEvent {
    /// The loop started
    Started {
        /// Role the loop runs as
        role: Site,
    },
    /// A lease write succeeded
    LeaseRenewed {
        /// Owner written into the lease
        owner: Site,
        /// Expiry written into the lease
        expires_at: u64,
    },
    /// A lease write failed
    RenewFailed {
        /// Error description
        error: String,
        /// Consecutive failed writes so far
        consecutive_failures: u32,
    },
    /// The health oracle returned a verdict
    HealthObserved {
        /// The verdict
        status: HealthStatus,
        /// Failure streak after applying it
        streak: u32,
    },
    /// The lease could not be read
    LeaseReadFailed {
        /// Error description
        error: String,
    },
    /// Takeover is blocked on a still-valid foreign lease
    WaitingForExpiry {
        /// Seconds until that lease expires
        remaining_secs: i64,
    },
    /// This site took over as active
    TakeoverCompleted {
        /// Expiry of the newly written lease
        expires_at: u64,
    },
    /// The takeover write failed; still standby
    TakeoverFailed {
        /// Error description
        error: String,
    },
    /// The lease was observed owned by the other site; reverted to standby
    StoodDown,
    /// The loop exited
    Stopped {
        /// Why
        reason: String,
    },
}

/// Structured result of the `show` operation
///
/// Fields a read error leaves unknown come back as `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaseSummary {
    /// The coordination record name
    pub record: String,
    /// Current A record value
    pub a: Option<String>,
    /// Lease owner parsed from the TXT record
    pub owner: Option<Site>,
    /// Lease expiry parsed from the TXT record
    pub expires_at: Option<u64>,
    /// Seconds until expiry (negative once expired)
    pub time_remaining_seconds: Option<i64>,
}

/// The lease state machine and its loop driver
pub struct Coordinator {
    backend: Box<dyn DnsBackend>,
    /// Only consulted in the DR role
    health: Option<Box<dyn HealthCheck>>,
    config: FailoverConfig,
    clock: Arc<dyn Clock>,

    dr_state: DrState,
    consecutive_write_failures: u32,
    event_tx: mpsc::Sender<CoordinatorEvent>,
}

impl Coordinator {
    /// Create a coordinator
    ///
    /// `health` is required for the DR role and ignored for primary.
    /// Returns the coordinator and the receiving end of its event
    /// channel.
    pub fn new(
        backend: Box<dyn DnsBackend>,
        health: Option<Box<dyn HealthCheck>>,
        config: FailoverConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<(Self, mpsc::Receiver<CoordinatorEvent>)> {
        config.validate()?;
        if config.role == Site::Dr && health.is_none() {
            return Err(Error::config("DR role requires a health oracle"));
        }

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        Ok((
            Self {
                backend,
                health,
                config,
                clock,
                dr_state: DrState::standby(),
                consecutive_write_failures: 0,
                event_tx: tx,
            },
            rx,
        ))
    }

    /// Current DR-side state
    pub fn dr_state(&self) -> DrState {
        self.dr_state
    }

    /// Run the role-selected loop until SIGINT/SIGTERM
    pub async fn run(&mut self) -> Result<()> {
        self.run_with_shutdown(None).await
    }

    /// Run the role-selected loop until the given shutdown signal
    ///
    /// **TESTING ONLY**: contract tests need a controlled shutdown.
    /// Production code uses [`Coordinator::run`], which reacts to OS
    /// signals instead.
    pub async fn run_with_shutdown(
        &mut self,
        shutdown_rx: Option<oneshot::Receiver<()>>,
    ) -> Result<()> {
        self.emit_event(CoordinatorEvent::Started {
            role: self.config.role,
        });

        match self.config.role {
            Site::Primary => {
                info!(
                    record = %self.config.dns_record,
                    interval = self.config.update_interval,
                    lease_ttl = self.config.lease_ttl,
                    "starting primary heartbeat"
                );
            }
            Site::Dr => {
                info!(
                    record = %self.config.dns_record,
                    interval = self.config.update_interval,
                    fail_threshold = self.config.fail_threshold,
                    "starting dr heartbeat"
                );
            }
        }

        let interval = Duration::from_secs(self.config.update_interval);
        let mut shutdown_rx = shutdown_rx;

        loop {
            match self.config.role {
                Site::Primary => self.primary_tick().await,
                Site::Dr => self.dr_tick().await,
            }

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
                self.emit_event(CoordinatorEvent::Stopped {
                    reason: "shutdown signal".to_string(),
                });
                return Ok(());
            }
        }
    }

    /// One primary-role iteration: re-assert the lease, nothing else
    ///
    /// Exposed so contract tests can drive the loop on a virtual clock.
    pub async fn primary_tick(&mut self) {
        match self.write_lease(Site::Primary).await {
            Ok(expires_at) => {
                self.consecutive_write_failures = 0;
                debug!(expires_at, "lease renewed");
                self.emit_event(CoordinatorEvent::LeaseRenewed {
                    owner: Site::Primary,
                    expires_at,
                });
            }
            Err(e) => {
                self.consecutive_write_failures += 1;
                error!(
                    error = %e,
                    consecutive_failures = self.consecutive_write_failures,
                    "failed to renew lease"
                );
                self.emit_event(CoordinatorEvent::RenewFailed {
                    error: e.to_string(),
                    consecutive_failures: self.consecutive_write_failures,
                });
            }
        }
    }

    /// One DR-role iteration: observe, decide, act
    ///
    /// Exposed so contract tests can drive the loop on a virtual clock.
    pub async fn dr_tick(&mut self) {
        let verdict = match self.health.as_mut() {
            Some(health) => health.check().await,
            // new() rejects this combination; treat it as no information.
            None => HealthStatus::Unknown,
        };

        let observation = match self.backend.get_records().await {
            Ok(pair) => match pair.txt {
                None => LeaseObservation::Absent,
                Some(txt) => match Lease::parse_txt(&txt) {
                    Ok(lease) => LeaseObservation::Lease(lease),
                    Err(e) => {
                        warn!(txt = %txt, error = %e, "malformed lease treated as absent");
                        LeaseObservation::Malformed
                    }
                },
            },
            Err(e) => {
                warn!(error = %e, "lease read failed; failing closed");
                self.emit_event(CoordinatorEvent::LeaseReadFailed {
                    error: e.to_string(),
                });
                LeaseObservation::ReadFailed
            }
        };

        let now = self.clock.now_unix();
        let previous = self.dr_state;
        let decided = step(
            previous,
            verdict,
            observation,
            self.config.fail_threshold,
            now,
        );

        self.emit_event(CoordinatorEvent::HealthObserved {
            status: verdict,
            streak: decided.next.streak(),
        });
        if verdict.counts_as_failure() && !previous.is_active() {
            warn!(
                status = %verdict,
                streak = decided.next.streak(),
                threshold = self.config.fail_threshold,
                "primary health check failed"
            );
        }

        self.dr_state = decided.next;

        match decided.action {
            DrAction::Sleep => {}
            DrAction::FailClosed => {
                debug!("no takeover without a readable lease");
            }
            DrAction::WaitForExpiry { remaining_secs } => {
                warn!(remaining_secs, "waiting for primary lease to expire");
                self.emit_event(CoordinatorEvent::WaitingForExpiry { remaining_secs });
            }
            DrAction::StandDown => {
                info!("lease held by the other site; reverting to standby");
                self.emit_event(CoordinatorEvent::StoodDown);
            }
            DrAction::Renew => match self.write_lease(Site::Dr).await {
                Ok(expires_at) => {
                    self.consecutive_write_failures = 0;
                    debug!(expires_at, "dr lease renewed");
                    self.emit_event(CoordinatorEvent::LeaseRenewed {
                        owner: Site::Dr,
                        expires_at,
                    });
                }
                Err(e) => {
                    self.consecutive_write_failures += 1;
                    error!(error = %e, "failed to renew dr lease");
                    self.emit_event(CoordinatorEvent::RenewFailed {
                        error: e.to_string(),
                        consecutive_failures: self.consecutive_write_failures,
                    });
                }
            },
            DrAction::Takeover => {
                warn!("primary lease expired - initiating failover");
                match self.write_lease(Site::Dr).await {
                    Ok(expires_at) => {
                        self.consecutive_write_failures = 0;
                        info!(a = %self.config.dr_ip, expires_at, "takeover complete");
                        self.emit_event(CoordinatorEvent::TakeoverCompleted { expires_at });
                    }
                    Err(e) => {
                        // Still standby; the streak the tick computed is
                        // carried so the next iteration retries.
                        self.consecutive_write_failures += 1;
                        self.dr_state = DrState::Standby {
                            streak: previous.streak().saturating_add(1),
                        };
                        error!(error = %e, "takeover write failed");
                        self.emit_event(CoordinatorEvent::TakeoverFailed {
                            error: e.to_string(),
                        });
                    }
                }
            }
        }
    }

    /// Write `A=<site ip>`, `TXT=owner=<site> exp=now+LEASE_TTL`
    async fn write_lease(&self, owner: Site) -> Result<u64> {
        let expires_at = self.clock.now_unix() + self.config.lease_ttl;
        self.backend
            .set_records(
                self.config.site_ip(owner),
                owner,
                expires_at,
                self.config.dns_ttl,
            )
            .await?;
        Ok(expires_at)
    }

    /// Initialize the records for this site's role
    ///
    /// Refuses when a valid lease owned by the other site exists, unless
    /// `force` is set. `--force` skips the read entirely.
    pub async fn init(&self, force: bool) -> Result<()> {
        if !force {
            let pair = self.backend.get_records().await?;
            if let Some(txt) = pair.txt {
                if let Ok(lease) = Lease::parse_txt(&txt) {
                    if lease.owner != self.config.role && lease.is_valid(self.clock.now_unix()) {
                        return Err(Error::precondition(format!(
                            "a valid lease owned by {} exists (expires in {}s); \
                             use --force to overwrite",
                            lease.owner,
                            lease.remaining(self.clock.now_unix())
                        )));
                    }
                }
            }
        }

        let expires_at = self.write_lease(self.config.role).await?;
        info!(
            a = %self.config.self_ip(),
            owner = %self.config.role,
            expires_at,
            "initialized DNS records"
        );
        Ok(())
    }

    /// Operator-invoked promotion: designate the DR site active
    ///
    /// Writes regardless of the current lease.
    pub async fn promote(&self) -> Result<()> {
        let expires_at = self.write_lease(Site::Dr).await?;
        info!(a = %self.config.dr_ip, expires_at, "FAILOVER: promoted dr to active");
        Ok(())
    }

    /// Operator-invoked failback: restore the primary site as active
    ///
    /// Writes regardless of the current lease. The DR coordinator
    /// notices the overwrite on its next iteration and stands down.
    pub async fn failback(&self) -> Result<()> {
        let expires_at = self.write_lease(Site::Primary).await?;
        info!(a = %self.config.primary_ip, expires_at, "FAILBACK: restored primary as active");
        Ok(())
    }

    /// Read the records and summarize the lease
    ///
    /// Never fails: unreadable or unparseable fields come back as `None`.
    pub async fn show(&self) -> LeaseSummary {
        let mut summary = LeaseSummary {
            record: self.config.dns_record.clone(),
            a: None,
            owner: None,
            expires_at: None,
            time_remaining_seconds: None,
        };

        let pair = match self.backend.get_records().await {
            Ok(pair) => pair,
            Err(e) => {
                warn!(error = %e, "failed to read records");
                return summary;
            }
        };

        summary.a = pair.a;
        if let Some(txt) = pair.txt {
            match Lease::parse_txt(&txt) {
                Ok(lease) => {
                    summary.owner = Some(lease.owner);
                    summary.expires_at = Some(lease.expires_at);
                    summary.time_remaining_seconds =
                        Some(lease.remaining(self.clock.now_unix()));
                }
                Err(e) => warn!(txt = %txt, error = %e, "TXT record is not a lease"),
            }
        }

        summary
    }

    fn emit_event(&self, event: CoordinatorEvent) {
        // Informational only: when the channel is full the event is
        // dropped rather than stalling the decision loop.
        if self.event_tx.try_send(event).is_err() {
            debug!("event channel full, dropping event");
        }
    }
}
