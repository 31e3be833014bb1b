//! The DR decision procedure as a pure function
//!
//! One call per loop iteration, total order, no I/O: the driver gathers
//! the tick's observation (health verdict + lease read) and [`step`]
//! maps it to the next in-memory state plus the single action to take.
//! This is what makes the takeover guards testable against transcripts
//! of verdicts without a running backend.

use crate::lease::{Lease, Site};
use crate::traits::HealthStatus;

/// DR-side role state
///
/// `streak` counts consecutive non-healthy verdicts since the last
/// healthy one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrState {
    /// Watching the primary, not serving
    Standby {
        /// Consecutive failed health verdicts
        streak: u32,
    },
    /// Holding the lease after a takeover ("acting primary")
    Active {
        /// Consecutive failed health verdicts
        streak: u32,
    },
}

impl DrState {
    /// Initial state of a freshly started DR coordinator
    pub fn standby() -> Self {
        DrState::Standby { streak: 0 }
    }

    /// Current failure streak
    pub fn streak(&self) -> u32 {
        match self {
            DrState::Standby { streak } | DrState::Active { streak } => *streak,
        }
    }

    /// Whether this site currently considers itself active
    pub fn is_active(&self) -> bool {
        matches!(self, DrState::Active { .. })
    }
}

/// What one backend read revealed about the lease
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaseObservation {
    /// A well-formed lease was read
    Lease(Lease),
    /// No TXT record exists at the coordination name
    Absent,
    /// A TXT record exists but does not parse as a lease
    Malformed,
    /// The backend could not be read at all
    ReadFailed,
}

/// The single action the driver performs after a decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrAction {
    /// Nothing to do until the next interval
    Sleep,
    /// Re-assert our own lease (active DR only)
    Renew,
    /// Write A and TXT to designate this site active
    Takeover,
    /// The lease now belongs to the other site: revert to standby, no writes
    StandDown,
    /// A foreign lease is still valid; takeover must wait
    WaitForExpiry {
        /// Seconds until the observed lease expires
        remaining_secs: i64,
    },
    /// The lease could not be observed: refuse any state-changing write
    FailClosed,
}

/// Outcome of one decision step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    /// State to carry into the next iteration, assuming the action succeeds
    pub next: DrState,
    /// Action for the driver to perform
    pub action: DrAction,
}

/// Advance the DR state machine by one observation
///
/// Guard order for a standby site: the health streak must reach
/// `fail_threshold` before the lease is even considered, a failed read
/// fails closed, a lease we already own short-circuits to renewal, a
/// valid foreign lease is waited out, and only then does takeover fire.
/// An active site renews every tick and stands down the moment it
/// observes a valid lease owned by the other site (operator failback).
pub fn step(
    state: DrState,
    verdict: HealthStatus,
    lease: LeaseObservation,
    fail_threshold: u32,
    now: u64,
) -> Decision {
    // Loss-of-lease observation wins over everything else while active.
    if state.is_active() {
        if let LeaseObservation::Lease(l) = lease {
            if l.owner != Site::Dr && l.is_valid(now) {
                return Decision {
                    next: DrState::Standby {
                        streak: next_streak(state.streak(), verdict),
                    },
                    action: DrAction::StandDown,
                };
            }
        }
    }

    let streak = next_streak(state.streak(), verdict);

    match state {
        DrState::Active { .. } => match lease {
            // Without a readable lease we cannot rule out a failback in
            // flight, so we do not write either.
            LeaseObservation::ReadFailed => Decision {
                next: DrState::Active { streak },
                action: DrAction::FailClosed,
            },
            _ => Decision {
                next: DrState::Active { streak },
                action: DrAction::Renew,
            },
        },

        DrState::Standby { .. } => {
            if verdict == HealthStatus::Healthy {
                return Decision {
                    next: DrState::Standby { streak: 0 },
                    action: DrAction::Sleep,
                };
            }

            if streak < fail_threshold {
                return Decision {
                    next: DrState::Standby { streak },
                    action: DrAction::Sleep,
                };
            }

            match lease {
                LeaseObservation::ReadFailed => Decision {
                    next: DrState::Standby { streak },
                    action: DrAction::FailClosed,
                },
                LeaseObservation::Lease(l) if l.owner == Site::Dr => {
                    // The lease is already ours (e.g. restart after a
                    // takeover): pick up where we left off.
                    Decision {
                        next: DrState::Active { streak: 0 },
                        action: DrAction::Renew,
                    }
                }
                LeaseObservation::Lease(l) if l.is_valid(now) => Decision {
                    next: DrState::Standby { streak },
                    action: DrAction::WaitForExpiry {
                        remaining_secs: l.remaining(now),
                    },
                },
                // Expired, absent, or malformed: the claim is gone.
                _ => Decision {
                    next: DrState::Active { streak: 0 },
                    action: DrAction::Takeover,
                },
            }
        }
    }
}

fn next_streak(streak: u32, verdict: HealthStatus) -> u32 {
    if verdict.counts_as_failure() {
        streak.saturating_add(1)
    } else {
        0
    }
}
