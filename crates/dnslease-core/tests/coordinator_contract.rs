//! Lease lifecycle contract tests
//!
//! Drives the coordinator tick-by-tick on a manual clock against an
//! in-memory backend, covering the boundary scenarios: the primary
//! renewing forever, abrupt primary death and takeover timing, a
//! DR-to-DNS partition failing closed, operator failback, and a
//! malformed TXT record.

mod common;

use common::*;
use std::sync::Arc;

use dnslease_core::coordinator::CoordinatorEvent;
use dnslease_core::traits::HealthStatus;
use dnslease_core::Clock;
use dnslease_core::{Coordinator, ManualClock, Site};

const T0: u64 = 1_000_000;

fn primary_coordinator(
    backend: &MemoryBackend,
    clock: &ManualClock,
) -> (Coordinator, tokio::sync::mpsc::Receiver<CoordinatorEvent>) {
    Coordinator::new(
        Box::new(backend.clone()),
        None,
        failover_config(Site::Primary),
        Arc::new(clock.clone()),
    )
    .expect("primary coordinator construction succeeds")
}

fn dr_coordinator(
    backend: &MemoryBackend,
    health: &ScriptedHealth,
    clock: &ManualClock,
) -> (Coordinator, tokio::sync::mpsc::Receiver<CoordinatorEvent>) {
    Coordinator::new(
        Box::new(backend.clone()),
        Some(Box::new(health.clone())),
        failover_config(Site::Dr),
        Arc::new(clock.clone()),
    )
    .expect("dr coordinator construction succeeds")
}

fn drain(rx: &mut tokio::sync::mpsc::Receiver<CoordinatorEvent>) -> Vec<CoordinatorEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn primary_renewal_keeps_lease_always_valid() {
    // One simulated hour at a 10 s interval with a 60 s lease: an
    // external reader must never observe an invalid lease, and at every
    // DR-style poll point at least half the TTL must remain.
    let backend = MemoryBackend::new();
    let clock = ManualClock::new(T0);
    let (mut primary, _events) = primary_coordinator(&backend, &clock);

    for _ in 0..360 {
        primary.primary_tick().await;

        let lease = backend.lease().expect("lease is present");
        assert_eq!(lease.owner, Site::Primary);
        assert_eq!(lease.remaining(clock.now_unix()), 60);

        clock.advance(10);
        let lease = backend.lease().expect("lease is present");
        assert!(lease.is_valid(clock.now_unix()));
        assert!(lease.remaining(clock.now_unix()) >= 30);
    }
}

#[tokio::test]
async fn abrupt_primary_death_takes_over_inside_the_worst_case_window() {
    // The collector wedges at t=0 while the primary coordinator keeps
    // renewing until t=50 (the adversarial alignment behind the
    // worst-case formula). Stale metric readings burn two healthy
    // verdicts, the streak completes at t=50, and the last renewal
    // holds the lease until t=110: takeover must land in (110, 120].
    let backend = MemoryBackend::new();
    let clock = ManualClock::new(T0);
    let (mut primary, _primary_events) = primary_coordinator(&backend, &clock);

    // Two stale-but-tolerated readings, then unhealthy forever.
    let health = ScriptedHealth::with_script(
        [HealthStatus::Healthy, HealthStatus::Healthy],
        HealthStatus::Unhealthy,
    );
    let (mut dr, mut dr_events) = dr_coordinator(&backend, &health, &clock);

    let mut takeover_at = None;
    for offset in (0..=130).step_by(10) {
        clock.set(T0 + offset);
        if offset <= 50 {
            primary.primary_tick().await;
        }
        if offset >= 10 {
            dr.dr_tick().await;
        }

        if dr.dr_state().is_active() {
            takeover_at = Some(offset);
            break;
        }

        // Until the takeover the lease must still name the primary.
        assert_eq!(backend.lease().unwrap().owner, Site::Primary, "t={offset}");
    }

    assert_eq!(takeover_at, Some(110));

    let lease = backend.lease().unwrap();
    assert_eq!(lease.owner, Site::Dr);
    assert_eq!(lease.expires_at, T0 + 110 + 60);

    let events = drain(&mut dr_events);
    assert!(events.contains(&CoordinatorEvent::TakeoverCompleted {
        expires_at: T0 + 110 + 60
    }));
    assert!(events
        .iter()
        .any(|e| matches!(e, CoordinatorEvent::WaitingForExpiry { .. })));
}

#[tokio::test]
async fn partition_from_dns_fails_closed() {
    // The DR site can reach neither the primary nor the DNS backend.
    // However long that lasts, no takeover happens.
    let backend = MemoryBackend::new();
    backend.seed_lease(primary_ip(), Site::Primary, T0 + 60);
    backend.set_fail_reads(true);

    let clock = ManualClock::new(T0);
    let health = ScriptedHealth::new(HealthStatus::Unhealthy);
    let (mut dr, mut events) = dr_coordinator(&backend, &health, &clock);

    let writes_before = backend.set_call_count();
    for _ in 0..20 {
        dr.dr_tick().await;
        clock.advance(10);
    }

    assert!(!dr.dr_state().is_active());
    assert_eq!(backend.set_call_count(), writes_before, "no writes at all");

    let read_failures = drain(&mut events)
        .into_iter()
        .filter(|e| matches!(e, CoordinatorEvent::LeaseReadFailed { .. }))
        .count();
    assert_eq!(read_failures, 20, "one read failure logged per interval");
}

#[tokio::test]
async fn operator_failback_stands_the_dr_down_within_one_interval() {
    // Start from the terminal state of a takeover: DR owns the lease.
    let backend = MemoryBackend::new();
    backend.seed_lease(dr_ip(), Site::Dr, T0 + 60);

    let clock = ManualClock::new(T0);
    let health = ScriptedHealth::new(HealthStatus::Unhealthy);
    let (mut dr, mut events) = dr_coordinator(&backend, &health, &clock);

    // The streak completes, the lease turns out to be ours already, and
    // the coordinator resumes acting primary.
    for _ in 0..3 {
        dr.dr_tick().await;
        clock.advance(10);
    }
    assert!(dr.dr_state().is_active());

    // Operator runs `failback` on the primary site.
    backend.seed_lease(primary_ip(), Site::Primary, clock.now_unix() + 60);
    let writes_before = backend.set_call_count();

    dr.dr_tick().await;

    assert!(!dr.dr_state().is_active(), "reverted to standby");
    assert_eq!(
        backend.set_call_count(),
        writes_before,
        "stand-down performs no writes"
    );
    assert_eq!(backend.lease().unwrap().owner, Site::Primary);
    assert!(drain(&mut events).contains(&CoordinatorEvent::StoodDown));
}

#[tokio::test]
async fn malformed_txt_is_treated_as_expired() {
    let backend = MemoryBackend::new();
    backend.seed_raw(Some(PRIMARY_IP), Some("garbage"));

    let clock = ManualClock::new(T0);
    let health = ScriptedHealth::new(HealthStatus::Unhealthy);
    let (mut dr, _events) = dr_coordinator(&backend, &health, &clock);

    // The health streak still gates the takeover.
    for _ in 0..2 {
        dr.dr_tick().await;
        clock.advance(10);
        assert!(!dr.dr_state().is_active());
        assert_eq!(backend.records().txt.as_deref(), Some("garbage"));
    }

    dr.dr_tick().await;

    assert!(dr.dr_state().is_active());
    let lease = backend.lease().expect("well-formed lease after takeover");
    assert_eq!(lease.owner, Site::Dr);
}

#[tokio::test]
async fn primary_write_failures_do_not_stop_the_heartbeat() {
    let backend = MemoryBackend::new();
    backend.set_fail_writes(true);

    let clock = ManualClock::new(T0);
    let (mut primary, mut events) = primary_coordinator(&backend, &clock);

    for _ in 0..3 {
        primary.primary_tick().await;
        clock.advance(10);
    }

    let failures: Vec<u32> = drain(&mut events)
        .into_iter()
        .filter_map(|e| match e {
            CoordinatorEvent::RenewFailed {
                consecutive_failures,
                ..
            } => Some(consecutive_failures),
            _ => None,
        })
        .collect();
    assert_eq!(failures, vec![1, 2, 3]);

    // Backend recovers; the counter resets.
    backend.set_fail_writes(false);
    primary.primary_tick().await;
    assert_eq!(backend.lease().unwrap().owner, Site::Primary);
    assert!(drain(&mut events)
        .iter()
        .any(|e| matches!(e, CoordinatorEvent::LeaseRenewed { .. })));
}

#[tokio::test]
async fn failed_takeover_write_stays_standby_and_retries() {
    let backend = MemoryBackend::new();
    backend.seed_lease(primary_ip(), Site::Primary, T0.saturating_sub(1));
    backend.set_fail_writes(true);

    let clock = ManualClock::new(T0);
    let health = ScriptedHealth::new(HealthStatus::Unhealthy);
    let (mut dr, mut events) = dr_coordinator(&backend, &health, &clock);

    for _ in 0..3 {
        dr.dr_tick().await;
        clock.advance(10);
    }

    // The third tick attempted the takeover and the write failed.
    assert!(!dr.dr_state().is_active());
    assert!(drain(&mut events)
        .iter()
        .any(|e| matches!(e, CoordinatorEvent::TakeoverFailed { .. })));

    // Next tick retries and succeeds.
    backend.set_fail_writes(false);
    dr.dr_tick().await;
    assert!(dr.dr_state().is_active());
    assert_eq!(backend.lease().unwrap().owner, Site::Dr);
}

#[tokio::test]
async fn active_dr_renews_its_own_lease() {
    let backend = MemoryBackend::new();
    backend.seed_lease(dr_ip(), Site::Dr, T0 + 20);

    let clock = ManualClock::new(T0);
    let health = ScriptedHealth::new(HealthStatus::Unhealthy);
    let (mut dr, _events) = dr_coordinator(&backend, &health, &clock);

    for _ in 0..3 {
        dr.dr_tick().await;
        clock.advance(10);
    }
    assert!(dr.dr_state().is_active());

    // Long after the seeded expiry the lease is still valid because the
    // active DR re-asserts it every interval.
    for _ in 0..10 {
        dr.dr_tick().await;
        clock.advance(10);
    }
    let lease = backend.lease().unwrap();
    assert_eq!(lease.owner, Site::Dr);
    assert!(lease.is_valid(clock.now_unix()));
}

#[tokio::test]
async fn loop_driver_shuts_down_cleanly() {
    let backend = MemoryBackend::new();
    let clock = ManualClock::new(T0);
    let (mut primary, _events) = primary_coordinator(&backend, &clock);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let handle =
        tokio::spawn(async move { primary.run_with_shutdown(Some(shutdown_rx)).await });

    // Let the first iteration run, then stop.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    shutdown_tx.send(()).unwrap();
    handle.await.unwrap().unwrap();

    assert!(backend.lease().is_some(), "first iteration wrote the lease");
}
