//! Operator-facing operation contracts
//!
//! `init`, `promote`, `failback` and `show`: idempotency, the init
//! precondition, and deterministic `show` output.

mod common;

use common::*;
use std::sync::Arc;

use dnslease_core::traits::{HealthCheck, HealthStatus};
use dnslease_core::{Coordinator, Error, ManualClock, Site};

const T0: u64 = 1_000_000;

fn coordinator(backend: &MemoryBackend, role: Site, clock: &ManualClock) -> Coordinator {
    // One-shot operations never consult the oracle, but the DR role
    // requires one at construction time.
    let health: Option<Box<dyn HealthCheck>> = match role {
        Site::Primary => None,
        Site::Dr => Some(Box::new(ScriptedHealth::new(HealthStatus::Unhealthy))),
    };

    let (coordinator, _events) = Coordinator::new(
        Box::new(backend.clone()),
        health,
        failover_config(role),
        Arc::new(clock.clone()),
    )
    .expect("coordinator construction succeeds");
    coordinator
}

#[tokio::test]
async fn init_writes_own_site_records() {
    let backend = MemoryBackend::new();
    let clock = ManualClock::new(T0);
    let primary = coordinator(&backend, Site::Primary, &clock);

    primary.init(false).await.unwrap();

    let records = backend.records();
    assert_eq!(records.a.as_deref(), Some(PRIMARY_IP));
    let lease = backend.lease().unwrap();
    assert_eq!(lease.owner, Site::Primary);
    assert_eq!(lease.expires_at, T0 + 60);
}

#[tokio::test]
async fn init_refuses_a_valid_foreign_lease() {
    let backend = MemoryBackend::new();
    backend.seed_lease(dr_ip(), Site::Dr, T0 + 60);

    let clock = ManualClock::new(T0);
    let primary = coordinator(&backend, Site::Primary, &clock);

    let err = primary.init(false).await.unwrap_err();
    assert!(matches!(err, Error::Precondition(_)), "got {err:?}");
    assert_eq!(backend.lease().unwrap().owner, Site::Dr, "untouched");

    // --force overrides the refusal.
    primary.init(true).await.unwrap();
    assert_eq!(backend.lease().unwrap().owner, Site::Primary);
}

#[tokio::test]
async fn init_overwrites_an_expired_foreign_lease() {
    let backend = MemoryBackend::new();
    backend.seed_lease(dr_ip(), Site::Dr, T0 - 5);

    let clock = ManualClock::new(T0);
    let primary = coordinator(&backend, Site::Primary, &clock);

    primary.init(false).await.unwrap();
    assert_eq!(backend.lease().unwrap().owner, Site::Primary);
}

#[tokio::test]
async fn init_promote_and_failback_are_idempotent() {
    let backend = MemoryBackend::new();
    let clock = ManualClock::new(T0);
    let primary = coordinator(&backend, Site::Primary, &clock);

    primary.init(false).await.unwrap();
    let after_once = backend.records();
    primary.init(false).await.unwrap();
    assert_eq!(backend.records(), after_once);

    primary.promote().await.unwrap();
    let after_promote = backend.records();
    assert_eq!(after_promote.a.as_deref(), Some(DR_IP));
    primary.promote().await.unwrap();
    assert_eq!(backend.records(), after_promote);

    primary.failback().await.unwrap();
    let after_failback = backend.records();
    assert_eq!(after_failback.a.as_deref(), Some(PRIMARY_IP));
    primary.failback().await.unwrap();
    assert_eq!(backend.records(), after_failback);
}

#[tokio::test]
async fn promote_overwrites_regardless_of_the_current_lease() {
    let backend = MemoryBackend::new();
    backend.seed_lease(primary_ip(), Site::Primary, T0 + 60);

    let clock = ManualClock::new(T0);
    let dr = coordinator(&backend, Site::Dr, &clock);

    dr.promote().await.unwrap();

    let lease = backend.lease().unwrap();
    assert_eq!(lease.owner, Site::Dr);
    assert_eq!(backend.records().a.as_deref(), Some(DR_IP));
}

#[tokio::test]
async fn show_is_deterministic_in_the_records_read() {
    let backend = MemoryBackend::new();
    backend.seed_raw(
        Some(PRIMARY_IP),
        Some("owner=primary exp=1000060 extra=ignored"),
    );

    let clock = ManualClock::new(T0);
    let primary = coordinator(&backend, Site::Primary, &clock);

    let first = primary.show().await;
    let second = primary.show().await;
    assert_eq!(first, second);

    assert_eq!(first.record, "syslog.example.local");
    assert_eq!(first.a.as_deref(), Some(PRIMARY_IP));
    assert_eq!(first.owner, Some(Site::Primary));
    assert_eq!(first.expires_at, Some(1_000_060));
    assert_eq!(first.time_remaining_seconds, Some(60));
}

#[tokio::test]
async fn show_reports_unknown_fields_on_read_error() {
    let backend = MemoryBackend::new();
    backend.set_fail_reads(true);

    let clock = ManualClock::new(T0);
    let primary = coordinator(&backend, Site::Primary, &clock);

    let summary = primary.show().await;
    assert_eq!(summary.record, "syslog.example.local");
    assert_eq!(summary.a, None);
    assert_eq!(summary.owner, None);
    assert_eq!(summary.expires_at, None);
    assert_eq!(summary.time_remaining_seconds, None);
}

#[tokio::test]
async fn show_tolerates_a_malformed_lease() {
    let backend = MemoryBackend::new();
    backend.seed_raw(Some(PRIMARY_IP), Some("garbage"));

    let clock = ManualClock::new(T0);
    let primary = coordinator(&backend, Site::Primary, &clock);

    let summary = primary.show().await;
    assert_eq!(summary.a.as_deref(), Some(PRIMARY_IP));
    assert_eq!(summary.owner, None);
    assert_eq!(summary.time_remaining_seconds, None);
}

#[tokio::test]
async fn expired_lease_shows_negative_time_remaining() {
    let backend = MemoryBackend::new();
    backend.seed_lease(primary_ip(), Site::Primary, T0 - 30);

    let clock = ManualClock::new(T0);
    let primary = coordinator(&backend, Site::Primary, &clock);

    let summary = primary.show().await;
    assert_eq!(summary.time_remaining_seconds, Some(-30));
}
