//! Test doubles and helpers for the coordination contract tests
//!
//! The doubles count calls and share state through `Arc`s so a test can
//! hold one handle while the engine owns another.

// Each contract test binary uses a different slice of these helpers.
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use dnslease_core::lease::Lease;
use dnslease_core::traits::{
    AddressResolver, DnsBackend, HealthCheck, HealthStatus, RecordPair, WorkerController,
};
use dnslease_core::{BackendConfig, Error, FailoverConfig, HealthConfig, Result, Site, WatcherConfig};

/// In-memory DNS backend with failure injection
#[derive(Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<RecordPair>>,
    set_calls: Arc<AtomicUsize>,
    get_calls: Arc<AtomicUsize>,
    fail_reads: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current zone contents
    pub fn records(&self) -> RecordPair {
        self.state.lock().unwrap().clone()
    }

    /// Seed the zone out of band (simulates the other site writing)
    pub fn seed_lease(&self, ip: Ipv4Addr, owner: Site, expires_at: u64) {
        *self.state.lock().unwrap() = RecordPair {
            a: Some(ip.to_string()),
            txt: Some(Lease::new(owner, expires_at).to_txt()),
        };
    }

    /// Seed a raw TXT value (malformed-lease scenarios)
    pub fn seed_raw(&self, a: Option<&str>, txt: Option<&str>) {
        *self.state.lock().unwrap() = RecordPair {
            a: a.map(str::to_string),
            txt: txt.map(str::to_string),
        };
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_call_count(&self) -> usize {
        self.set_calls.load(Ordering::SeqCst)
    }

    pub fn get_call_count(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    /// Parsed lease currently in the zone
    pub fn lease(&self) -> Option<Lease> {
        let txt = self.records().txt?;
        Lease::parse_txt(&txt).ok()
    }
}

#[async_trait]
impl DnsBackend for MemoryBackend {
    async fn set_records(
        &self,
        ip: Ipv4Addr,
        owner: Site,
        expires_at: u64,
        _ttl: u32,
    ) -> Result<()> {
        self.set_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::backend_write("injected write failure"));
        }
        self.seed_lease(ip, owner, expires_at);
        Ok(())
    }

    async fn get_records(&self) -> Result<RecordPair> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::backend_read("injected read failure"));
        }
        Ok(self.records())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

/// Health oracle replaying a scripted verdict sequence
///
/// Once the script runs dry it keeps returning `fallback`.
#[derive(Clone)]
pub struct ScriptedHealth {
    verdicts: Arc<Mutex<VecDeque<HealthStatus>>>,
    fallback: HealthStatus,
}

impl ScriptedHealth {
    pub fn new(fallback: HealthStatus) -> Self {
        Self {
            verdicts: Arc::new(Mutex::new(VecDeque::new())),
            fallback,
        }
    }

    pub fn with_script(
        verdicts: impl IntoIterator<Item = HealthStatus>,
        fallback: HealthStatus,
    ) -> Self {
        let health = Self::new(fallback);
        health.push_all(verdicts);
        health
    }

    pub fn push_all(&self, verdicts: impl IntoIterator<Item = HealthStatus>) {
        self.verdicts.lock().unwrap().extend(verdicts);
    }
}

#[async_trait]
impl HealthCheck for ScriptedHealth {
    async fn check(&mut self) -> HealthStatus {
        self.verdicts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.fallback)
    }
}

/// Resolver replaying scripted answers; `None` entries are failures
#[derive(Clone)]
pub struct ScriptedResolver {
    answers: Arc<Mutex<VecDeque<Option<Ipv4Addr>>>>,
    fallback: Option<Ipv4Addr>,
}

impl ScriptedResolver {
    pub fn new(fallback: Option<Ipv4Addr>) -> Self {
        Self {
            answers: Arc::new(Mutex::new(VecDeque::new())),
            fallback,
        }
    }

    pub fn push_all(&self, answers: impl IntoIterator<Item = Option<Ipv4Addr>>) {
        self.answers.lock().unwrap().extend(answers);
    }

    pub fn set_fallback(&mut self, fallback: Option<Ipv4Addr>) {
        self.fallback = fallback;
    }
}

#[async_trait]
impl AddressResolver for ScriptedResolver {
    async fn resolve_a(&self, fqdn: &str) -> Result<Ipv4Addr> {
        let next = self
            .answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.fallback);
        next.ok_or_else(|| Error::network(format!("scripted lookup failure for {fqdn}")))
    }
}

/// Worker controller tracking calls and simulated run state
#[derive(Clone, Default)]
pub struct CountingController {
    running: Arc<AtomicBool>,
    start_calls: Arc<AtomicUsize>,
    stop_calls: Arc<AtomicUsize>,
    last_grace: Arc<Mutex<Option<u64>>>,
}

impl CountingController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Simulate the worker dying outside the watcher's control
    pub fn kill(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn start_calls(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }

    pub fn stop_calls(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }

    pub fn last_grace(&self) -> Option<u64> {
        *self.last_grace.lock().unwrap()
    }
}

#[async_trait]
impl WorkerController for CountingController {
    async fn ensure_running(&self) -> Result<()> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn ensure_stopped(&self, grace_secs: u64) -> Result<()> {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_grace.lock().unwrap() = Some(grace_secs);
        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn worker_name(&self) -> String {
        "counting worker".to_string()
    }
}

pub const PRIMARY_IP: &str = "10.10.10.10";
pub const DR_IP: &str = "10.20.20.10";

pub fn primary_ip() -> Ipv4Addr {
    PRIMARY_IP.parse().unwrap()
}

pub fn dr_ip() -> Ipv4Addr {
    DR_IP.parse().unwrap()
}

/// A coordinator configuration matching the boundary scenarios:
/// 10 s interval, 60 s lease, threshold 3
pub fn failover_config(role: Site) -> FailoverConfig {
    FailoverConfig {
        role,
        dns_zone: "example.local".to_string(),
        dns_record: "syslog.example.local".to_string(),
        dns_ttl: 30,
        dns_server: "127.0.0.1".to_string(),
        primary_ip: primary_ip(),
        dr_ip: dr_ip(),
        lease_ttl: 60,
        update_interval: 10,
        fail_threshold: 3,
        health: HealthConfig::Tcp {
            host: PRIMARY_IP.to_string(),
            port: 6514,
            timeout_secs: 2,
        },
        backend: BackendConfig::DryRun {
            state_file: "/tmp/zone.json".to_string(),
        },
    }
}

pub fn watcher_config() -> WatcherConfig {
    WatcherConfig {
        dns_record: "syslog.example.local".to_string(),
        my_ip: dr_ip(),
        check_interval: 15,
        dns_server: None,
        stop_grace_secs: 10,
    }
}
