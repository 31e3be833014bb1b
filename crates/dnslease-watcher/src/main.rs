// # dnslease-watcher - collector watcher daemon
//
// Runs on the DR site next to (but independent of) the DR coordinator.
// Resolves the failover DNS record every OTEL_CHECK_INTERVAL seconds
// and starts or stops the telemetry worker so that only the site the
// record points at is collecting.
//
// ## Configuration
//
// - `DNS_RECORD`: record to watch (same one dnsleased maintains)
// - `MY_IP` (falls back to `DR_IP`): this site's address
// - `OTEL_CHECK_INTERVAL`: seconds between checks (default 15)
// - `DNS_SERVER`: optional; query this server directly instead of the
//   system resolver (bypasses local caching)
// - `WORKER_MODE`: docker | kube (default docker)
// - docker: `OTEL_CONTAINER` (default otel-collector)
// - kube: `OTEL_NAMESPACE` (default monitoring), `OTEL_DEPLOYMENT`
//   (default otel-collector), `OTEL_REPLICAS_ACTIVE` (default 1),
//   `OTEL_REPLICAS_INACTIVE` (default 0)

mod controller;
mod resolver;

use std::process::ExitCode;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use controller::{DockerController, KubeController};
use dnslease_core::traits::{AddressResolver, WorkerController};
use dnslease_core::{Result, WatcherConfig, WatcherEngine};
use resolver::HickoryResolver;

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_u32(key: &str, default: u32) -> Result<u32> {
    match std::env::var(key) {
        Ok(raw) => raw.parse().map_err(|_| {
            dnslease_core::Error::config(format!("{key} must be an integer, got {raw:?}"))
        }),
        Err(_) => Ok(default),
    }
}

fn build_controller() -> Result<Box<dyn WorkerController>> {
    match env_or("WORKER_MODE", "docker").as_str() {
        "docker" => Ok(Box::new(DockerController::new(env_or(
            "OTEL_CONTAINER",
            "otel-collector",
        )))),
        "kube" => Ok(Box::new(KubeController::new(
            env_or("OTEL_NAMESPACE", "monitoring"),
            env_or("OTEL_DEPLOYMENT", "otel-collector"),
            env_u32("OTEL_REPLICAS_ACTIVE", 1)?,
            env_u32("OTEL_REPLICAS_INACTIVE", 0)?,
        ))),
        other => Err(dnslease_core::Error::config(format!(
            "WORKER_MODE {other:?} is not supported. Valid modes: docker, kube"
        ))),
    }
}

fn build_resolver(config: &WatcherConfig) -> Result<Box<dyn AddressResolver>> {
    match &config.dns_server {
        Some(server) => Ok(Box::new(HickoryResolver::direct(server)?)),
        None => Ok(Box::new(HickoryResolver::system()?)),
    }
}

fn main() -> ExitCode {
    let level = match env_or("LOG_LEVEL", "info").to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {e}");
        return ExitCode::from(2);
    }

    let config = match WatcherConfig::from_env().and_then(|c| {
        c.validate()?;
        Ok(c)
    }) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            eprintln!("MY_IP (or DR_IP) must name this site's address.");
            return ExitCode::from(2);
        }
    };

    let rt = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {e}");
            return ExitCode::from(1);
        }
    };

    let result = rt.block_on(async {
        let resolver = build_resolver(&config)?;
        let controller = build_controller()?;

        info!("starting dnslease-watcher");
        let mut engine = WatcherEngine::new(resolver, controller, config)?;
        engine.run().await
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::from(2)
        }
    }
}
