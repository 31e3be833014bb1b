//! Health oracle implementations
//!
//! Two variants behind [`HealthCheck`](crate::traits::HealthCheck):
//! a TCP-connect probe and a metric-liveness probe. The DR coordinator
//! consults whichever one `HEALTH_MODE` selects, once per iteration.

mod metrics;
mod tcp;

pub use metrics::MetricsHealthCheck;
pub use tcp::TcpHealthCheck;

use crate::config::HealthConfig;
use crate::error::Result;
use crate::traits::HealthCheck;

/// Build the health oracle selected by the configuration
pub fn build(config: &HealthConfig) -> Result<Box<dyn HealthCheck>> {
    match config {
        HealthConfig::Tcp { host, port, timeout_secs } => Ok(Box::new(TcpHealthCheck::new(
            host.clone(),
            *port,
            std::time::Duration::from_secs(*timeout_secs),
        ))),
        HealthConfig::Metrics { url, metric, stale_count, timeout_secs } => {
            Ok(Box::new(MetricsHealthCheck::new(
                url.clone(),
                metric.clone(),
                *stale_count,
                std::time::Duration::from_secs(*timeout_secs),
            )?))
        }
    }
}
