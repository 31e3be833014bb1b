// # Metric-liveness Health Check
//
// Watches a monotonically non-decreasing counter in a text-format
// metric exposition. A counter that keeps climbing proves the monitored
// process is doing real work even when its ports still accept
// connections; a counter that goes flat for HEALTH_STALE_COUNT
// consecutive readings means it is wedged.
//
// Verdict rules:
// - fetch failure or metric absent: UNKNOWN, counters untouched
// - value above the last recorded one: HEALTHY, stale count reset
// - value at or below it: stale count +1; HEALTHY until the stale
//   limit, UNHEALTHY from then on. The recorded value is kept, so a
//   counter reset downward keeps reading as stale.
// - first ever reading: records the baseline and is HEALTHY, giving the
//   target one interval to warm up.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::traits::{HealthCheck, HealthStatus};

/// Metric-liveness health probe
pub struct MetricsHealthCheck {
    url: String,
    metric: String,
    stale_limit: u32,
    client: reqwest::Client,

    last_value: Option<f64>,
    stale_count: u32,
}

impl MetricsHealthCheck {
    /// Create a probe fetching `url` and watching `metric`
    pub fn new(url: String, metric: String, stale_limit: u32, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("dnslease")
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            url,
            metric,
            stale_limit,
            client,
            last_value: None,
            stale_count: 0,
        })
    }

    /// Last counter value recorded from a fresh reading
    pub fn last_value(&self) -> Option<f64> {
        self.last_value
    }

    /// Compare one fresh counter reading against the recorded baseline
    fn observe_value(&mut self, value: f64) -> HealthStatus {
        let Some(last) = self.last_value else {
            self.last_value = Some(value);
            tracing::info!(metric = %self.metric, value, "metrics baseline recorded");
            return HealthStatus::Healthy;
        };

        if value > last {
            tracing::debug!(metric = %self.metric, value, delta = value - last, "metrics advancing");
            self.last_value = Some(value);
            self.stale_count = 0;
            HealthStatus::Healthy
        } else {
            self.stale_count += 1;
            tracing::warn!(
                metric = %self.metric,
                value,
                stale = self.stale_count,
                limit = self.stale_limit,
                "metrics stale"
            );
            if self.stale_count < self.stale_limit {
                HealthStatus::Healthy
            } else {
                HealthStatus::Unhealthy
            }
        }
    }

    async fn fetch_exposition(&self) -> Result<String> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::health_probe(format!("fetch {} failed: {e}", self.url)))?;

        if !response.status().is_success() {
            return Err(Error::health_probe(format!(
                "fetch {} returned {}",
                self.url,
                response.status()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| Error::health_probe(format!("failed to read metrics body: {e}")))
    }
}

#[async_trait]
impl HealthCheck for MetricsHealthCheck {
    async fn check(&mut self) -> HealthStatus {
        let body = match self.fetch_exposition().await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(error = %e, "metrics endpoint unreachable");
                return HealthStatus::Unknown;
            }
        };

        let Some(value) = parse_metric_value(&body, &self.metric) else {
            tracing::warn!(metric = %self.metric, "metric not found in exposition");
            return HealthStatus::Unknown;
        };

        self.observe_value(value)
    }
}

/// Extract a counter value from a text-format exposition
///
/// Matches the metric by exact name (a `{` or whitespace must follow),
/// summing across label sets:
///
/// ```text
/// requests_total{receiver="otlp"} 12345
/// requests_total{receiver="prometheus"} 6789
/// ```
///
/// yields `19134`. Returns `None` when no sample matches.
pub fn parse_metric_value(exposition: &str, metric: &str) -> Option<f64> {
    let mut total = 0.0;
    let mut found = false;

    for line in exposition.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let rest = match line.strip_prefix(metric) {
            Some(rest) => rest,
            None => continue,
        };

        // Exact name only: "foo_total" must not match a "foo" lookup.
        let value_part = if let Some(after_labels) = rest.strip_prefix('{') {
            match after_labels.split_once('}') {
                Some((_, value)) => value.trim(),
                None => continue,
            }
        } else if rest.starts_with(char::is_whitespace) {
            rest.trim()
        } else {
            continue;
        };

        // Samples may carry a trailing timestamp; the value is the first field.
        let value_field = value_part.split_ascii_whitespace().next().unwrap_or("");
        if let Ok(value) = value_field.parse::<f64>() {
            total += value;
            found = true;
        }
    }

    found.then_some(total)
}
