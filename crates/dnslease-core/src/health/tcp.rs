// # TCP Health Check
//
// Opens a TCP connection to the monitored endpoint. A completed
// handshake is proof of life; a refusal or timeout is proof of death;
// anything else (resolver failures, odd socket errors) is no
// information at all. Holds no state between calls.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::time::Duration;
use tokio::net::TcpStream;

use crate::traits::{HealthCheck, HealthStatus};

/// TCP-connect health probe
#[derive(Debug, Clone)]
pub struct TcpHealthCheck {
    host: String,
    port: u16,
    timeout: Duration,
}

impl TcpHealthCheck {
    /// Create a probe for `host:port` with the given connect timeout
    pub fn new(host: String, port: u16, timeout: Duration) -> Self {
        Self { host, port, timeout }
    }
}

#[async_trait]
impl HealthCheck for TcpHealthCheck {
    async fn check(&mut self) -> HealthStatus {
        let target = (self.host.as_str(), self.port);

        match tokio::time::timeout(self.timeout, TcpStream::connect(target)).await {
            Ok(Ok(_stream)) => {
                tracing::debug!(host = %self.host, port = self.port, "tcp probe connected");
                HealthStatus::Healthy
            }
            Ok(Err(e)) => match e.kind() {
                ErrorKind::ConnectionRefused
                | ErrorKind::ConnectionReset
                | ErrorKind::TimedOut => {
                    tracing::warn!(host = %self.host, port = self.port, error = %e, "tcp probe failed");
                    HealthStatus::Unhealthy
                }
                _ => {
                    tracing::warn!(host = %self.host, port = self.port, error = %e, "tcp probe inconclusive");
                    HealthStatus::Unknown
                }
            },
            Err(_) => {
                tracing::warn!(host = %self.host, port = self.port, "tcp probe timed out");
                HealthStatus::Unhealthy
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn open_port_is_healthy() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let mut probe = TcpHealthCheck::new(
            "127.0.0.1".to_string(),
            port,
            Duration::from_secs(2),
        );
        assert_eq!(probe.check().await, HealthStatus::Healthy);
        drop(listener);
    }

    #[tokio::test]
    async fn closed_port_is_unhealthy() {
        // Bind then drop to find a port nothing is listening on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let mut probe = TcpHealthCheck::new(
            "127.0.0.1".to_string(),
            port,
            Duration::from_secs(2),
        );
        assert_eq!(probe.check().await, HealthStatus::Unhealthy);
    }
}
