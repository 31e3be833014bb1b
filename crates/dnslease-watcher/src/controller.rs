//! Worker controller implementations
//!
//! Two ways to start and stop the telemetry worker: container
//! lifecycle through `docker`, or deployment scale through `kubectl`.
//! Both check the observed state first, so asserting the target state
//! every tick stays a no-op while nothing changed.

use async_trait::async_trait;
use std::time::Duration;

use dnslease_core::exec::run_with_deadline;
use dnslease_core::traits::WorkerController;
use dnslease_core::{Error, Result};

const CONTROL_DEADLINE: Duration = Duration::from_secs(30);
const INSPECT_DEADLINE: Duration = Duration::from_secs(10);

/// Container-lifecycle controller (`docker start` / `docker stop`)
#[derive(Debug, Clone)]
pub struct DockerController {
    container: String,
}

impl DockerController {
    /// Control the named container
    pub fn new(container: impl Into<String>) -> Self {
        Self {
            container: container.into(),
        }
    }

    async fn is_running(&self) -> Result<bool> {
        let args = vec![
            "inspect".to_string(),
            "-f".to_string(),
            "{{.State.Running}}".to_string(),
            self.container.clone(),
        ];
        let output = run_with_deadline("docker", &args, &[], None, INSPECT_DEADLINE)
            .await
            .map_err(|e| Error::worker_control(format!("docker inspect failed: {e}")))?;

        if !output.success() {
            return Err(Error::worker_control(format!(
                "docker inspect {} failed: {}",
                self.container,
                output.failure_message()
            )));
        }
        Ok(output.stdout.trim() == "true")
    }
}

#[async_trait]
impl WorkerController for DockerController {
    async fn ensure_running(&self) -> Result<()> {
        if self.is_running().await? {
            return Ok(());
        }

        tracing::info!(container = %self.container, "starting container");
        let args = vec!["start".to_string(), self.container.clone()];
        let output = run_with_deadline("docker", &args, &[], None, CONTROL_DEADLINE)
            .await
            .map_err(|e| Error::worker_control(format!("docker start failed: {e}")))?;

        if !output.success() {
            return Err(Error::worker_control(format!(
                "docker start {} failed: {}",
                self.container,
                output.failure_message()
            )));
        }
        Ok(())
    }

    async fn ensure_stopped(&self, grace_secs: u64) -> Result<()> {
        if !self.is_running().await? {
            return Ok(());
        }

        tracing::info!(container = %self.container, grace_secs, "stopping container");
        let args = vec![
            "stop".to_string(),
            "-t".to_string(),
            grace_secs.to_string(),
            self.container.clone(),
        ];
        let output = run_with_deadline("docker", &args, &[], None, CONTROL_DEADLINE)
            .await
            .map_err(|e| Error::worker_control(format!("docker stop failed: {e}")))?;

        if !output.success() {
            return Err(Error::worker_control(format!(
                "docker stop {} failed: {}",
                self.container,
                output.failure_message()
            )));
        }
        Ok(())
    }

    fn worker_name(&self) -> String {
        format!("container {}", self.container)
    }
}

/// Deployment-scale controller (`kubectl scale`)
///
/// "Running" means the deployment's desired replica count equals the
/// active count; pod-level grace is the deployment's own termination
/// policy, so `ensure_stopped` ignores the grace argument.
#[derive(Debug, Clone)]
pub struct KubeController {
    namespace: String,
    deployment: String,
    replicas_active: u32,
    replicas_inactive: u32,
}

impl KubeController {
    /// Control the named deployment
    pub fn new(
        namespace: impl Into<String>,
        deployment: impl Into<String>,
        replicas_active: u32,
        replicas_inactive: u32,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            deployment: deployment.into(),
            replicas_active,
            replicas_inactive,
        }
    }

    async fn current_replicas(&self) -> Result<u32> {
        let args = vec![
            "get".to_string(),
            "deployment".to_string(),
            self.deployment.clone(),
            "-n".to_string(),
            self.namespace.clone(),
            "-o".to_string(),
            "jsonpath={.spec.replicas}".to_string(),
        ];
        let output = run_with_deadline("kubectl", &args, &[], None, INSPECT_DEADLINE)
            .await
            .map_err(|e| Error::worker_control(format!("kubectl get failed: {e}")))?;

        if !output.success() {
            return Err(Error::worker_control(format!(
                "kubectl get deployment {} failed: {}",
                self.deployment,
                output.failure_message()
            )));
        }

        output.stdout.trim().parse().map_err(|_| {
            Error::worker_control(format!(
                "unexpected replica count {:?} for deployment {}",
                output.stdout.trim(),
                self.deployment
            ))
        })
    }

    async fn scale_to(&self, replicas: u32) -> Result<()> {
        if self.current_replicas().await? == replicas {
            return Ok(());
        }

        tracing::info!(deployment = %self.deployment, replicas, "scaling deployment");
        let args = vec![
            "scale".to_string(),
            "deployment".to_string(),
            self.deployment.clone(),
            format!("--replicas={replicas}"),
            "-n".to_string(),
            self.namespace.clone(),
        ];
        let output = run_with_deadline("kubectl", &args, &[], None, CONTROL_DEADLINE)
            .await
            .map_err(|e| Error::worker_control(format!("kubectl scale failed: {e}")))?;

        if !output.success() {
            return Err(Error::worker_control(format!(
                "kubectl scale {} failed: {}",
                self.deployment,
                output.failure_message()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl WorkerController for KubeController {
    async fn ensure_running(&self) -> Result<()> {
        self.scale_to(self.replicas_active).await
    }

    async fn ensure_stopped(&self, _grace_secs: u64) -> Result<()> {
        self.scale_to(self.replicas_inactive).await
    }

    fn worker_name(&self) -> String {
        format!("deployment {}/{}", self.namespace, self.deployment)
    }
}
