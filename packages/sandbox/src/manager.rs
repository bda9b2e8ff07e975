// ABOUTME: Sandbox lifecycle manager orchestrating registry and runtime operations
// ABOUTME: Serializes create/start/stop/destroy under one lock and returns structured outcomes

use crate::config::SandboxConfig;
use crate::error::{Result, SandboxError};
use crate::registry::{InMemoryRegistry, SandboxRegistry};
use crate::runtime::{ContainerRuntime, DockerCli, RunSpec, RuntimeError};
use crate::types::{CreateSandboxRequest, ExecOutput, ResourceLimits, SandboxInfo, SandboxStatus};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Sandbox lifecycle manager.
///
/// Construct one per process and share it (usually behind an `Arc`).
/// Create, start, stop and destroy are serialized by a single lock across all
/// sandboxes. Reads go straight to the registry.
pub struct SandboxManager {
    runtime: Arc<dyn ContainerRuntime>,
    registry: Arc<dyn SandboxRegistry>,
    config: SandboxConfig,
    lifecycle_lock: Mutex<()>,
}

impl SandboxManager {
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        registry: Arc<dyn SandboxRegistry>,
        config: SandboxConfig,
    ) -> Self {
        Self {
            runtime,
            registry,
            config,
            lifecycle_lock: Mutex::new(()),
        }
    }

    /// Manager backed by the Docker CLI and an in-memory registry
    pub fn with_docker(config: SandboxConfig) -> Self {
        let runtime = Arc::new(DockerCli::with_binary(config.runtime_binary.clone()));
        Self::new(runtime, Arc::new(InMemoryRegistry::new()), config)
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    /// Whether the container runtime currently answers
    pub async fn runtime_available(&self) -> bool {
        self.runtime.is_available().await
    }

    /// Create a new isolated sandbox container with its own workspace volume
    pub async fn create_sandbox(&self, request: CreateSandboxRequest) -> Result<SandboxInfo> {
        let memory_limit = request
            .memory_limit
            .unwrap_or_else(|| self.config.default_memory_limit.clone());
        let cpu_limit = request
            .cpu_limit
            .unwrap_or_else(|| self.config.default_cpu_limit.clone());

        validate_project_name(&request.project_name)?;
        validate_memory_limit(&memory_limit)?;
        validate_cpu_limit(&cpu_limit)?;

        let _guard = self.lifecycle_lock.lock().await;

        let sandbox_id = self.generate_sandbox_id().await;
        let container_name = format!(
            "{}-{}-{}",
            self.config.name_prefix, request.project_name, sandbox_id
        );
        let volume_name = format!("{}-workspace", container_name);

        info!(
            "Creating sandbox {} for project {}",
            sandbox_id, request.project_name
        );

        let info = SandboxInfo {
            sandbox_id: sandbox_id.clone(),
            container_id: String::new(),
            container_name: container_name.clone(),
            volume_name: volume_name.clone(),
            project_name: request.project_name.clone(),
            status: SandboxStatus::Creating,
            created_at: Utc::now(),
            stopped_at: None,
            workspace_path: self.config.workspace_path.clone(),
            ports: request.ports.clone(),
            resource_limits: ResourceLimits {
                memory: memory_limit.clone(),
                cpu: cpu_limit.clone(),
            },
            error_message: None,
        };

        // Registered before the runtime is touched so a failure leaves a listable Error record
        self.registry.insert(info).await?;

        if let Err(e) = self.runtime.create_volume(&volume_name).await {
            return Err(self.fail_creation(&sandbox_id, e).await);
        }

        let spec = RunSpec {
            image: self.config.image.clone(),
            container_name,
            network: self.config.network.clone(),
            volume_name,
            workspace_path: self.config.workspace_path.clone(),
            memory_limit,
            cpu_limit,
            ports: request.ports,
            labels: self.labels(&sandbox_id, &request.project_name),
        };

        match self.runtime.run_container(&spec).await {
            Ok(container_id) if !container_id.is_empty() => {
                let running = self
                    .registry
                    .set_container(&sandbox_id, &container_id, SandboxStatus::Running, None)
                    .await?;
                info!(
                    "Sandbox {} created with container {}",
                    sandbox_id, container_id
                );
                Ok(running)
            }
            Ok(_) => {
                let err = RuntimeError::CommandFailed {
                    command: format!("run {}", spec.container_name),
                    exit_code: Some(0),
                    stderr: "runtime returned an empty container id".to_string(),
                };
                Err(self.fail_creation(&sandbox_id, err).await)
            }
            Err(e) => Err(self.fail_creation(&sandbox_id, e).await),
        }
    }

    /// Get information about a sandbox
    pub async fn get_sandbox(&self, sandbox_id: &str) -> Result<SandboxInfo> {
        self.lookup(sandbox_id).await
    }

    /// List all sandboxes, optionally filtered by project, oldest first
    pub async fn list_sandboxes(&self, project_name: Option<&str>) -> Vec<SandboxInfo> {
        let mut sandboxes: Vec<SandboxInfo> = self
            .registry
            .list()
            .await
            .into_iter()
            .filter(|s| project_name.map_or(true, |p| s.project_name == p))
            .collect();

        sandboxes.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.sandbox_id.cmp(&b.sandbox_id))
        });
        sandboxes
    }

    /// Start a stopped sandbox. Starting a running sandbox is a no-op success.
    ///
    /// Returns `Ok(false)` when the runtime refuses; the status is left unchanged.
    pub async fn start_sandbox(&self, sandbox_id: &str) -> Result<bool> {
        let _guard = self.lifecycle_lock.lock().await;
        let sandbox = self.lookup(sandbox_id).await?;

        match sandbox.status {
            SandboxStatus::Running => return Ok(true),
            SandboxStatus::Stopped => {}
            status => {
                return Err(SandboxError::PreconditionFailed {
                    sandbox_id: sandbox_id.to_string(),
                    operation: "start",
                    status,
                })
            }
        }

        match self.runtime.start_container(&sandbox.container_id).await {
            Ok(()) => {
                self.registry
                    .compare_and_swap_status(
                        sandbox_id,
                        SandboxStatus::Stopped,
                        SandboxStatus::Running,
                    )
                    .await?;
                info!("Sandbox {} started", sandbox_id);
                Ok(true)
            }
            Err(e) => {
                error!("Failed to start sandbox {}: {}", sandbox_id, e);
                Ok(false)
            }
        }
    }

    /// Stop a running sandbox. Stopping a stopped sandbox is a no-op success.
    ///
    /// Returns `Ok(false)` when the runtime refuses; the status is left unchanged.
    pub async fn stop_sandbox(&self, sandbox_id: &str) -> Result<bool> {
        let _guard = self.lifecycle_lock.lock().await;
        let sandbox = self.lookup(sandbox_id).await?;

        match sandbox.status {
            SandboxStatus::Stopped => return Ok(true),
            SandboxStatus::Running => {}
            status => {
                return Err(SandboxError::PreconditionFailed {
                    sandbox_id: sandbox_id.to_string(),
                    operation: "stop",
                    status,
                })
            }
        }

        match self.runtime.stop_container(&sandbox.container_id).await {
            Ok(()) => {
                self.registry
                    .compare_and_swap_status(
                        sandbox_id,
                        SandboxStatus::Running,
                        SandboxStatus::Stopped,
                    )
                    .await?;
                info!("Sandbox {} stopped", sandbox_id);
                Ok(true)
            }
            Err(e) => {
                error!("Failed to stop sandbox {}: {}", sandbox_id, e);
                Ok(false)
            }
        }
    }

    /// Destroy a sandbox and optionally its workspace volume.
    ///
    /// Volume removal is best-effort. The registry entry goes last, so a
    /// sandbox is never listed after its container is gone, and stays listed
    /// when the container could not be removed (`Ok(false)`).
    pub async fn destroy_sandbox(&self, sandbox_id: &str, remove_volume: bool) -> Result<bool> {
        let _guard = self.lifecycle_lock.lock().await;
        self.destroy_locked(sandbox_id, remove_volume).await
    }

    /// Execute a command in a running sandbox.
    ///
    /// A non-zero exit code is returned in the output, not as an error.
    /// `workdir` defaults to the sandbox workspace.
    pub async fn execute_command(
        &self,
        sandbox_id: &str,
        command: &[String],
        workdir: Option<&str>,
    ) -> Result<ExecOutput> {
        let sandbox = self.lookup(sandbox_id).await?;

        if sandbox.status != SandboxStatus::Running {
            return Err(SandboxError::PreconditionFailed {
                sandbox_id: sandbox_id.to_string(),
                operation: "execute a command in",
                status: sandbox.status,
            });
        }

        if command.is_empty() {
            return Err(SandboxError::InvalidRequest(
                "command must not be empty".to_string(),
            ));
        }

        let workdir = workdir.unwrap_or(&sandbox.workspace_path);
        debug!(
            "Executing {:?} in sandbox {} (workdir {})",
            command, sandbox_id, workdir
        );

        Ok(self
            .runtime
            .exec(&sandbox.container_id, command, workdir)
            .await?)
    }

    /// Copy a host file or directory into a sandbox
    pub async fn copy_to_sandbox(
        &self,
        sandbox_id: &str,
        host_path: &Path,
        sandbox_path: &str,
    ) -> Result<bool> {
        let sandbox = self.lookup(sandbox_id).await?;
        if sandbox.container_id.is_empty() {
            warn!("Sandbox {} has no container to copy into", sandbox_id);
            return Ok(false);
        }

        match self
            .runtime
            .copy_in(&sandbox.container_id, host_path, sandbox_path)
            .await
        {
            Ok(()) => Ok(true),
            Err(e) => {
                error!("Failed to copy to sandbox {}: {}", sandbox_id, e);
                Ok(false)
            }
        }
    }

    /// Copy a file or directory out of a sandbox onto the host
    pub async fn copy_from_sandbox(
        &self,
        sandbox_id: &str,
        sandbox_path: &str,
        host_path: &Path,
    ) -> Result<bool> {
        let sandbox = self.lookup(sandbox_id).await?;
        if sandbox.container_id.is_empty() {
            warn!("Sandbox {} has no container to copy from", sandbox_id);
            return Ok(false);
        }

        match self
            .runtime
            .copy_out(&sandbox.container_id, sandbox_path, host_path)
            .await
        {
            Ok(()) => Ok(true),
            Err(e) => {
                error!("Failed to copy from sandbox {}: {}", sandbox_id, e);
                Ok(false)
            }
        }
    }

    /// Destroy stopped sandboxes created more than `older_than_hours` ago.
    ///
    /// Returns the number actually destroyed. Each candidate is re-checked
    /// under the lifecycle lock, so a sandbox restarted mid-scan survives.
    pub async fn cleanup_stopped_sandboxes(&self, older_than_hours: u64) -> usize {
        let now = Utc::now();
        let candidates: Vec<String> = self
            .registry
            .list()
            .await
            .into_iter()
            .filter(|s| is_expired_stopped(s, now, older_than_hours))
            .map(|s| s.sandbox_id)
            .collect();

        let mut count = 0;
        for sandbox_id in candidates {
            let _guard = self.lifecycle_lock.lock().await;

            match self.registry.get(&sandbox_id).await {
                Some(sandbox) if is_expired_stopped(&sandbox, now, older_than_hours) => {}
                _ => continue,
            }

            match self.destroy_locked(&sandbox_id, true).await {
                Ok(true) => count += 1,
                Ok(false) => warn!("Cleanup could not destroy sandbox {}", sandbox_id),
                Err(e) => warn!("Cleanup skipped sandbox {}: {}", sandbox_id, e),
            }
        }

        if count > 0 {
            info!("Cleaned up {} stopped sandbox(es)", count);
        }
        count
    }

    async fn destroy_locked(&self, sandbox_id: &str, remove_volume: bool) -> Result<bool> {
        let sandbox = self.lookup(sandbox_id).await?;

        if sandbox.container_id.is_empty() {
            // Creation failed before an id came back; a half-created container may hold the name
            if let Err(e) = self
                .runtime
                .remove_container(&sandbox.container_name, true)
                .await
            {
                debug!(
                    "No container to remove for sandbox {}: {}",
                    sandbox_id,
                    e.stderr()
                );
            }
        } else if let Err(e) = self
            .runtime
            .remove_container(&sandbox.container_id, true)
            .await
        {
            error!("Failed to destroy sandbox {}: {}", sandbox_id, e);
            return Ok(false);
        }

        if remove_volume {
            if let Err(e) = self.runtime.remove_volume(&sandbox.volume_name).await {
                warn!("Failed to remove volume {}: {}", sandbox.volume_name, e);
            }
        }

        self.registry.remove(sandbox_id).await;
        info!("Sandbox {} destroyed", sandbox_id);
        Ok(true)
    }

    async fn fail_creation(&self, sandbox_id: &str, err: RuntimeError) -> SandboxError {
        error!("Failed to create sandbox {}: {}", sandbox_id, err);

        if let Err(e) = self
            .registry
            .set_container(sandbox_id, "", SandboxStatus::Error, Some(err.to_string()))
            .await
        {
            warn!("Could not mark sandbox {} as failed: {}", sandbox_id, e);
        }

        SandboxError::Runtime(err)
    }

    async fn lookup(&self, sandbox_id: &str) -> Result<SandboxInfo> {
        match self.registry.get(sandbox_id).await {
            Some(sandbox) => Ok(sandbox),
            None => {
                warn!("Sandbox {} not found", sandbox_id);
                Err(SandboxError::NotFound(sandbox_id.to_string()))
            }
        }
    }

    /// Caller must hold the lifecycle lock
    async fn generate_sandbox_id(&self) -> String {
        loop {
            let hex = Uuid::new_v4().simple().to_string();
            let candidate = format!("sandbox-{}", &hex[..8]);
            if self.registry.get(&candidate).await.is_none() {
                return candidate;
            }
        }
    }

    fn labels(&self, sandbox_id: &str, project_name: &str) -> BTreeMap<String, String> {
        let prefix = &self.config.label_prefix;
        BTreeMap::from([
            (format!("{}.sandbox", prefix), "true".to_string()),
            (format!("{}.project", prefix), project_name.to_string()),
            (format!("{}.sandbox_id", prefix), sandbox_id.to_string()),
        ])
    }
}

fn is_expired_stopped(sandbox: &SandboxInfo, now: DateTime<Utc>, older_than_hours: u64) -> bool {
    sandbox.status == SandboxStatus::Stopped && sandbox.age_hours(now) > older_than_hours as f64
}

/// Project names end up in container and volume names, so they must be container-name safe
fn validate_project_name(project_name: &str) -> Result<()> {
    if project_name.is_empty() {
        return Err(SandboxError::InvalidRequest(
            "project name must not be empty".to_string(),
        ));
    }

    if project_name.len() > 64 {
        return Err(SandboxError::InvalidRequest(format!(
            "project name '{}' is longer than 64 characters",
            project_name
        )));
    }

    let mut chars = project_name.chars();
    let first_ok = chars.next().is_some_and(|c| c.is_ascii_alphanumeric());
    let rest_ok = chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));

    if !first_ok || !rest_ok {
        return Err(SandboxError::InvalidRequest(format!(
            "project name '{}' must start with a letter or digit \
             and contain only letters, digits, '_', '.' and '-'",
            project_name
        )));
    }

    Ok(())
}

/// Accepts `<number>[b|k|m|g]`, e.g. "512m", "2g", "1.5g"
fn validate_memory_limit(memory: &str) -> Result<()> {
    let number =
        memory.trim_end_matches(|c: char| matches!(c.to_ascii_lowercase(), 'b' | 'k' | 'm' | 'g'));
    let unit_len = memory.len() - number.len();

    let valid = unit_len <= 1
        && !number.is_empty()
        && number.chars().all(|c| c.is_ascii_digit() || c == '.')
        && number.parse::<f64>().is_ok_and(|v| v > 0.0);

    if valid {
        Ok(())
    } else {
        Err(SandboxError::InvalidRequest(format!(
            "invalid memory limit '{}': expected a positive number with optional b/k/m/g unit",
            memory
        )))
    }
}

fn validate_cpu_limit(cpu: &str) -> Result<()> {
    match cpu.parse::<f64>() {
        Ok(v) if v.is_finite() && v > 0.0 => Ok(()),
        _ => Err(SandboxError::InvalidRequest(format!(
            "invalid cpu limit '{}': expected a finite positive number",
            cpu
        ))),
    }
}
