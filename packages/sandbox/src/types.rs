// ABOUTME: Core type definitions for sandbox lifecycle management
// ABOUTME: Sandbox records, lifecycle status, resource limits and command output

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Lifecycle status of a sandbox
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SandboxStatus {
    /// Registered, waiting for the runtime to confirm the container
    Creating,
    /// Container is up and accepts commands
    Running,
    /// Container exists but is stopped
    Stopped,
    /// Creation failed; the record stays listable until destroyed
    Error,
}

impl SandboxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Creating => "creating",
            Self::Running => "running",
            Self::Stopped => "stopped",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for SandboxStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resource limits in the runtime's native notation (e.g. memory "2g", cpu "2.0")
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLimits {
    pub memory: String,
    pub cpu: String,
}

/// Information about one sandbox container.
///
/// The registry owns these records; every accessor hands out clones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SandboxInfo {
    pub sandbox_id: String,
    /// Empty until the runtime confirms creation
    pub container_id: String,
    pub container_name: String,
    pub volume_name: String,
    pub project_name: String,
    pub status: SandboxStatus,
    pub created_at: DateTime<Utc>,
    pub stopped_at: Option<DateTime<Utc>>,
    pub workspace_path: String,
    /// container port (optionally with "/udp") -> host port
    pub ports: BTreeMap<String, u16>,
    pub resource_limits: ResourceLimits,
    pub error_message: Option<String>,
}

impl SandboxInfo {
    /// Age in fractional hours, measured from creation
    pub fn age_hours(&self, now: DateTime<Utc>) -> f64 {
        (now - self.created_at).num_milliseconds() as f64 / 3_600_000.0
    }
}

/// Request to create a new sandbox
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateSandboxRequest {
    pub project_name: String,
    /// Falls back to the configured default when unset
    pub memory_limit: Option<String>,
    /// Falls back to the configured default when unset
    pub cpu_limit: Option<String>,
    #[serde(default)]
    pub ports: BTreeMap<String, u16>,
}

impl CreateSandboxRequest {
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            ..Default::default()
        }
    }

    pub fn with_limits(mut self, memory: impl Into<String>, cpu: impl Into<String>) -> Self {
        self.memory_limit = Some(memory.into());
        self.cpu_limit = Some(cpu.into());
        self
    }

    pub fn with_port(mut self, container_port: impl Into<String>, host_port: u16) -> Self {
        self.ports.insert(container_port.into(), host_port);
        self
    }
}

/// Result of running a command inside a sandbox
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecOutput {
    /// -1 when the process was terminated by a signal
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}
