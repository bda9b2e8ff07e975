// ABOUTME: Container runtime trait and shared types for sandbox backends
// ABOUTME: Abstracts volume, container, exec and copy operations behind one async interface

use crate::types::ExecOutput;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

pub mod docker_cli;

pub use docker_cli::DockerCli;

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with code {}: {stderr}", display_code(.exit_code))]
    CommandFailed {
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },
}

fn display_code(code: &Option<i32>) -> String {
    code.map(|c| c.to_string())
        .unwrap_or_else(|| "<signal>".to_string())
}

impl RuntimeError {
    /// Captured stderr of a failed command, empty for spawn failures
    pub fn stderr(&self) -> &str {
        match self {
            Self::Spawn { .. } => "",
            Self::CommandFailed { stderr, .. } => stderr,
        }
    }
}

pub type Result<T> = std::result::Result<T, RuntimeError>;

/// Everything needed to launch one detached sandbox container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSpec {
    pub image: String,
    pub container_name: String,
    pub network: String,
    pub volume_name: String,
    pub workspace_path: String,
    pub memory_limit: String,
    pub cpu_limit: String,
    /// container port -> host port
    pub ports: BTreeMap<String, u16>,
    pub labels: BTreeMap<String, String>,
}

/// Control surface of a container engine.
///
/// Each call maps to one engine operation. Implementations must not apply
/// their own timeouts; callers bound latency when they need to.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Check whether the engine answers at all
    async fn is_available(&self) -> bool;

    /// Create a named persistent volume
    async fn create_volume(&self, name: &str) -> Result<()>;

    /// Remove a named volume
    async fn remove_volume(&self, name: &str) -> Result<()>;

    /// Run a detached container and return its id
    async fn run_container(&self, spec: &RunSpec) -> Result<String>;

    /// Start a stopped container
    async fn start_container(&self, container_id: &str) -> Result<()>;

    /// Stop a running container
    async fn stop_container(&self, container_id: &str) -> Result<()>;

    /// Remove a container, killing it first when `force` is set
    async fn remove_container(&self, container_id: &str, force: bool) -> Result<()>;

    /// Execute a command; a non-zero exit is a value, not an error
    async fn exec(&self, container_id: &str, command: &[String], workdir: &str)
        -> Result<ExecOutput>;

    /// Copy a host path into the container
    async fn copy_in(&self, container_id: &str, host_path: &Path, container_path: &str)
        -> Result<()>;

    /// Copy a container path out to the host
    async fn copy_out(&self, container_id: &str, container_path: &str, host_path: &Path)
        -> Result<()>;
}
