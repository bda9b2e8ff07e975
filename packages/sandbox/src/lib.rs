// ABOUTME: Sandbox lifecycle management for isolated per-project containers
// ABOUTME: Registry, container runtime client, lifecycle manager and periodic cleanup

pub mod cleanup;
pub mod config;
pub mod error;
pub mod manager;
pub mod registry;
pub mod runtime;
pub mod types;

#[cfg(test)]
mod test_support;

pub use cleanup::CleanupTask;
pub use config::SandboxConfig;
pub use error::{Result, SandboxError};
pub use manager::SandboxManager;
pub use registry::{InMemoryRegistry, RegistryError, SandboxRegistry};
pub use runtime::{ContainerRuntime, DockerCli, RunSpec, RuntimeError};
pub use types::{CreateSandboxRequest, ExecOutput, ResourceLimits, SandboxInfo, SandboxStatus};
