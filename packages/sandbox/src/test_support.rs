// ABOUTME: Shared unit-test helpers for the sandbox crate
// ABOUTME: Mock container runtime plus seeded registry records with a chosen age

use crate::registry::{InMemoryRegistry, SandboxRegistry};
use crate::runtime::{ContainerRuntime, Result, RunSpec};
use crate::types::{ExecOutput, ResourceLimits, SandboxInfo, SandboxStatus};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use mockall::mock;
use std::collections::BTreeMap;
use std::path::Path;

mock! {
    pub Runtime {}

    #[async_trait]
    impl ContainerRuntime for Runtime {
        async fn is_available(&self) -> bool;
        async fn create_volume(&self, name: &str) -> Result<()>;
        async fn remove_volume(&self, name: &str) -> Result<()>;
        async fn run_container(&self, spec: &RunSpec) -> Result<String>;
        async fn start_container(&self, container_id: &str) -> Result<()>;
        async fn stop_container(&self, container_id: &str) -> Result<()>;
        async fn remove_container(&self, container_id: &str, force: bool) -> Result<()>;
        async fn exec(&self, container_id: &str, command: &[String], workdir: &str) -> Result<ExecOutput>;
        async fn copy_in(&self, container_id: &str, host_path: &Path, container_path: &str) -> Result<()>;
        async fn copy_out(&self, container_id: &str, container_path: &str, host_path: &Path) -> Result<()>;
    }
}

/// Register a record whose container id is `cid-<id>`, created `age_hours` ago
pub async fn insert_record(
    registry: &InMemoryRegistry,
    id: &str,
    status: SandboxStatus,
    age_hours: i64,
) {
    registry
        .insert(SandboxInfo {
            sandbox_id: id.to_string(),
            container_id: format!("cid-{}", id),
            container_name: format!("autocoder-sandbox-demo-{}", id),
            volume_name: format!("autocoder-sandbox-demo-{}-workspace", id),
            project_name: "demo".to_string(),
            status,
            created_at: Utc::now() - Duration::hours(age_hours),
            stopped_at: None,
            workspace_path: "/workspace".to_string(),
            ports: BTreeMap::new(),
            resource_limits: ResourceLimits {
                memory: "2g".to_string(),
                cpu: "2.0".to_string(),
            },
            error_message: None,
        })
        .await
        .unwrap();
}
