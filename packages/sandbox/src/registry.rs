// ABOUTME: Sandbox registry trait and in-memory implementation
// ABOUTME: Whole-record writes under a lock so concurrent readers never see torn state

use crate::types::{SandboxInfo, SandboxStatus};
use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Error, Debug, PartialEq)]
pub enum RegistryError {
    #[error("Sandbox already registered: {0}")]
    AlreadyExists(String),

    #[error("Sandbox not registered: {0}")]
    NotFound(String),

    #[error("Sandbox {sandbox_id} is {actual}, expected {expected}")]
    StatusMismatch {
        sandbox_id: String,
        expected: SandboxStatus,
        actual: SandboxStatus,
    },
}

pub type Result<T> = std::result::Result<T, RegistryError>;

/// Storage capability for sandbox records.
///
/// Every method works on whole records: a reader gets either the state before
/// or after a write, never a mix. Swapping in a durable store only requires a
/// new implementation of this trait.
#[async_trait]
pub trait SandboxRegistry: Send + Sync {
    /// Register a new record; fails if the id is taken
    async fn insert(&self, info: SandboxInfo) -> Result<()>;

    async fn get(&self, sandbox_id: &str) -> Option<SandboxInfo>;

    async fn list(&self) -> Vec<SandboxInfo>;

    /// Remove and return the record, if any
    async fn remove(&self, sandbox_id: &str) -> Option<SandboxInfo>;

    /// Move `expected` -> `new` atomically and return the updated record
    async fn compare_and_swap_status(
        &self,
        sandbox_id: &str,
        expected: SandboxStatus,
        new: SandboxStatus,
    ) -> Result<SandboxInfo>;

    /// Record the runtime's outcome for a Creating sandbox: container id, status and error together
    async fn set_container(
        &self,
        sandbox_id: &str,
        container_id: &str,
        status: SandboxStatus,
        error_message: Option<String>,
    ) -> Result<SandboxInfo>;
}

/// Registry kept in process memory; contents are lost on restart
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    sandboxes: RwLock<HashMap<String, SandboxInfo>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SandboxRegistry for InMemoryRegistry {
    async fn insert(&self, info: SandboxInfo) -> Result<()> {
        let mut sandboxes = self.sandboxes.write().await;
        if sandboxes.contains_key(&info.sandbox_id) {
            return Err(RegistryError::AlreadyExists(info.sandbox_id));
        }
        sandboxes.insert(info.sandbox_id.clone(), info);
        Ok(())
    }

    async fn get(&self, sandbox_id: &str) -> Option<SandboxInfo> {
        self.sandboxes.read().await.get(sandbox_id).cloned()
    }

    async fn list(&self) -> Vec<SandboxInfo> {
        self.sandboxes.read().await.values().cloned().collect()
    }

    async fn remove(&self, sandbox_id: &str) -> Option<SandboxInfo> {
        self.sandboxes.write().await.remove(sandbox_id)
    }

    async fn compare_and_swap_status(
        &self,
        sandbox_id: &str,
        expected: SandboxStatus,
        new: SandboxStatus,
    ) -> Result<SandboxInfo> {
        let mut sandboxes = self.sandboxes.write().await;
        let current = sandboxes
            .get(sandbox_id)
            .ok_or_else(|| RegistryError::NotFound(sandbox_id.to_string()))?;

        if current.status != expected {
            return Err(RegistryError::StatusMismatch {
                sandbox_id: sandbox_id.to_string(),
                expected,
                actual: current.status,
            });
        }

        let mut updated = current.clone();
        updated.status = new;
        updated.stopped_at = match new {
            SandboxStatus::Stopped => Some(chrono::Utc::now()),
            _ => None,
        };
        sandboxes.insert(sandbox_id.to_string(), updated.clone());
        Ok(updated)
    }

    async fn set_container(
        &self,
        sandbox_id: &str,
        container_id: &str,
        status: SandboxStatus,
        error_message: Option<String>,
    ) -> Result<SandboxInfo> {
        let mut sandboxes = self.sandboxes.write().await;
        let current = sandboxes
            .get(sandbox_id)
            .ok_or_else(|| RegistryError::NotFound(sandbox_id.to_string()))?;

        if current.status != SandboxStatus::Creating {
            return Err(RegistryError::StatusMismatch {
                sandbox_id: sandbox_id.to_string(),
                expected: SandboxStatus::Creating,
                actual: current.status,
            });
        }

        let mut updated = current.clone();
        updated.container_id = container_id.to_string();
        updated.status = status;
        updated.error_message = error_message;
        sandboxes.insert(sandbox_id.to_string(), updated.clone());
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResourceLimits;
    use chrono::Utc;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn record(id: &str, status: SandboxStatus) -> SandboxInfo {
        SandboxInfo {
            sandbox_id: id.to_string(),
            container_id: String::new(),
            container_name: format!("autocoder-sandbox-demo-{}", id),
            volume_name: format!("autocoder-sandbox-demo-{}-workspace", id),
            project_name: "demo".to_string(),
            status,
            created_at: Utc::now(),
            stopped_at: None,
            workspace_path: "/workspace".to_string(),
            ports: BTreeMap::new(),
            resource_limits: ResourceLimits {
                memory: "2g".to_string(),
                cpu: "2.0".to_string(),
            },
            error_message: None,
        }
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_id() {
        let registry = InMemoryRegistry::new();
        registry
            .insert(record("sandbox-1", SandboxStatus::Creating))
            .await
            .unwrap();

        let err = registry
            .insert(record("sandbox-1", SandboxStatus::Running))
            .await
            .unwrap_err();
        assert_eq!(err, RegistryError::AlreadyExists("sandbox-1".to_string()));
        assert_eq!(
            registry.get("sandbox-1").await.unwrap().status,
            SandboxStatus::Creating
        );
    }

    #[tokio::test]
    async fn test_compare_and_swap_status() {
        let registry = InMemoryRegistry::new();
        registry
            .insert(record("sandbox-1", SandboxStatus::Running))
            .await
            .unwrap();

        let stopped = registry
            .compare_and_swap_status("sandbox-1", SandboxStatus::Running, SandboxStatus::Stopped)
            .await
            .unwrap();
        assert_eq!(stopped.status, SandboxStatus::Stopped);
        assert!(stopped.stopped_at.is_some());

        let err = registry
            .compare_and_swap_status("sandbox-1", SandboxStatus::Running, SandboxStatus::Stopped)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RegistryError::StatusMismatch {
                actual: SandboxStatus::Stopped,
                ..
            }
        ));

        let restarted = registry
            .compare_and_swap_status("sandbox-1", SandboxStatus::Stopped, SandboxStatus::Running)
            .await
            .unwrap();
        assert!(restarted.stopped_at.is_none());
    }

    #[tokio::test]
    async fn test_set_container_only_from_creating() {
        let registry = InMemoryRegistry::new();
        registry
            .insert(record("sandbox-1", SandboxStatus::Creating))
            .await
            .unwrap();

        let running = registry
            .set_container("sandbox-1", "abc123", SandboxStatus::Running, None)
            .await
            .unwrap();
        assert_eq!(running.container_id, "abc123");
        assert_eq!(running.status, SandboxStatus::Running);

        let err = registry
            .set_container("sandbox-1", "def456", SandboxStatus::Running, None)
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::StatusMismatch { .. }));
        assert_eq!(registry.get("sandbox-1").await.unwrap().container_id, "abc123");
    }

    #[tokio::test]
    async fn test_missing_record_errors() {
        let registry = InMemoryRegistry::new();

        assert!(registry.get("nope").await.is_none());
        assert!(registry.remove("nope").await.is_none());
        assert_eq!(
            registry
                .compare_and_swap_status("nope", SandboxStatus::Running, SandboxStatus::Stopped)
                .await
                .unwrap_err(),
            RegistryError::NotFound("nope".to_string())
        );
    }

    #[tokio::test]
    async fn test_concurrent_readers_see_whole_records() {
        let registry = Arc::new(InMemoryRegistry::new());
        registry
            .insert(record("sandbox-1", SandboxStatus::Creating))
            .await
            .unwrap();

        let writer = {
            let registry = registry.clone();
            tokio::spawn(async move {
                registry
                    .set_container("sandbox-1", "abc123", SandboxStatus::Running, None)
                    .await
                    .unwrap();
            })
        };

        for _ in 0..100 {
            let info = registry.get("sandbox-1").await.unwrap();
            // container id and status always change together
            match info.status {
                SandboxStatus::Creating => assert!(info.container_id.is_empty()),
                SandboxStatus::Running => assert_eq!(info.container_id, "abc123"),
                other => panic!("unexpected status {other}"),
            }
            tokio::task::yield_now().await;
        }

        writer.await.unwrap();
    }
}
