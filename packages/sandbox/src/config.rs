// ABOUTME: Sandbox manager configuration with environment overrides
// ABOUTME: Image, network, naming, default limits and cleanup schedule for sandboxes

use autocoder_config::constants;
use autocoder_config::{
    parse_env_or_default, parse_env_or_default_with_validation, parse_env_with_fallback,
    string_env_or_default,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_IMAGE: &str = "autocoder-sandbox:latest";
pub const DEFAULT_NETWORK: &str = "autocoder_default";
pub const DEFAULT_WORKSPACE_PATH: &str = "/workspace";
pub const DEFAULT_MEMORY_LIMIT: &str = "2g";
pub const DEFAULT_CPU_LIMIT: &str = "2.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SandboxConfig {
    pub image: String,
    pub network: String,
    pub workspace_path: String,
    /// Container names are `<name_prefix>-<project>-<sandbox_id>`
    pub name_prefix: String,
    /// Labels are `<label_prefix>.sandbox`, `<label_prefix>.project`, `<label_prefix>.sandbox_id`
    pub label_prefix: String,
    /// Docker-compatible binary used by the CLI runtime
    pub runtime_binary: String,
    pub default_memory_limit: String,
    pub default_cpu_limit: String,
    pub cleanup_interval_minutes: u64,
    pub cleanup_older_than_hours: u64,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            image: DEFAULT_IMAGE.to_string(),
            network: DEFAULT_NETWORK.to_string(),
            workspace_path: DEFAULT_WORKSPACE_PATH.to_string(),
            name_prefix: "autocoder-sandbox".to_string(),
            label_prefix: "autocoder".to_string(),
            runtime_binary: "docker".to_string(),
            default_memory_limit: DEFAULT_MEMORY_LIMIT.to_string(),
            default_cpu_limit: DEFAULT_CPU_LIMIT.to_string(),
            cleanup_interval_minutes: 60,
            cleanup_older_than_hours: 24,
        }
    }
}

impl SandboxConfig {
    /// Build a configuration from `AUTOCODER_*` environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            image: string_env_or_default(constants::AUTOCODER_SANDBOX_IMAGE, &defaults.image),
            network: string_env_or_default(constants::AUTOCODER_SANDBOX_NETWORK, &defaults.network),
            workspace_path: string_env_or_default(
                constants::AUTOCODER_SANDBOX_WORKSPACE,
                &defaults.workspace_path,
            ),
            runtime_binary: parse_env_with_fallback(
                constants::AUTOCODER_CONTAINER_RUNTIME,
                constants::DOCKER_BINARY,
                defaults.runtime_binary.clone(),
            ),
            default_memory_limit: string_env_or_default(
                constants::AUTOCODER_SANDBOX_MEMORY_LIMIT,
                &defaults.default_memory_limit,
            ),
            default_cpu_limit: string_env_or_default(
                constants::AUTOCODER_SANDBOX_CPU_LIMIT,
                &defaults.default_cpu_limit,
            ),
            cleanup_interval_minutes: parse_env_or_default_with_validation(
                constants::AUTOCODER_SANDBOX_CLEANUP_INTERVAL_MINUTES,
                defaults.cleanup_interval_minutes,
                |v| (1..=1440).contains(&v),
            ),
            cleanup_older_than_hours: parse_env_or_default(
                constants::AUTOCODER_SANDBOX_CLEANUP_AGE_HOURS,
                defaults.cleanup_older_than_hours,
            ),
            ..defaults
        }
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_minutes.max(1) * 60)
    }
}
