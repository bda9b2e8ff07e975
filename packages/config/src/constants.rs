// ABOUTME: Environment variable name constants
// ABOUTME: Centralized definitions of all environment variable names used by the sandbox core

// Container Runtime Configuration
pub const AUTOCODER_CONTAINER_RUNTIME: &str = "AUTOCODER_CONTAINER_RUNTIME";
pub const DOCKER_BINARY: &str = "DOCKER_BINARY"; // Legacy

// Sandbox Defaults
pub const AUTOCODER_SANDBOX_IMAGE: &str = "AUTOCODER_SANDBOX_IMAGE";
pub const AUTOCODER_SANDBOX_NETWORK: &str = "AUTOCODER_SANDBOX_NETWORK";
pub const AUTOCODER_SANDBOX_WORKSPACE: &str = "AUTOCODER_SANDBOX_WORKSPACE";
pub const AUTOCODER_SANDBOX_MEMORY_LIMIT: &str = "AUTOCODER_SANDBOX_MEMORY_LIMIT";
pub const AUTOCODER_SANDBOX_CPU_LIMIT: &str = "AUTOCODER_SANDBOX_CPU_LIMIT";

// Stopped Sandbox Cleanup
pub const AUTOCODER_SANDBOX_CLEANUP_INTERVAL_MINUTES: &str =
    "AUTOCODER_SANDBOX_CLEANUP_INTERVAL_MINUTES";
pub const AUTOCODER_SANDBOX_CLEANUP_AGE_HOURS: &str = "AUTOCODER_SANDBOX_CLEANUP_AGE_HOURS";

// Process Supervision
pub const AUTOCODER_KILL_GRACE_SECS: &str = "AUTOCODER_KILL_GRACE_SECS";
