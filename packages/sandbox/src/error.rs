// ABOUTME: Error types for sandbox lifecycle operations
// ABOUTME: Separates not-found and precondition failures from runtime command failures

use crate::registry::RegistryError;
use crate::runtime::RuntimeError;
use crate::types::SandboxStatus;
use thiserror::Error;

/// Main error type for sandbox manager operations
#[derive(Error, Debug)]
pub enum SandboxError {
    /// No sandbox is registered under this id
    #[error("Sandbox not found: {0}")]
    NotFound(String),

    /// Operation requires a different sandbox status
    #[error("Cannot {operation} sandbox {sandbox_id} in state {status}")]
    PreconditionFailed {
        sandbox_id: String,
        operation: &'static str,
        status: SandboxStatus,
    },

    /// Request rejected before touching the registry or runtime
    #[error("Invalid sandbox request: {0}")]
    InvalidRequest(String),

    /// Container runtime command failed
    #[error("Runtime failure: {0}")]
    Runtime(#[from] RuntimeError),

    /// Registry rejected a write
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
}

impl SandboxError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_precondition_failed(&self) -> bool {
        matches!(self, Self::PreconditionFailed { .. })
    }
}

/// Type alias for Results that return SandboxError
pub type Result<T> = std::result::Result<T, SandboxError>;
