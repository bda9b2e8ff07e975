// ABOUTME: Result and error types for process tree termination
// ABOUTME: Per-call kill accounting plus the signal errors an inspector can report

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Overall outcome of a tree kill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KillStatus {
    /// Every process exited after a graceful termination request
    Success,
    /// At least one descendant or the root had to be force-killed
    Partial,
    /// The root could not be signaled at all
    Failure,
}

impl KillStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Partial => "partial",
            Self::Failure => "failure",
        }
    }
}

impl std::fmt::Display for KillStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accounting for one `kill_process_tree` call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KillResult {
    pub status: KillStatus,
    /// 0 when the handle no longer knows its pid
    pub parent_pid: u32,
    pub children_found: usize,
    /// Descendants that exited within the grace period
    pub children_terminated: usize,
    /// Descendants that had to be force-killed
    pub children_killed: usize,
    pub parent_forcekilled: bool,
}

impl KillResult {
    pub fn new(parent_pid: u32) -> Self {
        Self {
            status: KillStatus::Success,
            parent_pid,
            children_found: 0,
            children_terminated: 0,
            children_killed: 0,
            parent_forcekilled: false,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignalError {
    #[error("Process {0} no longer exists")]
    NoSuchProcess(u32),

    #[error("Permission denied for process {0}")]
    AccessDenied(u32),

    #[error("Failed to signal process {pid}: {message}")]
    Failed { pid: u32, message: String },
}

impl SignalError {
    /// Races with a dying process; these never degrade the result
    pub fn is_expected(&self) -> bool {
        matches!(self, Self::NoSuchProcess(_) | Self::AccessDenied(_))
    }
}
