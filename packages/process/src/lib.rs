// ABOUTME: Process tree termination for agent and dev-server sessions
// ABOUTME: Kills a spawned process and every descendant with graceful-then-forceful escalation

pub mod handle;
pub mod inspector;
pub mod tree;
pub mod types;

pub use handle::ProcessHandle;
pub use inspector::{ProcessInspector, SystemInspector};
pub use tree::{
    grace_period_from_env, kill_process_tree, kill_process_tree_with, DEFAULT_GRACE_PERIOD,
};
pub use types::{KillResult, KillStatus, SignalError};
