// ABOUTME: Recursive process tree termination with graceful-then-forceful escalation
// ABOUTME: Descendants are snapshotted once, signaled first, then the root handle is stopped

use crate::handle::ProcessHandle;
use crate::inspector::{ProcessInspector, SystemInspector};
use crate::types::{KillResult, KillStatus};
use autocoder_config::constants::AUTOCODER_KILL_GRACE_SECS;
use autocoder_config::parse_env_or_default_with_validation;
use std::time::Duration;
use tracing::{debug, info, warn};

/// How long processes get to exit after a graceful termination request
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5);

const FALLBACK_WAIT: Duration = Duration::from_secs(1);

/// Grace period from `AUTOCODER_KILL_GRACE_SECS` (1..=300), default 5 seconds
pub fn grace_period_from_env() -> Duration {
    let secs = parse_env_or_default_with_validation(
        AUTOCODER_KILL_GRACE_SECS,
        DEFAULT_GRACE_PERIOD.as_secs(),
        |v| (1..=300).contains(&v),
    );
    Duration::from_secs(secs)
}

/// Kill `handle` and everything it spawned, using the live process table.
///
/// Blocks for up to roughly twice `grace`; call it from `spawn_blocking` in
/// async code. Never panics on already-exited or inaccessible processes.
pub fn kill_process_tree<H>(handle: &mut H, grace: Duration) -> KillResult
where
    H: ProcessHandle + ?Sized,
{
    let mut inspector = SystemInspector::new();
    kill_process_tree_with(&mut inspector, handle, grace)
}

/// Same as [`kill_process_tree`] with an explicit inspector
pub fn kill_process_tree_with<I, H>(
    inspector: &mut I,
    handle: &mut H,
    grace: Duration,
) -> KillResult
where
    I: ProcessInspector + ?Sized,
    H: ProcessHandle + ?Sized,
{
    let Some(pid) = handle.pid() else {
        debug!("Process handle has no pid, terminating directly");
        return terminate_directly(handle, KillResult::new(0));
    };
    let mut result = KillResult::new(pid);

    // Once reaped, the pid may already name an unrelated process
    if matches!(handle.wait_timeout(Duration::ZERO), Ok(true)) {
        debug!("PID {} already exited, skipping tree walk", pid);
        return terminate_directly(handle, result);
    }

    let children = match inspector.descendants(pid) {
        Ok(children) => children,
        Err(e) => {
            debug!("PID {} not inspectable ({}), terminating directly", pid, e);
            return terminate_directly(handle, result);
        }
    };
    result.children_found = children.len();
    debug!(
        "Killing process tree: PID {} with {} children",
        pid,
        children.len()
    );

    for &child in &children {
        if let Err(e) = inspector.terminate(child) {
            debug!("Child PID {} already gone or inaccessible: {}", child, e);
        }
    }

    let (gone, still_alive) = if children.is_empty() {
        (Vec::new(), Vec::new())
    } else {
        inspector.wait_for_exit(&children, grace)
    };
    result.children_terminated = gone.len();
    debug!(
        "Children after graceful wait: {} terminated, {} still alive",
        gone.len(),
        still_alive.len()
    );

    for child in still_alive {
        debug!("Force-killing child PID {}", child);
        match inspector.kill(child) {
            Ok(()) => result.children_killed += 1,
            Err(e) => debug!("Child PID {} gone during force-kill: {}", child, e),
        }
    }

    if result.children_killed > 0 {
        result.status = KillStatus::Partial;
    }

    stop_root(handle, pid, grace, &mut result);

    debug!(
        "Process tree kill complete: status={}, children={} (terminated={}, killed={})",
        result.status, result.children_found, result.children_terminated, result.children_killed
    );
    if result.status != KillStatus::Success {
        info!(
            "Process tree of PID {} needed force: {} child(ren) killed, parent force-killed: {}",
            pid, result.children_killed, result.parent_forcekilled
        );
    }

    result
}

fn stop_root<H>(handle: &mut H, pid: u32, grace: Duration, result: &mut KillResult)
where
    H: ProcessHandle + ?Sized,
{
    debug!("Terminating parent PID {}", pid);
    if let Err(e) = handle.terminate() {
        debug!("SIGTERM to parent PID {} failed: {}", pid, e);
    }

    if matches!(handle.wait_timeout(grace), Ok(true)) {
        debug!("Parent PID {} terminated gracefully", pid);
        return;
    }

    debug!("Parent PID {} did not terminate, force-killing", pid);
    let kill_outcome = handle.kill();
    let exited = matches!(handle.wait_timeout(grace), Ok(true));

    result.parent_forcekilled = true;
    result.status = KillStatus::Partial;

    if !exited {
        match kill_outcome {
            Err(e) => {
                warn!("Could not force-kill parent PID {}: {}", pid, e);
                result.status = KillStatus::Failure;
            }
            Ok(()) => warn!("Parent PID {} still running after force-kill", pid),
        }
    }
}

/// Root-only path for handles whose process cannot be enumerated
fn terminate_directly<H>(handle: &mut H, mut result: KillResult) -> KillResult
where
    H: ProcessHandle + ?Sized,
{
    let pid = result.parent_pid;

    if let Err(e) = handle.terminate() {
        debug!("Direct termination of PID {} failed: {}", pid, e);
    } else if matches!(handle.wait_timeout(FALLBACK_WAIT), Ok(true)) {
        debug!("Direct termination of PID {} succeeded", pid);
        return result;
    }

    match handle.kill() {
        Ok(()) => debug!("Direct force-kill of PID {} succeeded", pid),
        Err(e) => {
            warn!("Direct force-kill of PID {} failed: {}", pid, e);
            result.status = KillStatus::Failure;
        }
    }

    result
}
