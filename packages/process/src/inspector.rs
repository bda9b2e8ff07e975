// ABOUTME: Host process inspection used to find and signal descendants
// ABOUTME: sysinfo for enumeration and liveness, nix signals on Unix

use crate::types::SignalError;
use std::collections::{HashMap, HashSet, VecDeque};
use std::time::{Duration, Instant};
use sysinfo::{Pid, ProcessStatus, System};
use tracing::debug;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Enumerates and signals arbitrary processes by pid
pub trait ProcessInspector {
    /// Every transitive descendant of `pid` as of now.
    /// `NoSuchProcess` when `pid` itself cannot be found.
    fn descendants(&mut self, pid: u32) -> Result<Vec<u32>, SignalError>;

    fn terminate(&mut self, pid: u32) -> Result<(), SignalError>;

    fn kill(&mut self, pid: u32) -> Result<(), SignalError>;

    /// Wait until every pid has exited or `timeout` passes; returns (gone, alive)
    fn wait_for_exit(&mut self, pids: &[u32], timeout: Duration) -> (Vec<u32>, Vec<u32>);
}

/// Inspector backed by the live process table
pub struct SystemInspector {
    system: System,
}

impl Default for SystemInspector {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemInspector {
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }

    /// Zombies have exited; they are only waiting to be reaped
    fn is_alive(&self, pid: u32) -> bool {
        self.system
            .process(Pid::from_u32(pid))
            .is_some_and(|p| p.status() != ProcessStatus::Zombie)
    }

    #[cfg(unix)]
    fn signal(&mut self, pid: u32, signal: nix::sys::signal::Signal) -> Result<(), SignalError> {
        use nix::errno::Errno;
        use nix::unistd::Pid as NixPid;

        match nix::sys::signal::kill(NixPid::from_raw(pid as i32), signal) {
            Ok(()) => Ok(()),
            Err(Errno::ESRCH) => Err(SignalError::NoSuchProcess(pid)),
            Err(Errno::EPERM) => Err(SignalError::AccessDenied(pid)),
            Err(e) => Err(SignalError::Failed {
                pid,
                message: e.to_string(),
            }),
        }
    }

    #[cfg(not(unix))]
    fn signal(&mut self, pid: u32, graceful: bool) -> Result<(), SignalError> {
        self.system.refresh_processes();
        let process = self
            .system
            .process(Pid::from_u32(pid))
            .ok_or(SignalError::NoSuchProcess(pid))?;

        let delivered = if graceful {
            process
                .kill_with(sysinfo::Signal::Term)
                .unwrap_or_else(|| process.kill())
        } else {
            process.kill()
        };

        if delivered {
            Ok(())
        } else {
            Err(SignalError::AccessDenied(pid))
        }
    }
}

impl ProcessInspector for SystemInspector {
    fn descendants(&mut self, pid: u32) -> Result<Vec<u32>, SignalError> {
        self.system.refresh_processes();

        if self.system.process(Pid::from_u32(pid)).is_none() {
            return Err(SignalError::NoSuchProcess(pid));
        }

        // On Linux threads show up as entries parented to their process
        let threads: HashSet<Pid> = self
            .system
            .processes()
            .iter()
            .filter_map(|(owner, p)| p.tasks().map(|tasks| (owner, tasks)))
            .flat_map(|(owner, tasks)| tasks.iter().filter(move |t| *t != owner).copied())
            .collect();

        let mut children: HashMap<Pid, Vec<Pid>> = HashMap::new();
        for (child, process) in self.system.processes() {
            if threads.contains(child) {
                continue;
            }
            if let Some(parent) = process.parent() {
                children.entry(parent).or_default().push(*child);
            }
        }

        let mut found = Vec::new();
        let mut seen = HashSet::from([Pid::from_u32(pid)]);
        let mut queue = VecDeque::from([Pid::from_u32(pid)]);
        while let Some(current) = queue.pop_front() {
            for child in children.get(&current).into_iter().flatten() {
                if seen.insert(*child) {
                    found.push(child.as_u32());
                    queue.push_back(*child);
                }
            }
        }

        debug!("PID {} has {} descendant(s)", pid, found.len());
        Ok(found)
    }

    fn terminate(&mut self, pid: u32) -> Result<(), SignalError> {
        #[cfg(unix)]
        {
            self.signal(pid, nix::sys::signal::Signal::SIGTERM)
        }

        #[cfg(not(unix))]
        {
            self.signal(pid, true)
        }
    }

    fn kill(&mut self, pid: u32) -> Result<(), SignalError> {
        #[cfg(unix)]
        {
            self.signal(pid, nix::sys::signal::Signal::SIGKILL)
        }

        #[cfg(not(unix))]
        {
            self.signal(pid, false)
        }
    }

    fn wait_for_exit(&mut self, pids: &[u32], timeout: Duration) -> (Vec<u32>, Vec<u32>) {
        let deadline = Instant::now() + timeout;

        loop {
            self.system.refresh_processes();
            let (gone, alive): (Vec<u32>, Vec<u32>) =
                pids.iter().copied().partition(|pid| !self.is_alive(*pid));

            let now = Instant::now();
            if alive.is_empty() || now >= deadline {
                return (gone, alive);
            }
            std::thread::sleep(POLL_INTERVAL.min(deadline - now));
        }
    }
}
