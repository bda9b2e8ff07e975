// ABOUTME: Root process handle abstraction for tree termination
// ABOUTME: Implemented for std and tokio child processes with graceful and forceful signals

use std::io;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A process the caller spawned and still owns.
///
/// `terminate` asks politely (SIGTERM on Unix), `kill` does not. Both succeed
/// on a process that has already exited.
pub trait ProcessHandle {
    /// `None` once the handle has reaped the process and forgotten its pid
    fn pid(&self) -> Option<u32>;

    fn terminate(&mut self) -> io::Result<()>;

    fn kill(&mut self) -> io::Result<()>;

    /// Wait up to `timeout` for exit; `Ok(true)` when the process has exited
    fn wait_timeout(&mut self, timeout: Duration) -> io::Result<bool>;
}

#[cfg(unix)]
fn send_sigterm(pid: u32) -> io::Result<()> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    kill(Pid::from_raw(pid as i32), Signal::SIGTERM).map_err(io::Error::from)
}

fn poll_until_exit<F>(timeout: Duration, mut exited: F) -> io::Result<bool>
where
    F: FnMut() -> io::Result<bool>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if exited()? {
            return Ok(true);
        }
        let now = Instant::now();
        if now >= deadline {
            return Ok(false);
        }
        std::thread::sleep(POLL_INTERVAL.min(deadline - now));
    }
}

impl ProcessHandle for std::process::Child {
    fn pid(&self) -> Option<u32> {
        Some(self.id())
    }

    fn terminate(&mut self) -> io::Result<()> {
        // A reaped pid may already belong to someone else
        if self.try_wait()?.is_some() {
            return Ok(());
        }

        #[cfg(unix)]
        {
            send_sigterm(self.id())
        }

        #[cfg(not(unix))]
        {
            std::process::Child::kill(self)
        }
    }

    fn kill(&mut self) -> io::Result<()> {
        if self.try_wait()?.is_some() {
            return Ok(());
        }
        std::process::Child::kill(self)
    }

    fn wait_timeout(&mut self, timeout: Duration) -> io::Result<bool> {
        poll_until_exit(timeout, || Ok(self.try_wait()?.is_some()))
    }
}

impl ProcessHandle for tokio::process::Child {
    fn pid(&self) -> Option<u32> {
        self.id()
    }

    fn terminate(&mut self) -> io::Result<()> {
        if self.id().is_none() || self.try_wait()?.is_some() {
            return Ok(());
        }

        #[cfg(unix)]
        {
            match self.id() {
                Some(pid) => send_sigterm(pid),
                None => Ok(()),
            }
        }

        #[cfg(not(unix))]
        {
            self.start_kill()
        }
    }

    fn kill(&mut self) -> io::Result<()> {
        if self.id().is_none() || self.try_wait()?.is_some() {
            return Ok(());
        }
        self.start_kill()
    }

    fn wait_timeout(&mut self, timeout: Duration) -> io::Result<bool> {
        poll_until_exit(timeout, || {
            if self.id().is_none() {
                return Ok(true);
            }
            Ok(self.try_wait()?.is_some())
        })
    }
}
