// src/exec/signal.rs

//! Pid-level signalling used by `kill()` and the kill timer.
//!
//! These work on a bare pid so that a process can still be terminated after
//! its handle has been dropped from the registry. pid 0 is never signalled
//! (it would address the whole process group).

use std::io;

#[cfg(unix)]
mod imp {
    use std::io;

    use nix::errno::Errno;
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    pub fn terminate(pid: u32) -> io::Result<()> {
        send(pid, Signal::SIGTERM)
    }

    pub fn force_kill(pid: u32) -> io::Result<()> {
        send(pid, Signal::SIGKILL)
    }

    pub fn is_alive(pid: u32) -> bool {
        match kill(Pid::from_raw(pid as i32), None) {
            Ok(()) => true,
            // Exists but belongs to someone else.
            Err(Errno::EPERM) => true,
            Err(_) => false,
        }
    }

    fn send(pid: u32, signal: Signal) -> io::Result<()> {
        match kill(Pid::from_raw(pid as i32), signal) {
            Ok(()) | Err(Errno::ESRCH) => Ok(()),
            Err(errno) => Err(io::Error::from(errno)),
        }
    }
}

#[cfg(not(unix))]
mod imp {
    use std::io;
    use std::process::{Command, Stdio};

    pub fn terminate(pid: u32) -> io::Result<()> {
        taskkill(pid, false)
    }

    pub fn force_kill(pid: u32) -> io::Result<()> {
        taskkill(pid, true)
    }

    pub fn is_alive(pid: u32) -> bool {
        Command::new("tasklist")
            .args(["/FI", &format!("PID eq {pid}"), "/NH"])
            .stderr(Stdio::null())
            .output()
            .map(|out| String::from_utf8_lossy(&out.stdout).contains(&pid.to_string()))
            .unwrap_or(false)
    }

    fn taskkill(pid: u32, force: bool) -> io::Result<()> {
        let pid = pid.to_string();
        let mut args = vec!["/PID", pid.as_str()];
        if force {
            args.push("/F");
        }
        Command::new("taskkill")
            .args(&args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|_| ())
    }
}

/// Ask the process to terminate (SIGTERM).
pub fn terminate(pid: u32) -> io::Result<()> {
    if pid == 0 {
        return Ok(());
    }
    imp::terminate(pid)
}

/// Forcefully terminate the process (SIGKILL). Already-dead pids are fine.
pub fn force_kill(pid: u32) -> io::Result<()> {
    if pid == 0 {
        return Ok(());
    }
    imp::force_kill(pid)
}

/// Liveness probe (signal 0). A zombie that has not been reaped yet still
/// counts as alive.
pub fn is_alive(pid: u32) -> bool {
    pid != 0 && imp::is_alive(pid)
}
