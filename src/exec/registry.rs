// src/exec/registry.rs

//! Table of in-flight asynchronous processes, keyed by pid.

use std::collections::BTreeMap;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::types::ProcessOutcome;

use super::kill_timer::KillTimer;
use super::process::ProcessHandle;

/// Owns every process started with `RunMode::Async` until it is reaped or
/// killed.
///
/// Each registered process has a waiter task that fills the handle's exit
/// slot and posts the pid on the wake channel. [`ProcessRegistry::next_exit`]
/// awaits those wake-ups; [`ProcessRegistry::reap`] is the non-blocking
/// collection step and never waits on anything.
#[derive(Debug)]
pub struct ProcessRegistry {
    handles: BTreeMap<u32, ProcessHandle>,
    /// Escalation timers taken over from handles removed by `kill`.
    timers: Vec<KillTimer>,
    wake_tx: mpsc::UnboundedSender<u32>,
    wake_rx: mpsc::UnboundedReceiver<u32>,
}

impl Default for ProcessRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessRegistry {
    pub fn new() -> Self {
        let (wake_tx, wake_rx) = mpsc::unbounded_channel();
        Self {
            handles: BTreeMap::new(),
            timers: Vec::new(),
            wake_tx,
            wake_rx,
        }
    }

    pub(crate) fn waker(&self) -> mpsc::UnboundedSender<u32> {
        self.wake_tx.clone()
    }

    /// Store a running handle. A stale handle under the same pid (pid reuse
    /// after a missed reap) is replaced.
    pub fn add(&mut self, handle: ProcessHandle) {
        let Some(pid) = handle.pid() else {
            warn!(cmd = %handle.command(), "refusing to register a handle without a pid");
            return;
        };
        if self.handles.insert(pid, handle).is_some() {
            warn!(pid, "replaced existing registry entry for reused pid");
        }
        debug!(pid, "process registered");
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn contains(&self, pid: u32) -> bool {
        self.handles.contains_key(&pid)
    }

    pub fn pids(&self) -> Vec<u32> {
        self.handles.keys().copied().collect()
    }

    pub fn get(&self, pid: u32) -> Option<&ProcessHandle> {
        self.handles.get(&pid)
    }

    pub fn get_mut(&mut self, pid: u32) -> Option<&mut ProcessHandle> {
        self.handles.get_mut(&pid)
    }

    /// Number of escalation timers still pending for killed processes.
    pub fn armed_timers(&self) -> usize {
        self.timers.iter().filter(|t| t.is_armed()).count()
    }

    /// Collect every process whose exit is known, without blocking.
    ///
    /// Subscribers of a reaped handle are notified after it has left the
    /// table, so a subscriber that starts new work (and thus registers new
    /// handles) never observes a half-updated registry. After each removal
    /// the scan restarts from a fresh snapshot of the pid set.
    pub fn reap(&mut self) -> Vec<(u32, ProcessOutcome)> {
        // The exit slots are the truth; pending wake-ups only matter for
        // the timers of processes that were killed and dropped.
        while let Ok(pid) = self.wake_rx.try_recv() {
            self.on_wake(pid);
        }

        let mut reaped = Vec::new();
        'scan: loop {
            let snapshot = self.pids();
            for pid in snapshot {
                let exited = match self.handles.get_mut(&pid) {
                    Some(handle) => handle.try_reap().is_some(),
                    None => false,
                };
                if !exited {
                    continue;
                }

                let Some(mut handle) = self.handles.remove(&pid) else {
                    continue;
                };
                let outcome = handle.outcome().unwrap_or(ProcessOutcome::Exited(-1));
                info!(pid, %outcome, cmd = %handle.command(), "reaped process");
                handle.notify();
                reaped.push((pid, outcome));
                continue 'scan;
            }
            break;
        }

        self.timers.retain(KillTimer::is_armed);
        reaped
    }

    /// Kill `pid` with the given tolerance and forget it immediately.
    ///
    /// Subscribers of the handle are not notified. Returns `false` if the pid
    /// is not registered.
    pub fn kill(&mut self, pid: u32, tolerance: u64) -> bool {
        let Some(mut handle) = self.handles.remove(&pid) else {
            debug!(pid, "kill requested for unknown pid");
            return false;
        };
        handle.kill(tolerance);
        if let Some(timer) = handle.take_kill_timer() {
            self.timers.push(timer);
        }
        true
    }

    /// Wait for the next exit wake-up from a waiter task.
    ///
    /// Returns `None` only if the wake channel closed, which cannot happen
    /// while the registry is alive.
    pub async fn next_exit(&mut self) -> Option<u32> {
        let pid = self.wake_rx.recv().await?;
        self.on_wake(pid);
        Some(pid)
    }

    /// A process that is no longer registered has exited: its escalation
    /// timer must not fire at a pid the OS may hand out again.
    fn on_wake(&mut self, pid: u32) {
        if self.handles.contains_key(&pid) {
            return;
        }
        let before = self.timers.len();
        self.timers.retain(|t| t.pid() != pid);
        if self.timers.len() != before {
            debug!(pid, "killed process exited; escalation timer dropped");
        }
    }
}
