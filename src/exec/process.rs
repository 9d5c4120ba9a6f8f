// src/exec/process.rs

//! One spawned OS process and its outcome.

use std::process::ExitStatus;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Child;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::types::{ProcessOutcome, RunMode};

use super::kill_timer::KillTimer;
use super::registry::ProcessRegistry;
use super::signal;
use super::spawner::ProcessSpawner;
use super::tokenize::tokenize;

/// Shared cell holding a process outcome once it is known.
///
/// The waiter task of an async process fills it; the handle, the registry and
/// the job queue read it without blocking.
#[derive(Debug, Clone, Default)]
pub struct ExitSlot(Arc<Mutex<Option<ProcessOutcome>>>);

impl ExitSlot {
    pub fn get(&self) -> Option<ProcessOutcome> {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn set(&self, outcome: ProcessOutcome) {
        let mut guard = self.0.lock().unwrap_or_else(|e| e.into_inner());
        if guard.is_none() {
            *guard = Some(outcome);
        }
    }
}

/// Result of [`ProcessHandle::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Launch {
    /// The outcome is already known (`Wait` mode, or the spawn failed).
    Finished(ProcessOutcome),
    /// The process is running and registered under this pid.
    Registered(u32),
}

/// In-process record of one spawned OS process.
#[derive(Debug)]
pub struct ProcessHandle {
    command: String,
    spawner: Arc<dyn ProcessSpawner>,
    pid: Option<u32>,
    /// Present until the process is handed to a waiter task.
    child: Option<Child>,
    slot: ExitSlot,
    subscribers: Vec<oneshot::Sender<ProcessOutcome>>,
    kill_timer: Option<KillTimer>,
}

impl ProcessHandle {
    pub fn new(command: impl Into<String>, spawner: Arc<dyn ProcessSpawner>) -> Self {
        Self {
            command: command.into(),
            spawner,
            pid: None,
            child: None,
            slot: ExitSlot::default(),
            subscribers: Vec::new(),
            kill_timer: None,
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn outcome(&self) -> Option<ProcessOutcome> {
        self.slot.get()
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.slot.get().map(|o| o.code())
    }

    pub fn exit_slot(&self) -> ExitSlot {
        self.slot.clone()
    }

    pub fn kill_timer_armed(&self) -> bool {
        self.kill_timer.as_ref().is_some_and(KillTimer::is_armed)
    }

    /// Register for the completion of this process.
    ///
    /// Subscribing after completion yields the outcome immediately.
    pub fn subscribe(&mut self) -> oneshot::Receiver<ProcessOutcome> {
        let (tx, rx) = oneshot::channel();
        match self.slot.get() {
            Some(outcome) => {
                let _ = tx.send(outcome);
            }
            None => self.subscribers.push(tx),
        }
        rx
    }

    /// Start the process in the given mode.
    pub async fn run(mut self, mode: RunMode, registry: &mut ProcessRegistry) -> Launch {
        match mode {
            RunMode::Wait => Launch::Finished(self.run_wait().await),
            RunMode::Async => self.run_async(registry),
        }
    }

    /// Spawn and await exit. Interrupted waits are retried.
    pub async fn run_wait(&mut self) -> ProcessOutcome {
        if let Err(reason) = self.spawn() {
            return self.finish(ProcessOutcome::SpawnFailed(reason));
        }

        let pid = self.pid.unwrap_or_default();
        let outcome = match self.child.as_mut() {
            Some(child) => wait_child(child, pid).await,
            None => ProcessOutcome::SpawnFailed("child handle missing".to_string()),
        };
        self.finish(outcome)
    }

    /// Spawn, hand the child to a waiter task and park this handle in
    /// `registry`. Returns immediately.
    pub fn run_async(mut self, registry: &mut ProcessRegistry) -> Launch {
        if let Err(reason) = self.spawn() {
            return Launch::Finished(self.finish(ProcessOutcome::SpawnFailed(reason)));
        }

        let (Some(pid), Some(child)) = (self.pid, self.child.take()) else {
            return Launch::Finished(
                self.finish(ProcessOutcome::SpawnFailed("child handle missing".to_string())),
            );
        };

        tokio::spawn(waiter(child, pid, self.slot.clone(), registry.waker()));
        registry.add(self);
        Launch::Registered(pid)
    }

    /// Non-blocking exit check. Returns the outcome once the process is gone.
    pub fn try_reap(&mut self) -> Option<ProcessOutcome> {
        if let Some(outcome) = self.slot.get() {
            self.kill_timer = None;
            return Some(outcome);
        }

        let child = self.child.as_mut()?;
        match child.try_wait() {
            Ok(Some(status)) => {
                let outcome = outcome_from_status(status);
                self.slot.set(outcome.clone());
                self.kill_timer = None;
                Some(outcome)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(pid = ?self.pid, error = %e, "try_wait failed");
                None
            }
        }
    }

    /// Opportunistic reap, then OS liveness probe.
    pub fn running(&mut self) -> bool {
        if self.try_reap().is_some() {
            return false;
        }
        match self.pid {
            Some(pid) => signal::is_alive(pid),
            None => false,
        }
    }

    /// Terminate the process.
    ///
    /// - `tolerance == 0`: SIGKILL now.
    /// - otherwise SIGTERM, and unless the process is already gone, a
    ///   [`KillTimer`] that sends SIGKILL after `tolerance` seconds.
    pub fn kill(&mut self, tolerance: u64) {
        let Some(pid) = self.pid else {
            return;
        };
        if self.try_reap().is_some() {
            debug!(pid, "kill requested for process that already exited");
            return;
        }

        if tolerance == 0 {
            info!(pid, cmd = %self.command, "killing process");
            if let Err(e) = signal::force_kill(pid) {
                warn!(pid, error = %e, "failed to send SIGKILL");
            }
            return;
        }

        info!(pid, tolerance, cmd = %self.command, "terminating process");
        if let Err(e) = signal::terminate(pid) {
            warn!(pid, error = %e, "failed to send SIGTERM");
        }
        if !self.running() {
            return;
        }
        self.kill_timer = Some(KillTimer::arm(pid, tolerance));
    }

    pub(crate) fn take_kill_timer(&mut self) -> Option<KillTimer> {
        self.kill_timer.take()
    }

    /// Deliver the outcome to every subscriber.
    pub(crate) fn notify(&mut self) {
        let Some(outcome) = self.slot.get() else {
            return;
        };
        for tx in self.subscribers.drain(..) {
            let _ = tx.send(outcome.clone());
        }
    }

    fn finish(&mut self, outcome: ProcessOutcome) -> ProcessOutcome {
        self.slot.set(outcome.clone());
        self.kill_timer = None;
        self.notify();
        outcome
    }

    fn spawn(&mut self) -> Result<(), String> {
        let argv = tokenize(&self.command);
        if argv.is_empty() {
            warn!(cmd = %self.command, "command is empty after tokenization");
            return Err("empty command".to_string());
        }

        let mut child = match self.spawner.spawn(&argv) {
            Ok(child) => child,
            Err(e) => {
                error!(cmd = %self.command, error = %e, "failed to spawn process");
                return Err(e.to_string());
            }
        };

        let Some(pid) = child.id() else {
            return Err("process exited before its pid was known".to_string());
        };
        info!(pid, cmd = %self.command, "started process");

        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(log_lines(stdout, pid, "stdout"));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(log_lines(stderr, pid, "stderr"));
        }

        self.pid = Some(pid);
        self.child = Some(child);
        Ok(())
    }
}

/// Blocks (asynchronously) on real process exit, then records the outcome
/// and wakes the registry.
async fn waiter(mut child: Child, pid: u32, slot: ExitSlot, wake: mpsc::UnboundedSender<u32>) {
    let outcome = wait_child(&mut child, pid).await;
    slot.set(outcome);
    let _ = wake.send(pid);
}

async fn wait_child(child: &mut Child, pid: u32) -> ProcessOutcome {
    loop {
        match child.wait().await {
            Ok(status) => {
                let outcome = outcome_from_status(status);
                info!(pid, %outcome, "process exited");
                return outcome;
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                error!(pid, error = %e, "waiting for process failed");
                return ProcessOutcome::Exited(-1);
            }
        }
    }
}

fn outcome_from_status(status: ExitStatus) -> ProcessOutcome {
    if let Some(code) = status.code() {
        return ProcessOutcome::Exited(code);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(sig) = status.signal() {
            return ProcessOutcome::Signalled(sig);
        }
    }
    ProcessOutcome::Exited(-1)
}

/// Always consume output so pipe buffers don't fill; log at debug.
async fn log_lines<R>(stream: R, pid: u32, name: &'static str)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(stream).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        debug!(pid, "{name}: {line}");
    }
}
