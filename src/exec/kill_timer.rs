// src/exec/kill_timer.rs

//! One-shot escalation timer.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, warn};

use super::signal;

const ARMED: u8 = 0;
const FIRED: u8 = 1;
const DISARMED: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KillTimerState {
    Armed,
    /// The grace period elapsed and SIGKILL was sent.
    Fired,
    /// The owner dropped the timer before it elapsed.
    Disarmed,
}

/// Sends SIGKILL to `pid` once `secs` seconds have elapsed, unless dropped
/// first. Not reusable: arm a new one instead.
#[derive(Debug)]
pub struct KillTimer {
    pid: u32,
    secs: u64,
    state: Arc<AtomicU8>,
    task: JoinHandle<()>,
}

impl KillTimer {
    /// Arm a timer on the current tokio runtime.
    pub fn arm(pid: u32, secs: u64) -> Self {
        let state = Arc::new(AtomicU8::new(ARMED));
        let task_state = Arc::clone(&state);

        let task = tokio::spawn(async move {
            sleep(Duration::from_secs(secs)).await;
            if task_state
                .compare_exchange(ARMED, FIRED, Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
            {
                return;
            }
            warn!(pid, secs, "process ignored termination request; sending SIGKILL");
            if let Err(e) = signal::force_kill(pid) {
                warn!(pid, error = %e, "failed to force-kill process");
            }
        });

        debug!(pid, secs, "kill timer armed");
        Self {
            pid,
            secs,
            state,
            task,
        }
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn grace_secs(&self) -> u64 {
        self.secs
    }

    pub fn state(&self) -> KillTimerState {
        match self.state.load(Ordering::SeqCst) {
            ARMED => KillTimerState::Armed,
            FIRED => KillTimerState::Fired,
            _ => KillTimerState::Disarmed,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.state() == KillTimerState::Armed
    }
}

impl Drop for KillTimer {
    fn drop(&mut self) {
        if self
            .state
            .compare_exchange(ARMED, DISARMED, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            self.task.abort();
            debug!(pid = self.pid, "kill timer disarmed");
        }
    }
}
