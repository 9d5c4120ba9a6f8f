// src/engine/queue.rs

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::exec::{ExitSlot, Launch, ProcessHandle, ProcessRegistry, ProcessSpawner};
use crate::types::ProcessOutcome;

/// A command waiting for its turn.
#[derive(Debug)]
struct Job {
    id: u64,
    command: String,
    reply: oneshot::Sender<ProcessOutcome>,
}

/// The job whose process currently runs.
#[derive(Debug)]
struct RunningJob {
    job: Job,
    pid: u32,
    slot: ExitSlot,
}

/// FIFO of external commands with a concurrency bound of one.
///
/// Semantics:
/// - `add` appends a job; if nothing is running the head is started at once.
/// - After every reap the owner calls [`JobQueue::poll`]. When the running
///   job's process has exited (its exit slot is filled) the caller gets the
///   outcome and the next job starts.
/// - A job whose process cannot be spawned is answered with `SpawnFailed`
///   right away and the queue moves on, so the chain never stalls.
///
/// The running job is tracked through its exit slot rather than through the
/// registry entry, so a job killed via `ProcessRegistry::kill` still advances
/// the queue once the process is actually gone.
#[derive(Debug)]
pub struct JobQueue {
    pending: VecDeque<Job>,
    running: Option<RunningJob>,
    next_id: u64,
    spawner: Arc<dyn ProcessSpawner>,
}

impl JobQueue {
    pub fn new(spawner: Arc<dyn ProcessSpawner>) -> Self {
        Self {
            pending: VecDeque::new(),
            running: None,
            next_id: 0,
            spawner,
        }
    }

    /// Enqueue `command`. The receiver yields the job's outcome.
    pub fn add(
        &mut self,
        command: impl Into<String>,
        registry: &mut ProcessRegistry,
    ) -> oneshot::Receiver<ProcessOutcome> {
        let (reply, rx) = oneshot::channel();
        let job = Job {
            id: self.next_id,
            command: command.into(),
            reply,
        };
        self.next_id += 1;

        debug!(job = job.id, cmd = %job.command, queued = self.pending.len(), "job added");
        self.pending.push_back(job);

        if self.running.is_none() {
            self.start_next(registry);
        }
        rx
    }

    /// Advance the queue if the running job has finished.
    ///
    /// Returns the number of jobs completed by this call (0 or 1, plus any
    /// jobs that failed to spawn while starting the successor).
    pub fn poll(&mut self, registry: &mut ProcessRegistry) -> usize {
        let Some(outcome) = self.running.as_ref().and_then(|r| r.slot.get()) else {
            return 0;
        };
        let Some(finished) = self.running.take() else {
            return 0;
        };

        info!(job = finished.job.id, pid = finished.pid, %outcome, "job finished");
        if finished.job.reply.send(outcome).is_err() {
            debug!(job = finished.job.id, "job caller went away before completion");
        }

        1 + self.start_next(registry)
    }

    pub fn is_idle(&self) -> bool {
        self.running.is_none() && self.pending.is_empty()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn running_pid(&self) -> Option<u32> {
        self.running.as_ref().map(|r| r.pid)
    }

    /// Jobs with a live process: never more than one.
    pub fn running_count(&self) -> usize {
        usize::from(self.running.is_some())
    }

    /// Start jobs from the head until one is running or the queue is empty.
    /// Returns how many jobs completed synchronously (spawn failures).
    fn start_next(&mut self, registry: &mut ProcessRegistry) -> usize {
        let mut failed = 0;

        while let Some(job) = self.pending.pop_front() {
            let handle = ProcessHandle::new(job.command.clone(), Arc::clone(&self.spawner));
            let slot = handle.exit_slot();

            match handle.run_async(registry) {
                Launch::Registered(pid) => {
                    debug!(job = job.id, pid, "job started");
                    self.running = Some(RunningJob { job, pid, slot });
                    return failed;
                }
                Launch::Finished(outcome) => {
                    warn!(job = job.id, cmd = %job.command, %outcome, "job could not be started");
                    let _ = job.reply.send(outcome);
                    failed += 1;
                }
            }
        }

        debug!("job queue idle");
        failed
    }
}
