// src/engine/context.rs

use std::sync::Arc;

use tokio::sync::oneshot;
use tracing::debug;

use crate::cache::ConvertedFileCache;
use crate::config::model::{ConfigFile, ConfigSection};
use crate::convert::{ConversionGraph, Formats};
use crate::exec::{ProcessHandle, ProcessRegistry, ProcessSpawner, RealSpawner};
use crate::types::ProcessOutcome;

use super::queue::JobQueue;

/// Everything the conversion machinery shares: settings, formats, the
/// conversion graph, converted files, and the process registry and job
/// queue with the spawner they use.
///
/// Owned by the runtime and handed out by `&mut`; all mutation happens on
/// the event-loop task.
#[derive(Debug)]
pub struct Context {
    pub settings: ConfigSection,
    pub formats: Formats,
    pub graph: ConversionGraph,
    pub converted: ConvertedFileCache,
    registry: ProcessRegistry,
    queue: JobQueue,
    spawner: Arc<dyn ProcessSpawner>,
}

impl Context {
    pub fn new(cfg: &ConfigFile) -> Self {
        Self::with_spawner(cfg, Arc::new(RealSpawner))
    }

    pub fn with_spawner(cfg: &ConfigFile, spawner: Arc<dyn ProcessSpawner>) -> Self {
        Self {
            settings: cfg.config.clone(),
            formats: Formats::from_config(&cfg.format),
            graph: ConversionGraph::from_config(&cfg.converter),
            converted: ConvertedFileCache::new(),
            registry: ProcessRegistry::new(),
            queue: JobQueue::new(Arc::clone(&spawner)),
            spawner,
        }
    }

    pub fn registry(&self) -> &ProcessRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ProcessRegistry {
        &mut self.registry
    }

    pub fn queue(&self) -> &JobQueue {
        &self.queue
    }

    pub fn spawner(&self) -> Arc<dyn ProcessSpawner> {
        Arc::clone(&self.spawner)
    }

    /// Submit a command to the job queue.
    pub fn submit(&mut self, command: impl Into<String>) -> oneshot::Receiver<ProcessOutcome> {
        self.queue.add(command, &mut self.registry)
    }

    /// Collect exited processes and advance the job queue. Non-blocking.
    pub fn reap(&mut self) -> usize {
        let reaped = self.registry.reap();
        let finished = self.queue.poll(&mut self.registry);
        if !reaped.is_empty() || finished > 0 {
            debug!(reaped = reaped.len(), finished, "reap pass");
        }
        reaped.len().max(finished)
    }

    /// Wait for the next process exit, then reap.
    pub async fn wait_for_exit(&mut self) -> usize {
        if self.registry.next_exit().await.is_none() {
            return 0;
        }
        self.reap()
    }

    /// Kill a registered process. See [`ProcessRegistry::kill`].
    pub fn kill(&mut self, pid: u32, tolerance: u64) -> bool {
        self.registry.kill(pid, tolerance)
    }

    /// Kill the job queue's running process with the configured tolerance.
    pub fn kill_running_job(&mut self) -> bool {
        let tolerance = self.settings.kill_tolerance_secs;
        match self.queue.running_pid() {
            Some(pid) => self.registry.kill(pid, tolerance),
            None => false,
        }
    }

    /// Run `command` outside the queue and await it.
    pub async fn run_wait(&self, command: impl Into<String>) -> ProcessOutcome {
        ProcessHandle::new(command, self.spawner()).run_wait().await
    }

    /// Drive the registry until the job behind `rx` has finished.
    pub async fn wait_for_job(
        &mut self,
        mut rx: oneshot::Receiver<ProcessOutcome>,
    ) -> ProcessOutcome {
        loop {
            tokio::select! {
                res = &mut rx => {
                    return res.unwrap_or_else(|_| {
                        ProcessOutcome::SpawnFailed("job dropped".to_string())
                    });
                }
                _ = self.wait_for_exit() => {}
            }
        }
    }
}
