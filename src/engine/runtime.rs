// src/engine/runtime.rs

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cache::CacheEntry;
use crate::errors::Result;

use super::{Context, EntryId, RuntimeEvent};

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// What woke the loop up.
enum Wake {
    Event(Option<RuntimeEvent>),
    ProcessExited,
}

/// Drives cache entries in response to `RuntimeEvent`s and process exits.
///
/// This is the async IO shell around [`Context`] and the entries: it reads
/// events from its channel, waits on the registry for process exits, and
/// routes conversion results and file changes to the owning entry.
#[derive(Debug)]
pub struct Runtime {
    ctx: Context,
    entries: HashMap<EntryId, CacheEntry>,
    next_id: u64,
    event_tx: mpsc::Sender<RuntimeEvent>,
    event_rx: mpsc::Receiver<RuntimeEvent>,
}

impl Runtime {
    pub fn new(ctx: Context) -> Self {
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            ctx,
            entries: HashMap::new(),
            next_id: 0,
            event_tx,
            event_rx,
        }
    }

    /// Sender for injecting events (e.g. shutdown) from outside the loop.
    pub fn sender(&self) -> mpsc::Sender<RuntimeEvent> {
        self.event_tx.clone()
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut Context {
        &mut self.ctx
    }

    pub fn add_entry(&mut self, source: impl Into<PathBuf>) -> EntryId {
        let id = EntryId(self.next_id);
        self.next_id += 1;
        let entry = CacheEntry::new(id, source, self.event_tx.clone());
        debug!(entry = %id, source = %entry.filename().display(), "entry added");
        self.entries.insert(id, entry);
        id
    }

    pub fn remove_entry(&mut self, id: EntryId) -> Option<CacheEntry> {
        self.entries.remove(&id)
    }

    pub fn entry(&self, id: EntryId) -> Option<&CacheEntry> {
        self.entries.get(&id)
    }

    pub fn entry_mut(&mut self, id: EntryId) -> Option<&mut CacheEntry> {
        self.entries.get_mut(&id)
    }

    pub fn entry_ids(&self) -> Vec<EntryId> {
        let mut ids: Vec<_> = self.entries.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn start_loading(&mut self, id: EntryId) {
        match self.entries.get_mut(&id) {
            Some(entry) => entry.start_loading(&mut self.ctx),
            None => warn!(entry = %id, "load requested for unknown entry"),
        }
    }

    pub fn try_display_format(&mut self, id: EntryId) -> bool {
        match self.entries.get_mut(&id) {
            Some(entry) => entry.try_display_format(&mut self.ctx),
            None => false,
        }
    }

    /// Start the file monitor of an entry with the configured debounce.
    pub fn start_monitoring(&mut self, id: EntryId) -> Result<()> {
        let debounce = Duration::from_millis(self.ctx.settings.monitor_debounce_ms);
        match self.entries.get_mut(&id) {
            Some(entry) => Ok(entry.start_monitoring(debounce)?),
            None => Ok(()),
        }
    }

    /// Apply one event. Returns `false` when the loop should stop.
    pub fn handle_event(&mut self, event: RuntimeEvent) -> bool {
        debug!(?event, "runtime received event");
        match event {
            RuntimeEvent::LoadRequested { entry } => self.start_loading(entry),
            RuntimeEvent::SourceChanged { entry } => {
                info!(%entry, "source changed; reloading");
                self.start_loading(entry);
            }
            RuntimeEvent::ConversionFinished {
                entry,
                generation,
                outcome,
                output,
            } => match self.entries.get_mut(&entry) {
                Some(e) => e.finish_conversion(generation, &outcome, &output, &mut self.ctx),
                None => {
                    debug!(%entry, "conversion finished for removed entry");
                    let _ = std::fs::remove_file(&output);
                }
            },
            RuntimeEvent::ShutdownRequested => {
                info!("shutdown requested");
                return false;
            }
        }
        true
    }

    /// Wait for one event or process exit and handle it. Returns `false`
    /// when the loop should stop.
    pub async fn turn(&mut self) -> bool {
        let wake = tokio::select! {
            ev = self.event_rx.recv() => Wake::Event(ev),
            _ = self.ctx.wait_for_exit() => Wake::ProcessExited,
        };

        match wake {
            Wake::Event(Some(event)) => {
                let keep_running = self.handle_event(event);
                // Events may have started work; collect anything already done.
                self.ctx.reap();
                keep_running
            }
            // We hold a sender ourselves, so this only happens on teardown.
            Wake::Event(None) => false,
            Wake::ProcessExited => true,
        }
    }

    /// Run until every entry in `ids` has a terminal status.
    pub async fn run_until_settled(&mut self, ids: &[EntryId]) {
        while !self.settled(ids) {
            if !self.turn().await {
                break;
            }
        }
    }

    /// Main event loop. Runs until shutdown is requested.
    pub async fn run(mut self) -> Result<()> {
        info!("convcache runtime started");
        while self.turn().await {}
        self.shutdown();
        info!("runtime exiting");
        Ok(())
    }

    /// Kill whatever the job queue is running, stop all monitors and delete
    /// the converted files this run produced.
    pub fn shutdown(&mut self) {
        if self.ctx.kill_running_job() {
            info!("killed running conversion job");
        }
        for entry in self.entries.values_mut() {
            entry.stop_monitoring();
        }
        let converted = self.ctx.converted.len();
        self.ctx.converted.clear();
        debug!(converted, "cleared converted files");
    }

    fn settled(&self, ids: &[EntryId]) -> bool {
        ids.iter().all(|id| {
            self.entries
                .get(id)
                .is_none_or(|e| e.status().is_terminal())
        })
    }
}
