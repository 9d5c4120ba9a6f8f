// src/engine/mod.rs

//! Orchestration engine for convcache.
//!
//! This module ties together:
//! - the shared [`Context`] (process registry, job queue, formats, graph)
//! - the FIFO [`JobQueue`] of external commands
//! - the main runtime event loop that reacts to:
//!   - process exits
//!   - conversion completions
//!   - file-monitor notifications
//!   - shutdown signals

use std::fmt;
use std::path::PathBuf;

use crate::types::ProcessOutcome;

/// Identifies a cache entry within one runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(pub u64);

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Events flowing into the runtime from monitors, forwarding tasks, etc.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// The host asked for an entry to be (re)loaded.
    LoadRequested { entry: EntryId },
    /// The monitored source of an entry changed on disk.
    SourceChanged { entry: EntryId },
    /// A conversion job started by an entry has finished.
    ConversionFinished {
        entry: EntryId,
        /// Entry generation at the time the conversion started.
        generation: u64,
        outcome: ProcessOutcome,
        /// Destination the conversion was asked to produce.
        output: PathBuf,
    },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

pub mod context;
pub mod queue;
pub mod runtime;

pub use context::Context;
pub use queue::JobQueue;
pub use runtime::Runtime;
