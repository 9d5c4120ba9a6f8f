// src/cache/entry.rs

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context as _, Result};
use flate2::read::GzDecoder;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::convert::{is_gzipped, Converter};
use crate::engine::{Context, EntryId, RuntimeEvent};
use crate::errors::ConversionError;
use crate::types::{CacheStatus, ProcessOutcome};

use super::hash::compute_file_hash;
use super::loaded::LoadedImage;
use super::monitor::FileMonitor;

const STATUS_CHANNEL_CAPACITY: usize = 32;

/// Broadcast on every status transition of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub entry: EntryId,
    pub status: CacheStatus,
}

/// Resolved inputs of one load attempt.
struct Plan {
    /// File to read: the source, or its decompressed copy.
    working: PathBuf,
    from: String,
    target: String,
}

/// Load/convert state of one source file.
///
/// ```text
/// WaitingToLoad --start_loading--> Loaded | ErrorLoading     (direct load)
///                              \-> Converting -> Loaded | ErrorLoading | ErrorConverting
///                              \-> ErrorNoFile | ErrorConverting
/// any --start_loading / reset--> WaitingToLoad
/// ```
///
/// A conversion result is matched to the load attempt that started it through
/// a generation counter. Results for an older generation are dropped and
/// their output deleted.
#[derive(Debug)]
pub struct CacheEntry {
    id: EntryId,
    source: PathBuf,
    zipped: bool,
    /// Decompressed copy of a gzip source; owned by the entry.
    unzipped: Option<PathBuf>,
    source_format: Option<String>,
    target_format: Option<String>,
    status: CacheStatus,
    image: Option<LoadedImage>,
    converter: Option<Converter>,
    /// Source checksum taken when the in-flight conversion started.
    converting_hash: Option<String>,
    generation: u64,
    events: mpsc::Sender<RuntimeEvent>,
    status_tx: broadcast::Sender<StatusChange>,
    monitor: Option<FileMonitor>,
    last_error: Option<ConversionError>,
}

impl CacheEntry {
    pub fn new(id: EntryId, source: impl Into<PathBuf>, events: mpsc::Sender<RuntimeEvent>) -> Self {
        let (status_tx, _) = broadcast::channel(STATUS_CHANNEL_CAPACITY);
        Self {
            id,
            source: source.into(),
            zipped: false,
            unzipped: None,
            source_format: None,
            target_format: None,
            status: CacheStatus::WaitingToLoad,
            image: None,
            converter: None,
            converting_hash: None,
            generation: 0,
            events,
            status_tx,
            monitor: None,
            last_error: None,
        }
    }

    pub fn id(&self) -> EntryId {
        self.id
    }

    pub fn filename(&self) -> &Path {
        &self.source
    }

    pub fn status(&self) -> CacheStatus {
        self.status
    }

    pub fn image(&self) -> Option<&LoadedImage> {
        self.image.as_ref()
    }

    pub fn last_error(&self) -> Option<&ConversionError> {
        self.last_error.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_zipped(&self) -> bool {
        self.zipped
    }

    pub fn source_format(&self) -> Option<&str> {
        self.source_format.as_deref()
    }

    pub fn target_format(&self) -> Option<&str> {
        self.target_format.as_deref()
    }

    pub fn is_monitoring(&self) -> bool {
        self.monitor.is_some()
    }

    /// Subscribe to status transitions.
    pub fn connect(&self) -> broadcast::Receiver<StatusChange> {
        self.status_tx.subscribe()
    }

    /// blake3 hex digest of the source file.
    pub fn checksum(&self) -> Result<String> {
        compute_file_hash(&self.source)
    }

    /// (Re)load the source, converting it first if it is not loadable.
    pub fn start_loading(&mut self, ctx: &mut Context) {
        if self.status != CacheStatus::WaitingToLoad {
            self.reset();
        }
        info!(entry = %self.id, generation = self.generation, source = %self.source.display(), "loading");

        let plan = match self.plan(ctx) {
            Ok(plan) => plan,
            Err((status, error)) => {
                self.fail(status, error);
                return;
            }
        };

        if plan.from == plan.target {
            self.load(&plan.working, &plan.target, ctx);
            return;
        }
        if let Some(converted) = ctx.converted.lookup(&self.source, &plan.target) {
            self.load(&converted, &plan.target, ctx);
            return;
        }

        self.start_conversion(plan, ctx);
    }

    /// Load without starting any job: only when the source is already
    /// loadable or a fresh converted file exists. Returns whether the entry
    /// is now `Loaded`.
    pub fn try_display_format(&mut self, ctx: &mut Context) -> bool {
        match self.status {
            CacheStatus::Loaded => return true,
            CacheStatus::Converting => return false,
            _ => {}
        }

        let Ok(plan) = self.plan(ctx) else {
            return false;
        };

        let direct = if plan.from == plan.target {
            Some(plan.working)
        } else {
            ctx.converted.lookup(&self.source, &plan.target)
        };
        let Some(path) = direct else {
            debug!(entry = %self.id, from = %plan.from, to = %plan.target, "display needs a conversion");
            return false;
        };

        self.generation += 1;
        self.load(&path, &plan.target, ctx);
        self.status == CacheStatus::Loaded
    }

    /// Drop everything derived from the source and return to `WaitingToLoad`.
    ///
    /// An in-flight conversion is not cancelled; its result will be
    /// discarded because the generation moves on.
    pub fn reset(&mut self) {
        self.generation += 1;
        if self.converter.take().is_some() {
            debug!(entry = %self.id, "detached in-flight conversion");
        }
        self.converting_hash = None;
        self.image = None;
        self.last_error = None;
        self.source_format = None;
        self.target_format = None;
        self.zipped = false;
        self.remove_unzipped();
        self.transition(CacheStatus::WaitingToLoad);
    }

    /// Handle the result of a conversion started by this entry.
    pub fn finish_conversion(
        &mut self,
        generation: u64,
        outcome: &ProcessOutcome,
        output: &Path,
        ctx: &mut Context,
    ) {
        if generation != self.generation || self.converter.is_none() {
            debug!(
                entry = %self.id,
                generation,
                current = self.generation,
                "discarding stale conversion result"
            );
            remove_quietly(output);
            return;
        }
        let Some(mut converter) = self.converter.take() else {
            return;
        };
        let source_hash = self.converting_hash.take();

        if !converter.finish(outcome) {
            let error = converter
                .error()
                .cloned()
                .unwrap_or(ConversionError::NonZeroExit(outcome.code()));
            remove_quietly(output);
            self.fail(CacheStatus::ErrorConverting, error);
            return;
        }

        // Keyed by the checksum taken at start, not the current one.
        let target = converter.to_format().to_string();
        match source_hash {
            Some(hash) => ctx.converted.insert(&self.source, &target, output, hash),
            None => warn!(entry = %self.id, "no source checksum; converted file not cached"),
        }
        self.load(output, &target, ctx);
    }

    /// Watch the source and post `SourceChanged` when it changes.
    pub fn start_monitoring(&mut self, debounce: Duration) -> Result<()> {
        self.monitor = None;
        let monitor = FileMonitor::spawn(&self.source, self.id, debounce, self.events.clone())?;
        self.monitor = Some(monitor);
        Ok(())
    }

    pub fn stop_monitoring(&mut self) {
        self.monitor = None;
    }

    fn plan(&mut self, ctx: &Context) -> Result<Plan, (CacheStatus, ConversionError)> {
        let readable = fs::metadata(&self.source).and_then(|meta| {
            if meta.is_file() {
                File::open(&self.source).map(drop)
            } else {
                Err(io::Error::new(io::ErrorKind::InvalidInput, "not a regular file"))
            }
        });
        if let Err(e) = readable {
            return Err((
                CacheStatus::ErrorNoFile,
                ConversionError::MissingOrUnreadableSource(format!(
                    "{}: {e}",
                    self.source.display()
                )),
            ));
        }

        self.zipped = is_gzipped(&self.source);
        let working = if self.zipped {
            self.remove_unzipped();
            let path = self.decompress(&ctx.settings.temp_dir).map_err(|e| {
                (
                    CacheStatus::ErrorConverting,
                    ConversionError::DecompressFailed(format!("{e:#}")),
                )
            })?;
            self.unzipped = Some(path.clone());
            path
        } else {
            self.source.clone()
        };

        let Some(from) = ctx.formats.sniff(&working).map(|f| f.name.clone()) else {
            return Err((
                CacheStatus::ErrorConverting,
                ConversionError::UnknownFormat(self.source.display().to_string()),
            ));
        };

        let target = if ctx.formats.is_loadable(&from) {
            from.clone()
        } else {
            match ctx.graph.nearest_loadable(&from, &ctx.formats) {
                Some(fmt) => fmt.name.clone(),
                None => ctx.settings.fallback_format.clone(),
            }
        };

        debug!(entry = %self.id, from = %from, to = %target, zipped = self.zipped, "resolved formats");
        self.source_format = Some(from.clone());
        self.target_format = Some(target.clone());
        Ok(Plan {
            working,
            from,
            target,
        })
    }

    fn start_conversion(&mut self, plan: Plan, ctx: &mut Context) {
        let ext = ctx
            .formats
            .extension(&plan.target)
            .unwrap_or(&plan.target)
            .to_string();
        let dest = ctx
            .settings
            .temp_dir
            .join(format!("convcache_{}.{ext}", Uuid::new_v4().simple()));

        let source_hash = match compute_file_hash(&self.source) {
            Ok(hash) => Some(hash),
            Err(e) => {
                warn!(entry = %self.id, error = %e, "could not checksum source");
                None
            }
        };
        let mut converter = Converter::new(&plan.working, &plan.from, &plan.target, &dest);

        let rx = match converter.start_conversion(ctx) {
            Ok(rx) => rx,
            Err(e) => {
                self.fail(CacheStatus::ErrorConverting, e);
                return;
            }
        };

        self.converter = Some(converter);
        self.converting_hash = source_hash;
        self.transition(CacheStatus::Converting);

        let entry = self.id;
        let generation = self.generation;
        let events = self.events.clone();
        tokio::spawn(async move {
            let outcome = rx
                .await
                .unwrap_or_else(|_| ProcessOutcome::SpawnFailed("job dropped".to_string()));
            let _ = events
                .send(RuntimeEvent::ConversionFinished {
                    entry,
                    generation,
                    outcome,
                    output: dest,
                })
                .await;
        });
    }

    fn load(&mut self, path: &Path, format: &str, ctx: &Context) {
        let Some(fmt) = ctx.formats.get(format) else {
            self.fail(
                CacheStatus::ErrorLoading,
                ConversionError::UnknownFormat(format.to_string()),
            );
            return;
        };
        match LoadedImage::load(path, fmt) {
            Ok(image) => {
                info!(
                    entry = %self.id,
                    path = %path.display(),
                    width = image.width,
                    height = image.height,
                    "loaded"
                );
                self.image = Some(image);
                self.last_error = None;
                self.transition(CacheStatus::Loaded);
            }
            Err(e) => self.fail(CacheStatus::ErrorLoading, e),
        }
    }

    fn fail(&mut self, status: CacheStatus, error: ConversionError) {
        warn!(entry = %self.id, ?status, error = %error, "load failed");
        self.last_error = Some(error);
        self.transition(status);
    }

    fn transition(&mut self, status: CacheStatus) {
        debug!(entry = %self.id, from = ?self.status, to = ?status, "status change");
        self.status = status;
        // No receivers is fine.
        let _ = self.status_tx.send(StatusChange {
            entry: self.id,
            status,
        });
    }

    fn decompress(&self, temp_dir: &Path) -> Result<PathBuf> {
        let inner_name = self
            .source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let path = temp_dir.join(format!("convcache_{}_{inner_name}", Uuid::new_v4().simple()));

        let input = File::open(&self.source)
            .with_context(|| format!("opening {:?}", self.source))?;
        let mut decoder = GzDecoder::new(input);
        let mut output =
            File::create(&path).with_context(|| format!("creating {:?}", path))?;
        if let Err(e) = io::copy(&mut decoder, &mut output) {
            remove_quietly(&path);
            return Err(e).with_context(|| format!("decompressing {:?}", self.source));
        }

        debug!(entry = %self.id, path = %path.display(), "decompressed source");
        Ok(path)
    }

    fn remove_unzipped(&mut self) {
        if let Some(path) = self.unzipped.take() {
            remove_quietly(&path);
        }
    }
}

impl Drop for CacheEntry {
    fn drop(&mut self) {
        self.remove_unzipped();
    }
}

fn remove_quietly(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "removed temp file"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "failed to remove temp file"),
    }
}
