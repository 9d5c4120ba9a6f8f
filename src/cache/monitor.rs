// src/cache/monitor.rs

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::engine::{EntryId, RuntimeEvent};

/// Debounced watch of a single file.
///
/// The parent directory is watched (so that editors replacing the file via
/// rename are noticed) and events are filtered down to the file name. A burst
/// of events produces one `RuntimeEvent::SourceChanged` once `debounce` has
/// passed without further events. Dropping the monitor stops it.
pub struct FileMonitor {
    path: PathBuf,
    _watcher: RecommendedWatcher,
    task: JoinHandle<()>,
}

impl std::fmt::Debug for FileMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileMonitor")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl FileMonitor {
    pub fn spawn(
        path: &Path,
        entry: EntryId,
        debounce: Duration,
        runtime_tx: mpsc::Sender<RuntimeEvent>,
    ) -> Result<Self> {
        let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file_name = path
            .file_name()
            .map(|n| n.to_os_string())
            .with_context(|| format!("cannot monitor {:?}: no file name", path))?;

        // notify calls back on its own thread.
        let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    let _ = event_tx.send(event);
                }
                Err(err) => {
                    eprintln!("convcache: file watch error: {err}");
                }
            },
            Config::default(),
        )
        .context("creating file watcher")?;

        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("watching {:?}", dir))?;

        info!(%entry, path = %path.display(), ?debounce, "file monitor started");

        let relevant = move |event: &Event| {
            !matches!(event.kind, EventKind::Access(_))
                && event
                    .paths
                    .iter()
                    .any(|p| p.file_name() == Some(file_name.as_os_str()))
        };

        let task = tokio::spawn(async move {
            loop {
                // Wait for the first relevant event of a burst.
                loop {
                    match event_rx.recv().await {
                        Some(event) if relevant(&event) => break,
                        Some(_) => continue,
                        None => return,
                    }
                }

                // Quiet period: restart on every further relevant event.
                let mut deadline = Instant::now() + debounce;
                loop {
                    tokio::select! {
                        ev = event_rx.recv() => match ev {
                            Some(event) if relevant(&event) => {
                                deadline = Instant::now() + debounce;
                            }
                            Some(_) => {}
                            None => return,
                        },
                        _ = sleep_until(deadline) => break,
                    }
                }

                debug!(%entry, "monitored file changed");
                if runtime_tx
                    .send(RuntimeEvent::SourceChanged { entry })
                    .await
                    .is_err()
                {
                    warn!(%entry, "runtime gone; stopping file monitor");
                    return;
                }
            }
        });

        Ok(Self {
            path,
            _watcher: watcher,
            task,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FileMonitor {
    fn drop(&mut self) {
        self.task.abort();
    }
}
