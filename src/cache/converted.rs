// src/cache/converted.rs

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::hash::compute_file_hash;

#[derive(Debug, Clone)]
struct ConvertedFile {
    path: PathBuf,
    /// Checksum of the source at the time of conversion.
    source_hash: String,
}

/// Converted artifacts keyed by (source path, target format).
///
/// An entry is fresh while the source still has the checksum it had when
/// the conversion ran and the converted file still exists. Stale entries are
/// evicted on lookup and their files deleted.
#[derive(Debug, Default)]
pub struct ConvertedFileCache {
    files: HashMap<(PathBuf, String), ConvertedFile>,
}

impl ConvertedFileCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// The fresh converted file for `source` in `format`, if any.
    pub fn lookup(&mut self, source: &Path, format: &str) -> Option<PathBuf> {
        let key = (source.to_path_buf(), format.to_string());
        let entry = self.files.get(&key)?;

        let fresh = entry.path.is_file()
            && compute_file_hash(source).is_ok_and(|h| h == entry.source_hash);
        if fresh {
            debug!(source = %source.display(), format, "converted file cache hit");
            return Some(entry.path.clone());
        }

        debug!(source = %source.display(), format, "converted file is stale");
        self.remove(source, format);
        None
    }

    /// Record `converted` as the `format` rendition of `source` as it was
    /// when its checksum was `source_hash`. Replaces (and deletes) any
    /// previous rendition.
    pub fn insert(&mut self, source: &Path, format: &str, converted: &Path, source_hash: String) {
        let key = (source.to_path_buf(), format.to_string());
        let new = ConvertedFile {
            path: converted.to_path_buf(),
            source_hash,
        };
        if let Some(old) = self.files.insert(key, new) {
            if old.path != converted {
                remove_quietly(&old.path);
            }
        }
    }

    /// Forget and delete the rendition of `source` in `format`.
    pub fn remove(&mut self, source: &Path, format: &str) {
        if let Some(old) = self.files.remove(&(source.to_path_buf(), format.to_string())) {
            remove_quietly(&old.path);
        }
    }

    /// Forget and delete every rendition.
    pub fn clear(&mut self) {
        for (_, old) in self.files.drain() {
            remove_quietly(&old.path);
        }
    }
}

fn remove_quietly(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "removed converted file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "failed to remove converted file"),
    }
}
