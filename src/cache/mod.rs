// src/cache/mod.rs

//! Cached, displayable renditions of source files.
//!
//! - [`entry`]: the per-source `CacheEntry` state machine.
//! - [`converted`]: converted files keyed by source and format, validated by
//!   source checksum.
//! - [`monitor`]: debounced file watching that triggers reloads.
//! - [`loaded`]: decoding of loadable files.
//! - [`hash`]: blake3 file checksums.

pub mod converted;
pub mod entry;
pub mod hash;
pub mod loaded;
pub mod monitor;

pub use converted::ConvertedFileCache;
pub use entry::{CacheEntry, StatusChange};
pub use hash::compute_file_hash;
pub use loaded::LoadedImage;
pub use monitor::FileMonitor;
