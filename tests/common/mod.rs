#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

pub use convcache_test_utils::{init_tracing, with_timeout};

/// A 1x1 black image in plain PPM.
pub const PPM_1X1: &str = "P3\n1 1\n255\n0 0 0\n";

/// Converter command that writes [`PPM_1X1`] to the output.
pub const WRITE_PPM: &str = "printf 'P3\\n1 1\\n255\\n0 0 0\\n' > $$o";

/// Minimal EPS header; enough for content sniffing.
pub const EPS_HEADER: &str = "%!PS-Adobe-3.0 EPSF-3.0\n%%BoundingBox: 0 0 1 1\n";

pub fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("failed to write test file");
    path
}

/// File names in `dir`, sorted.
pub fn list_dir(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .expect("failed to read dir")
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
