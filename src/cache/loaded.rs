// src/cache/loaded.rs

use std::fs;
use std::path::{Path, PathBuf};

use image::ImageFormat;

use crate::convert::Format;
use crate::errors::ConversionError;

/// A decoded, displayable file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedImage {
    pub path: PathBuf,
    pub format: String,
    pub width: u32,
    pub height: u32,
    /// Raw file contents as loaded from disk.
    pub bytes: Vec<u8>,
}

impl LoadedImage {
    /// Read and decode `path` as `format`.
    pub fn load(path: &Path, format: &Format) -> Result<Self, ConversionError> {
        let bytes = fs::read(path)
            .map_err(|e| ConversionError::LoadFailed(format!("{}: {e}", path.display())))?;

        let image_format = ImageFormat::from_extension(&format.extension)
            .or_else(|| ImageFormat::from_extension(&format.name))
            .or_else(|| image::guess_format(&bytes).ok())
            .ok_or_else(|| {
                ConversionError::LoadFailed(format!(
                    "no decoder for format '{}' ({})",
                    format.name,
                    path.display()
                ))
            })?;

        let decoded = image::load_from_memory_with_format(&bytes, image_format)
            .map_err(|e| ConversionError::LoadFailed(format!("{}: {e}", path.display())))?;

        Ok(Self {
            path: path.to_path_buf(),
            format: format.name.clone(),
            width: decoded.width(),
            height: decoded.height(),
            bytes,
        })
    }
}
