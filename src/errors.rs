// src/errors.rs

//! Crate-wide error aliases and helpers.
//!
//! [`ConvcacheError`] covers the fallible setup paths (config loading, CLI,
//! runtime plumbing). [`ConversionError`] is the taxonomy of per-entry
//! failures; those are never propagated as `Err` out of the event loop, they
//! are recorded on the entry and surfaced through its status.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConvcacheError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Unknown format: {0}")]
    UnknownFormat(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Why a conversion or load did not produce a displayable artifact.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConversionError {
    #[error("could not spawn process: {0}")]
    SpawnFailure(String),

    #[error("converter exited with status {0}")]
    NonZeroExit(i32),

    #[error("converter did not respond to termination and was killed (signal {0})")]
    TimeoutUnresponsive(i32),

    #[error("source file is missing or unreadable: {0}")]
    MissingOrUnreadableSource(String),

    #[error("failed to decompress source: {0}")]
    DecompressFailed(String),

    #[error("cannot determine format of {0}")]
    UnknownFormat(String),

    #[error("no conversion path from '{from}' to '{to}'")]
    PathNotFound { from: String, to: String },

    #[error("failed to load converted file: {0}")]
    LoadFailed(String),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, ConvcacheError>;
