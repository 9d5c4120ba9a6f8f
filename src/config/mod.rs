// src/config/mod.rs

//! Configuration loading and validation for convcache.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate formats and converters (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, load_or_builtin};
pub use model::{
    default_converters, default_formats, ConfigFile, ConfigSection, ConverterConfig,
    FormatConfig, RawConfigFile,
};
pub use validate::validate_config;
