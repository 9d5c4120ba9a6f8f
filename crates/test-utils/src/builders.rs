#![allow(dead_code)]

use std::path::Path;

use convcache::config::{
    default_converters, default_formats, ConfigFile, ConfigSection, ConverterConfig,
    FormatConfig, RawConfigFile,
};

/// Builder for `ConfigFile` to simplify test setup.
///
/// Starts with no formats and no converters (not the built-in lists), so a
/// test only sees the graph it declares.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                format: Some(Vec::new()),
                converter: Some(Vec::new()),
            },
        }
    }

    /// Start from the built-in formats and converters.
    pub fn builtin() -> Self {
        let mut builder = Self::new();
        builder.config.format = Some(default_formats());
        builder.config.converter = Some(default_converters());
        builder
    }

    pub fn with_format(mut self, name: &str, extension: &str, loadable: bool) -> Self {
        self.formats().push(FormatConfig::new(name, extension, loadable));
        self
    }

    pub fn with_converter(mut self, from: &str, to: &str, cmd: &str) -> Self {
        self.converters().push(ConverterConfig::new(from, to, cmd));
        self
    }

    pub fn temp_dir(mut self, dir: &Path) -> Self {
        self.config.config.temp_dir = dir.to_path_buf();
        self
    }

    pub fn kill_tolerance_secs(mut self, secs: u64) -> Self {
        self.config.config.kill_tolerance_secs = secs;
        self
    }

    pub fn monitor_debounce_ms(mut self, ms: u64) -> Self {
        self.config.config.monitor_debounce_ms = ms;
        self
    }

    pub fn fallback_format(mut self, name: &str) -> Self {
        self.config.config.fallback_format = name.to_string();
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }

    pub fn build_raw(self) -> RawConfigFile {
        self.config
    }

    fn formats(&mut self) -> &mut Vec<FormatConfig> {
        self.config.format.get_or_insert_with(Vec::new)
    }

    fn converters(&mut self) -> &mut Vec<ConverterConfig> {
        self.config.converter.get_or_insert_with(Vec::new)
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The raster formats most tests need: `ppm` (fallback) and `png`, both
/// loadable, plus non-loadable `eps` and `pdf`.
pub fn raster_and_vector() -> ConfigFileBuilder {
    ConfigFileBuilder::new()
        .with_format("ppm", "ppm", true)
        .with_format("png", "png", true)
        .with_format("eps", "eps", false)
        .with_format("pdf", "pdf", false)
}
