// src/config/model.rs

use std::path::PathBuf;

use serde::Deserialize;

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [config]
/// temp_dir = "/tmp/convcache"
/// kill_tolerance_secs = 5
/// monitor_debounce_ms = 2000
/// fallback_format = "ppm"
///
/// [[format]]
/// name = "eps"
/// extension = "eps"
///
/// [[format]]
/// name = "png"
/// extension = "png"
/// loadable = true
///
/// [[converter]]
/// from = "eps"
/// to = "png"
/// cmd = "gs -q -dSAFER -dBATCH -dNOPAUSE -sDEVICE=png16m -sOutputFile=$$o $$i"
/// ```
///
/// All sections are optional. An absent `[[format]]` list means the built-in
/// formats, an absent `[[converter]]` list the built-in converters.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub format: Option<Vec<FormatConfig>>,

    #[serde(default)]
    pub converter: Option<Vec<ConverterConfig>>,
}

/// Validated configuration. Construct via `ConfigFile::try_from(raw)`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    /// Known formats, in preference order for "nearest loadable" ties.
    pub format: Vec<FormatConfig>,
    pub converter: Vec<ConverterConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        format: Vec<FormatConfig>,
        converter: Vec<ConverterConfig>,
    ) -> Self {
        Self {
            config,
            format,
            converter,
        }
    }

    /// Built-in formats and converters with default settings.
    pub fn builtin() -> Self {
        Self::new_unchecked(
            ConfigSection::default(),
            default_formats(),
            default_converters(),
        )
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Directory for intermediate files, scripts and converted artifacts.
    ///
    /// Defaults to the system temp dir.
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,

    /// Grace period between SIGTERM and SIGKILL when a process is killed.
    #[serde(default = "default_kill_tolerance_secs")]
    pub kill_tolerance_secs: u64,

    /// Quiet period before a burst of file-change events triggers a reload.
    #[serde(default = "default_monitor_debounce_ms")]
    pub monitor_debounce_ms: u64,

    /// Raster format used when nothing loadable is reachable.
    #[serde(default = "default_fallback_format")]
    pub fallback_format: String,
}

fn default_temp_dir() -> PathBuf {
    std::env::temp_dir()
}

fn default_kill_tolerance_secs() -> u64 {
    5
}

fn default_monitor_debounce_ms() -> u64 {
    2000
}

fn default_fallback_format() -> String {
    "ppm".to_string()
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            temp_dir: default_temp_dir(),
            kill_tolerance_secs: default_kill_tolerance_secs(),
            monitor_debounce_ms: default_monitor_debounce_ms(),
            fallback_format: default_fallback_format(),
        }
    }
}

/// `[[format]]` entry.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct FormatConfig {
    pub name: String,
    pub extension: String,
    /// Whether the display layer can load this format without conversion.
    #[serde(default)]
    pub loadable: bool,
}

impl FormatConfig {
    pub fn new(name: &str, extension: &str, loadable: bool) -> Self {
        Self {
            name: name.to_string(),
            extension: extension.to_string(),
            loadable,
        }
    }
}

/// `[[converter]]` entry: one edge of the conversion graph.
///
/// `cmd` may use `$$i` (input file), `$$b` (input file without extension)
/// and `$$o` (output file).
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ConverterConfig {
    pub from: String,
    pub to: String,
    pub cmd: String,
}

impl ConverterConfig {
    pub fn new(from: &str, to: &str, cmd: &str) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            cmd: cmd.to_string(),
        }
    }
}

pub fn default_formats() -> Vec<FormatConfig> {
    vec![
        FormatConfig::new("png", "png", true),
        FormatConfig::new("ppm", "ppm", true),
        FormatConfig::new("pgm", "pgm", true),
        FormatConfig::new("jpg", "jpg", true),
        FormatConfig::new("gif", "gif", true),
        FormatConfig::new("bmp", "bmp", true),
        FormatConfig::new("tiff", "tif", true),
        FormatConfig::new("eps", "eps", false),
        FormatConfig::new("ps", "ps", false),
        FormatConfig::new("pdf", "pdf", false),
        FormatConfig::new("svg", "svg", false),
    ]
}

pub fn default_converters() -> Vec<ConverterConfig> {
    const GS: &str = "gs -q -dSAFER -dBATCH -dNOPAUSE -r150";
    vec![
        ConverterConfig::new("eps", "pdf", "epstopdf --outfile=$$o $$i"),
        ConverterConfig::new("ps", "pdf", "ps2pdf $$i $$o"),
        ConverterConfig::new("eps", "png", &format!("{GS} -dEPSCrop -sDEVICE=png16m -sOutputFile=$$o $$i")),
        ConverterConfig::new("pdf", "png", &format!("{GS} -sDEVICE=png16m -sOutputFile=$$o $$i")),
        ConverterConfig::new("pdf", "ppm", &format!("{GS} -sDEVICE=ppmraw -sOutputFile=$$o $$i")),
        ConverterConfig::new("svg", "png", "rsvg-convert -o $$o $$i"),
        ConverterConfig::new("svg", "pdf", "rsvg-convert -f pdf -o $$o $$i"),
    ]
}
