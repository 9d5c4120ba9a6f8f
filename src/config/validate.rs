// src/config/validate.rs

use std::collections::HashSet;

use petgraph::graphmap::DiGraphMap;
use petgraph::visit::Dfs;
use tracing::warn;

use crate::config::model::{
    default_converters, default_formats, ConfigFile, ConverterConfig, FormatConfig,
    RawConfigFile,
};
use crate::errors::{ConvcacheError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = ConvcacheError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let formats = raw.format.unwrap_or_else(default_formats);
        let converters = raw.converter.unwrap_or_else(default_converters);
        validate_config(&raw.config.fallback_format, &formats, &converters)?;
        Ok(ConfigFile::new_unchecked(raw.config, formats, converters))
    }
}

/// Check formats, converters and the fallback format for consistency.
pub fn validate_config(
    fallback_format: &str,
    formats: &[FormatConfig],
    converters: &[ConverterConfig],
) -> Result<()> {
    ensure_has_formats(formats)?;
    validate_formats(formats)?;
    validate_converters(formats, converters)?;
    validate_fallback(fallback_format, formats)?;
    warn_unreachable_formats(formats, converters);
    Ok(())
}

fn ensure_has_formats(formats: &[FormatConfig]) -> Result<()> {
    if formats.is_empty() {
        return Err(ConvcacheError::ConfigError(
            "config must declare at least one [[format]]".to_string(),
        ));
    }
    Ok(())
}

fn validate_formats(formats: &[FormatConfig]) -> Result<()> {
    let mut seen = HashSet::new();
    for fmt in formats {
        if fmt.name.trim().is_empty() {
            return Err(ConvcacheError::ConfigError(
                "format with empty name".to_string(),
            ));
        }
        if fmt.extension.trim().is_empty() {
            return Err(ConvcacheError::ConfigError(format!(
                "format '{}' has an empty extension",
                fmt.name
            )));
        }
        if !seen.insert(fmt.name.as_str()) {
            return Err(ConvcacheError::ConfigError(format!(
                "format '{}' is declared more than once",
                fmt.name
            )));
        }
    }
    Ok(())
}

fn validate_converters(formats: &[FormatConfig], converters: &[ConverterConfig]) -> Result<()> {
    let known: HashSet<&str> = formats.iter().map(|f| f.name.as_str()).collect();

    for conv in converters {
        for name in [&conv.from, &conv.to] {
            if !known.contains(name.as_str()) {
                return Err(ConvcacheError::ConfigError(format!(
                    "converter {} -> {} references unknown format '{}'",
                    conv.from, conv.to, name
                )));
            }
        }
        if conv.from == conv.to {
            return Err(ConvcacheError::ConfigError(format!(
                "converter {} -> {} converts a format to itself",
                conv.from, conv.to
            )));
        }
        if conv.cmd.trim().is_empty() {
            return Err(ConvcacheError::ConfigError(format!(
                "converter {} -> {} has an empty cmd",
                conv.from, conv.to
            )));
        }
    }
    Ok(())
}

fn validate_fallback(fallback: &str, formats: &[FormatConfig]) -> Result<()> {
    match formats.iter().find(|f| f.name == fallback) {
        Some(fmt) if fmt.loadable => Ok(()),
        Some(_) => Err(ConvcacheError::ConfigError(format!(
            "[config].fallback_format '{fallback}' is not loadable"
        ))),
        None => Err(ConvcacheError::ConfigError(format!(
            "[config].fallback_format '{fallback}' is not a declared format"
        ))),
    }
}

/// Formats that are neither loadable nor able to reach a loadable format can
/// never be displayed. That is legal but almost always a config mistake.
fn warn_unreachable_formats(formats: &[FormatConfig], converters: &[ConverterConfig]) {
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
    for fmt in formats {
        graph.add_node(fmt.name.as_str());
    }
    for conv in converters {
        graph.add_edge(conv.from.as_str(), conv.to.as_str(), ());
    }

    let loadable: HashSet<&str> = formats
        .iter()
        .filter(|f| f.loadable)
        .map(|f| f.name.as_str())
        .collect();

    for fmt in formats.iter().filter(|f| !f.loadable) {
        let mut dfs = Dfs::new(&graph, fmt.name.as_str());
        let mut reaches = false;
        while let Some(node) = dfs.next(&graph) {
            if loadable.contains(node) {
                reaches = true;
                break;
            }
        }
        if !reaches {
            warn!(
                format = %fmt.name,
                "format cannot be converted to any loadable format"
            );
        }
    }
}
