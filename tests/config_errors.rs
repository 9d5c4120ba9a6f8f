// tests/config_errors.rs

mod common;
use crate::common::write_file;

use convcache::config::{load_and_validate, load_from_path, ConfigFile};
use convcache::errors::ConvcacheError;
use convcache_test_utils::builders::{raster_and_vector, ConfigFileBuilder};

fn config_error(raw: convcache::config::RawConfigFile) -> String {
    match ConfigFile::try_from(raw) {
        Err(ConvcacheError::ConfigError(msg)) => msg,
        other => panic!("expected a config error, got {other:?}"),
    }
}

#[test]
fn full_file_parses_and_validates() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        dir.path(),
        "Convcache.toml",
        r#"
[config]
temp_dir = "/tmp/convcache-test"
kill_tolerance_secs = 2
monitor_debounce_ms = 250
fallback_format = "png"

[[format]]
name = "png"
extension = "png"
loadable = true

[[format]]
name = "eps"
extension = "eps"

[[converter]]
from = "eps"
to = "png"
cmd = "gs -sOutputFile=$$o $$i"
"#,
    );

    let cfg = load_and_validate(&path).unwrap();
    assert_eq!(cfg.config.kill_tolerance_secs, 2);
    assert_eq!(cfg.config.monitor_debounce_ms, 250);
    assert_eq!(cfg.config.fallback_format, "png");
    assert_eq!(cfg.format.len(), 2);
    assert!(!cfg.format[1].loadable, "loadable defaults to false");
    assert_eq!(cfg.converter[0].cmd, "gs -sOutputFile=$$o $$i");
}

#[test]
fn absent_sections_use_builtin_lists() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "Convcache.toml", "");

    let cfg = load_and_validate(&path).unwrap();
    assert_eq!(cfg.config.kill_tolerance_secs, 5);
    assert_eq!(cfg.config.monitor_debounce_ms, 2000);
    assert_eq!(cfg.config.fallback_format, "ppm");
    assert!(cfg.format.iter().any(|f| f.name == "eps" && !f.loadable));
    assert!(cfg.converter.iter().any(|c| c.from == "eps"));
}

#[test]
fn malformed_toml_is_a_toml_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "bad.toml", "[[format]\nname = ");
    assert!(matches!(load_from_path(&path), Err(ConvcacheError::TomlError(_))));
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_and_validate(dir.path().join("nope.toml")).unwrap_err();
    assert!(matches!(err, ConvcacheError::IoError(_)));
}

#[test]
fn converter_must_reference_known_formats() {
    let raw = raster_and_vector().with_converter("svg", "png", "x").build_raw();
    assert!(config_error(raw).contains("unknown format 'svg'"));
}

#[test]
fn converter_must_not_loop() {
    let raw = raster_and_vector().with_converter("png", "png", "x").build_raw();
    assert!(config_error(raw).contains("to itself"));
}

#[test]
fn converter_needs_a_command() {
    let raw = raster_and_vector().with_converter("eps", "png", "  ").build_raw();
    assert!(config_error(raw).contains("empty cmd"));
}

#[test]
fn formats_must_be_unique() {
    let raw = raster_and_vector().with_format("png", "png", true).build_raw();
    assert!(config_error(raw).contains("more than once"));
}

#[test]
fn formats_need_an_extension() {
    let raw = raster_and_vector().with_format("raw", "", false).build_raw();
    assert!(config_error(raw).contains("empty extension"));
}

#[test]
fn fallback_must_be_loadable() {
    let raw = raster_and_vector().fallback_format("pdf").build_raw();
    assert!(config_error(raw).contains("not loadable"));

    let raw = raster_and_vector().fallback_format("webp").build_raw();
    assert!(config_error(raw).contains("not a declared format"));
}

#[test]
fn at_least_one_format_is_required() {
    let raw = ConfigFileBuilder::new().build_raw();
    assert!(config_error(raw).contains("at least one"));
}
