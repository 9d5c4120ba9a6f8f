// tests/cli_commands.rs

mod common;
use crate::common::{init_tracing, write_file, PPM_1X1};

use std::fs;
use std::path::Path;

use clap::Parser;
use convcache::cli::CliArgs;

fn args(config_dir: &Path, rest: &[&str]) -> CliArgs {
    // An empty file selects the built-in formats and converters.
    let config = write_file(config_dir, "Convcache.toml", "");
    let mut argv = vec!["convcache", "--config", config.to_str().unwrap()];
    argv.extend_from_slice(rest);
    CliArgs::try_parse_from(argv).unwrap()
}

#[tokio::test]
async fn convert_to_own_format_in_place_is_a_no_op() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let source = write_file(dir.path(), "x.ppm", PPM_1X1);

    let cli = args(dir.path(), &["convert", source.to_str().unwrap(), "--to", "ppm"]);
    convcache::run(cli).await.unwrap();

    assert_eq!(fs::read_to_string(&source).unwrap(), PPM_1X1);
}

#[tokio::test]
async fn load_of_missing_file_fails_with_its_status() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("gone.ppm");

    let cli = args(dir.path(), &["load", missing.to_str().unwrap()]);
    let err = convcache::run(cli).await.unwrap_err();

    assert!(err.to_string().contains("ErrorNoFile"), "{err}");
}

#[tokio::test]
async fn load_reports_a_loadable_file() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_file(dir.path(), "x.ppm", PPM_1X1);

    let cli = args(dir.path(), &["load", source.to_str().unwrap()]);
    convcache::run(cli).await.unwrap();
}
