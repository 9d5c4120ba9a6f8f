// tests/converter_script.rs

mod common;
use crate::common::{init_tracing, list_dir, with_timeout, write_file, EPS_HEADER, PPM_1X1, WRITE_PPM};

use std::fs;
use std::path::Path;
use std::sync::Arc;

use convcache::config::ConfigFile;
use convcache::convert::{ConversionScript, Converter, ConverterState};
use convcache::engine::Context;
use convcache::errors::ConversionError;
use convcache_test_utils::builders::raster_and_vector;
use convcache_test_utils::spawners::RecordingSpawner;

fn config(temp: &Path) -> ConfigFile {
    raster_and_vector()
        .temp_dir(temp)
        .with_converter("eps", "pdf", "cp $$i $$o")
        .with_converter("pdf", "ppm", WRITE_PPM)
        .build()
}

#[test]
fn rendered_script_chains_every_edge() {
    let temp = tempfile::tempdir().unwrap();
    let ctx = Context::new(&config(temp.path()));
    let conv = Converter::new("/src/fig.eps", "eps", "ppm", "/out/fig.ppm");

    let script = conv.build_script(&ctx).unwrap();
    let text = script.render();

    assert!(text.starts_with("#!/bin/sh\n"));
    assert!(text.contains("rm_quiet() {"));
    assert!(text.contains("rm_outputs() {"));
    assert!(text.contains("    rm_outputs \"$outfile\"\n"));
    assert!(text.contains("normalize_output() {"));
    assert!(text.contains("infile='/src/fig.eps'\ninfile_base='/src/fig'\n"));
    assert!(text.contains("if ! ( cp \"$infile\" \"$outfile\" ); then"));
    let first = text.find("# step 1: eps -> pdf").unwrap();
    let second = text.find("# step 2: pdf -> ppm").unwrap();
    assert!(first < second);
    assert!(text.contains("mv -f -- "));
    assert!(text.contains(" '/out/fig.ppm' || exit 1"));
    assert!(text.trim_end().ends_with("exit 0"));
}

#[test]
fn same_format_is_a_plain_copy_or_move() {
    let copy = ConversionScript::for_copy(Path::new("/a b.ppm"), Path::new("/c.ppm"), false);
    assert!(copy.render().contains("cp -f -- '/a b.ppm' '/c.ppm'"));
    let mv = ConversionScript::for_copy(Path::new("/it's.ppm"), Path::new("/c.ppm"), true);
    assert!(mv.render().contains(r"mv -f -- '/it'\''s.ppm' '/c.ppm'"));
}

#[tokio::test]
async fn two_step_conversion_cleans_up_intermediates() {
    init_tracing();
    let src_dir = tempfile::tempdir().unwrap();
    let temp = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let source = write_file(src_dir.path(), "it's a figure.eps", EPS_HEADER);
    let dest = out.path().join("figure.ppm");

    let spawner = RecordingSpawner::new();
    let mut ctx = Context::with_spawner(&config(temp.path()), Arc::new(spawner.clone()));
    let mut conv = Converter::new(&source, "eps", "ppm", &dest);
    let done = conv.subscribe();

    let rx = conv.start_conversion(&mut ctx).unwrap();
    assert_eq!(conv.state(), ConverterState::Running);
    let argv = &spawner.calls()[0];
    assert_eq!(argv[0], "sh");
    assert!(argv[1].ends_with(".sh"));

    let outcome = with_timeout(ctx.wait_for_job(rx)).await;
    assert!(conv.finish(&outcome));
    assert!(done.await.unwrap());

    assert_eq!(conv.converted_file(), Some(dest.as_path()));
    assert_eq!(fs::read_to_string(&dest).unwrap(), PPM_1X1);
    assert!(source.exists(), "the source is never deleted");
    assert!(list_dir(temp.path()).is_empty(), "script and intermediates removed");
}

#[tokio::test]
async fn same_format_conversion_copies_content() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_file(dir.path(), "a.ppm", PPM_1X1);
    let dest = dir.path().join("b.ppm");

    let mut ctx = Context::new(&config(dir.path()));
    let mut conv = Converter::new(&source, "ppm", "ppm", &dest);
    let rx = conv.start_conversion(&mut ctx).unwrap();
    let outcome = with_timeout(ctx.wait_for_job(rx)).await;

    assert!(conv.finish(&outcome));
    assert_eq!(fs::read(&dest).unwrap(), fs::read(&source).unwrap());
}

#[tokio::test]
async fn moving_source_consumes_it() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_file(dir.path(), "tmp.ppm", PPM_1X1);
    let dest = dir.path().join("final.ppm");

    let mut ctx = Context::new(&config(dir.path()));
    let mut conv = Converter::new(&source, "ppm", "ppm", &dest).move_source(true);
    let rx = conv.start_conversion(&mut ctx).unwrap();
    let outcome = with_timeout(ctx.wait_for_job(rx)).await;

    assert!(conv.finish(&outcome));
    assert!(!source.exists());
    assert_eq!(fs::read_to_string(&dest).unwrap(), PPM_1X1);
}

#[tokio::test]
async fn missing_path_fails_without_spawning() {
    let temp = tempfile::tempdir().unwrap();
    let spawner = RecordingSpawner::new();
    let mut ctx = Context::with_spawner(&config(temp.path()), Arc::new(spawner.clone()));

    let mut conv = Converter::new("/src/x.ppm", "ppm", "eps", "/out/x.eps");
    let done = conv.subscribe();
    let err = conv.start_conversion(&mut ctx).unwrap_err();

    assert!(matches!(err, ConversionError::PathNotFound { .. }));
    assert!(!done.await.unwrap());
    assert_eq!(conv.state(), ConverterState::Failed);
    assert_eq!(conv.converted_file(), None);
    assert_eq!(spawner.spawn_count(), 0);
    assert!(list_dir(temp.path()).is_empty());
}

#[tokio::test]
async fn failing_step_removes_partial_output() {
    init_tracing();
    let src_dir = tempfile::tempdir().unwrap();
    let temp = tempfile::tempdir().unwrap();
    let source = write_file(src_dir.path(), "f.eps", EPS_HEADER);
    let dest = src_dir.path().join("f.ppm");

    let cfg = raster_and_vector()
        .temp_dir(temp.path())
        .with_converter("eps", "pdf", "cp $$i $$o")
        .with_converter("pdf", "ppm", "echo partial > $$o; exit 3")
        .build();
    let mut ctx = Context::new(&cfg);
    let mut conv = Converter::new(&source, "eps", "ppm", &dest);
    let rx = conv.start_conversion(&mut ctx).unwrap();
    let outcome = with_timeout(ctx.wait_for_job(rx)).await;

    assert!(!conv.finish(&outcome));
    assert_eq!(conv.error(), Some(&ConversionError::NonZeroExit(1)));
    assert!(!dest.exists());
    assert!(list_dir(temp.path()).is_empty(), "partial output and intermediate removed");
}

#[tokio::test]
async fn failing_step_removes_numbered_partial_outputs() {
    let src_dir = tempfile::tempdir().unwrap();
    let temp = tempfile::tempdir().unwrap();
    let source = write_file(src_dir.path(), "f.eps", EPS_HEADER);
    let dest = src_dir.path().join("f.ppm");

    let cfg = raster_and_vector()
        .temp_dir(temp.path())
        .with_converter("eps", "ppm", "echo a > $$o.0; echo b > $$o.1; exit 3")
        .build();
    let mut ctx = Context::new(&cfg);
    let mut conv = Converter::new(&source, "eps", "ppm", &dest);
    let rx = conv.start_conversion(&mut ctx).unwrap();
    let outcome = with_timeout(ctx.wait_for_job(rx)).await;

    assert!(!conv.finish(&outcome));
    assert_eq!(conv.error(), Some(&ConversionError::NonZeroExit(1)));
    assert!(!dest.exists());
    assert!(list_dir(temp.path()).is_empty(), "numbered pages removed");
}

#[tokio::test]
async fn numbered_outputs_are_normalized() {
    let src_dir = tempfile::tempdir().unwrap();
    let temp = tempfile::tempdir().unwrap();
    let source = write_file(src_dir.path(), "doc.pdf", "%PDF-1.4\n");
    let dest = src_dir.path().join("doc.ppm");

    let cfg = raster_and_vector()
        .temp_dir(temp.path())
        .with_converter("pdf", "ppm", "printf first > $$o.0; printf second > $$o.1")
        .build();
    let mut ctx = Context::new(&cfg);
    let mut conv = Converter::new(&source, "pdf", "ppm", &dest);
    let rx = conv.start_conversion(&mut ctx).unwrap();
    let outcome = with_timeout(ctx.wait_for_job(rx)).await;

    assert!(conv.finish(&outcome));
    assert_eq!(fs::read_to_string(&dest).unwrap(), "first");
    assert!(list_dir(temp.path()).is_empty(), "extra pages removed");
}
