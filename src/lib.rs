// src/lib.rs

pub mod cache;
pub mod cli;
pub mod config;
pub mod convert;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod types;

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Result};
use tracing::{debug, info};

use crate::cli::{CliArgs, Command};
use crate::config::loader::load_or_builtin;
use crate::config::model::ConfigFile;
use crate::convert::Converter;
use crate::engine::{Context, EntryId, Runtime, RuntimeEvent};
use crate::errors::ConvcacheError;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - the shared context (registry, job queue, formats, graph)
/// - the runtime and its cache entries
/// - (for `watch`) file monitors and Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_or_builtin(&args.config)?;
    debug!(
        formats = cfg.format.len(),
        converters = cfg.converter.len(),
        "configuration loaded"
    );

    match args.command {
        Command::Load { file } => load(&cfg, file).await,
        Command::Watch { files } => watch(&cfg, files).await,
        Command::Convert {
            file,
            to,
            output,
            dry_run,
        } => convert(&cfg, &file, &to, output, dry_run).await,
        Command::Path { from, to } => print_path(&cfg, &from, &to),
    }
}

async fn load(cfg: &ConfigFile, file: PathBuf) -> Result<()> {
    let mut runtime = Runtime::new(Context::new(cfg));
    let id = runtime.add_entry(file);
    runtime.start_loading(id);
    runtime.run_until_settled(&[id]).await;
    report(&runtime, id)
}

async fn watch(cfg: &ConfigFile, files: Vec<PathBuf>) -> Result<()> {
    let mut runtime = Runtime::new(Context::new(cfg));

    for file in files {
        let id = runtime.add_entry(file);
        if let Some(entry) = runtime.entry(id) {
            let mut status_rx = entry.connect();
            let name = entry.filename().display().to_string();
            tokio::spawn(async move {
                while let Ok(change) = status_rx.recv().await {
                    println!("{name}: {:?}", change.status);
                }
            });
        }
        runtime.start_monitoring(id)?;
        runtime.start_loading(id);
    }

    // Ctrl-C → graceful shutdown.
    {
        let tx = runtime.sender();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        });
    }

    runtime.run().await?;
    Ok(())
}

async fn convert(
    cfg: &ConfigFile,
    file: &Path,
    to: &str,
    output: Option<PathBuf>,
    dry_run: bool,
) -> Result<()> {
    let mut ctx = Context::new(cfg);

    let from = ctx
        .formats
        .sniff(file)
        .map(|f| f.name.clone())
        .ok_or_else(|| ConvcacheError::UnknownFormat(file.display().to_string()))?;
    let ext = ctx
        .formats
        .extension(to)
        .ok_or_else(|| ConvcacheError::UnknownFormat(to.to_string()))?;
    let dest = output.unwrap_or_else(|| file.with_extension(ext));

    if from == to && same_file(file, &dest) {
        info!(file = %file.display(), format = to, "already in the target format");
        println!("{}", dest.display());
        return Ok(());
    }

    let mut converter = Converter::new(file, from, to, &dest);

    if dry_run {
        let script = converter.build_script(&ctx)?;
        print!("{}", script.render());
        return Ok(());
    }

    let rx = converter.start_conversion(&mut ctx)?;
    let outcome = ctx.wait_for_job(rx).await;
    if !converter.finish(&outcome) {
        let err = converter
            .error()
            .map(|e| anyhow!("{e}"))
            .unwrap_or_else(|| anyhow!("conversion failed: {outcome}"));
        return Err(err);
    }

    info!(dest = %dest.display(), "conversion complete");
    println!("{}", dest.display());
    Ok(())
}

fn print_path(cfg: &ConfigFile, from: &str, to: &str) -> Result<()> {
    let ctx = Context::new(cfg);
    for name in [from, to] {
        if ctx.formats.get(name).is_none() {
            return Err(ConvcacheError::UnknownFormat(name.to_string()).into());
        }
    }

    if from == to {
        println!("{from}: no conversion needed");
        return Ok(());
    }

    let path = ctx.graph.get_path(from, to);
    if path.is_empty() {
        bail!("no conversion path from '{from}' to '{to}'");
    }
    for edge in path.iter() {
        println!("{} -> {}: {}", edge.from, edge.to, edge.command);
    }
    Ok(())
}

fn same_file(a: &Path, b: &Path) -> bool {
    a == b
        || matches!(
            (std::fs::canonicalize(a), std::fs::canonicalize(b)),
            (Ok(a), Ok(b)) if a == b
        )
}

/// Print the final state of an entry; an error status fails the command.
fn report(runtime: &Runtime, id: EntryId) -> Result<()> {
    let entry = runtime
        .entry(id)
        .ok_or_else(|| anyhow!("entry {id} disappeared"))?;

    let status = entry.status();
    if status.is_error() {
        match entry.last_error() {
            Some(err) => bail!("{}: {:?}: {err}", entry.filename().display(), status),
            None => bail!("{}: {:?}", entry.filename().display(), status),
        }
    }

    if let Some(image) = entry.image() {
        println!(
            "{}: {:?} ({} {}x{}, {})",
            entry.filename().display(),
            status,
            image.format,
            image.width,
            image.height,
            image.path.display()
        );
        return Ok(());
    }

    bail!("{}: {:?}: nothing loaded", entry.filename().display(), status)
}
