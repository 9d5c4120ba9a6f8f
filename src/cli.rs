// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Command-line arguments for `convcache`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "convcache",
    version,
    about = "Convert files through external tools along a format graph and cache the results.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Convcache.toml` in the current working directory. If that
    /// file does not exist the built-in formats and converters are used.
    #[arg(long, value_name = "PATH", default_value = "Convcache.toml")]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `CONVCACHE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Load a file for display, converting it if needed, and report the result.
    Load {
        file: PathBuf,
    },

    /// Keep files loaded and reload them whenever they change on disk.
    Watch {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Convert a file to an explicit format.
    Convert {
        file: PathBuf,

        /// Target format name (e.g. `png`).
        #[arg(long, value_name = "FORMAT")]
        to: String,

        /// Destination path. Defaults to the source path with the target
        /// format's extension.
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// Print the generated conversion script instead of running it.
        #[arg(long)]
        dry_run: bool,
    },

    /// Print the conversion path between two formats.
    Path {
        from: String,
        to: String,
    },
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
