// src/exec/spawner.rs

//! Pluggable process-creation capability.
//!
//! Everything that starts an OS process goes through a `ProcessSpawner`
//! instead of calling `tokio::process::Command` directly. Production code
//! uses [`RealSpawner`]; tests can wrap it to record or refuse spawns.

use std::fmt::Debug;
use std::io;
use std::process::Stdio;

use tokio::process::{Child, Command};

/// Trait abstracting how an argv becomes a running child process.
pub trait ProcessSpawner: Send + Sync + Debug {
    /// Start `argv[0]` with the remaining arguments, inheriting the
    /// environment. stdout and stderr must be piped; stdin is null.
    fn spawn(&self, argv: &[String]) -> io::Result<Child>;
}

/// Spawner backed by `tokio::process::Command`.
#[derive(Debug, Clone, Default)]
pub struct RealSpawner;

impl ProcessSpawner for RealSpawner {
    fn spawn(&self, argv: &[String]) -> io::Result<Child> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty command"))?;

        Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
    }
}
