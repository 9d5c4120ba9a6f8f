// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`tokenize`] turns a command string into an argv.
//! - [`spawner`] provides the `ProcessSpawner` trait and the production
//!   `RealSpawner`, which tests can wrap or replace.
//! - [`process`] owns one OS process (`ProcessHandle`): spawn, poll, kill.
//! - [`kill_timer`] escalates SIGTERM to SIGKILL after a grace period.
//! - [`registry`] keeps in-flight asynchronous processes and reaps them.
//! - [`signal`] contains the pid-level signalling helpers.

pub mod kill_timer;
pub mod process;
pub mod registry;
pub mod signal;
pub mod spawner;
pub mod tokenize;

pub use kill_timer::{KillTimer, KillTimerState};
pub use process::{ExitSlot, Launch, ProcessHandle};
pub use registry::ProcessRegistry;
pub use spawner::{ProcessSpawner, RealSpawner};
pub use tokenize::{quote_arg, tokenize};
