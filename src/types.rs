use std::fmt;

/// How [`crate::exec::ProcessHandle::run`] delivers completion.
///
/// - `Wait`: the caller awaits the process and gets its outcome back.
/// - `Async`: the handle is parked in the process registry and completion is
///   delivered later through its subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Wait,
    Async,
}

/// Final outcome of one external process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// The process exited on its own with this code.
    Exited(i32),
    /// The process was terminated by a signal.
    Signalled(i32),
    /// The OS never created the process.
    SpawnFailed(String),
}

impl ProcessOutcome {
    pub fn success(&self) -> bool {
        matches!(self, ProcessOutcome::Exited(0))
    }

    /// Exit code in the shell convention (`128 + signal` for signals, `-1`
    /// when nothing ran).
    pub fn code(&self) -> i32 {
        match self {
            ProcessOutcome::Exited(code) => *code,
            ProcessOutcome::Signalled(sig) => 128 + sig,
            ProcessOutcome::SpawnFailed(_) => -1,
        }
    }
}

impl fmt::Display for ProcessOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessOutcome::Exited(code) => write!(f, "exited with {code}"),
            ProcessOutcome::Signalled(sig) => write!(f, "killed by signal {sig}"),
            ProcessOutcome::SpawnFailed(reason) => write!(f, "spawn failed: {reason}"),
        }
    }
}

/// Load/convert status of a [`crate::cache::CacheEntry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheStatus {
    WaitingToLoad,
    Converting,
    Loaded,
    ErrorNoFile,
    ErrorConverting,
    ErrorLoading,
}

impl CacheStatus {
    /// Whether the entry has settled (nothing in flight).
    pub fn is_terminal(self) -> bool {
        !matches!(self, CacheStatus::WaitingToLoad | CacheStatus::Converting)
    }

    pub fn is_error(self) -> bool {
        matches!(
            self,
            CacheStatus::ErrorNoFile | CacheStatus::ErrorConverting | CacheStatus::ErrorLoading
        )
    }
}

impl Default for CacheStatus {
    fn default() -> Self {
        CacheStatus::WaitingToLoad
    }
}
