use std::io;
use std::sync::{Arc, Mutex};

use convcache::exec::{ProcessSpawner, RealSpawner};
use tokio::process::Child;

/// Spawns for real, but records every argv it is asked to start.
#[derive(Debug, Clone, Default)]
pub struct RecordingSpawner {
    inner: RealSpawner,
    calls: Arc<Mutex<Vec<Vec<String>>>>,
}

impl RecordingSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    pub fn spawn_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl ProcessSpawner for RecordingSpawner {
    fn spawn(&self, argv: &[String]) -> io::Result<Child> {
        self.calls.lock().unwrap().push(argv.to_vec());
        self.inner.spawn(argv)
    }
}

/// Refuses every spawn, as if the executable did not exist.
#[derive(Debug, Clone, Default)]
pub struct FailingSpawner {
    attempts: Arc<Mutex<usize>>,
}

impl FailingSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempts(&self) -> usize {
        *self.attempts.lock().unwrap()
    }
}

impl ProcessSpawner for FailingSpawner {
    fn spawn(&self, argv: &[String]) -> io::Result<Child> {
        *self.attempts.lock().unwrap() += 1;
        Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("refusing to spawn {:?}", argv.first()),
        ))
    }
}
