// src/convert/converter.rs

use std::fs;
use std::path::{Path, PathBuf};

use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::engine::Context;
use crate::errors::ConversionError;
use crate::exec::quote_arg;
use crate::types::ProcessOutcome;

use super::script::ConversionScript;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConverterState {
    Idle,
    Running,
    Succeeded,
    Failed,
}

/// Converts one source file into one destination file of another format by
/// running a generated script through the job queue.
#[derive(Debug)]
pub struct Converter {
    source: PathBuf,
    from: String,
    to: String,
    dest: PathBuf,
    move_source: bool,
    token: Uuid,
    script_path: Option<PathBuf>,
    state: ConverterState,
    error: Option<ConversionError>,
    subscribers: Vec<oneshot::Sender<bool>>,
}

impl Converter {
    pub fn new(
        source: impl Into<PathBuf>,
        from: impl Into<String>,
        to: impl Into<String>,
        dest: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source: source.into(),
            from: from.into(),
            to: to.into(),
            dest: dest.into(),
            move_source: false,
            token: Uuid::new_v4(),
            script_path: None,
            state: ConverterState::Idle,
            error: None,
            subscribers: Vec::new(),
        }
    }

    /// Treat the source as a temp file owned by the caller: a same-format
    /// conversion moves it instead of copying.
    pub fn move_source(mut self, yes: bool) -> Self {
        self.move_source = yes;
        self
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn from_format(&self) -> &str {
        &self.from
    }

    pub fn to_format(&self) -> &str {
        &self.to
    }

    pub fn dest(&self) -> &Path {
        &self.dest
    }

    pub fn state(&self) -> ConverterState {
        self.state
    }

    pub fn error(&self) -> Option<&ConversionError> {
        self.error.as_ref()
    }

    /// Register for the boolean result. Late subscribers get it at once.
    pub fn subscribe(&mut self) -> oneshot::Receiver<bool> {
        let (tx, rx) = oneshot::channel();
        match self.state {
            ConverterState::Succeeded => {
                let _ = tx.send(true);
            }
            ConverterState::Failed => {
                let _ = tx.send(false);
            }
            ConverterState::Idle | ConverterState::Running => self.subscribers.push(tx),
        }
        rx
    }

    /// Render the script this converter would run, without writing it.
    pub fn build_script(&self, ctx: &Context) -> Result<ConversionScript, ConversionError> {
        if self.from == self.to {
            return Ok(ConversionScript::for_copy(
                &self.source,
                &self.dest,
                self.move_source,
            ));
        }

        let path = ctx.graph.get_path(&self.from, &self.to);
        if path.is_empty() {
            return Err(ConversionError::PathNotFound {
                from: self.from.clone(),
                to: self.to.clone(),
            });
        }

        let temp_base = ctx
            .settings
            .temp_dir
            .join(format!("convcache_{}", self.token.simple()));
        Ok(ConversionScript::for_path(
            &path,
            &self.source,
            &self.dest,
            &temp_base,
            &ctx.formats,
        ))
    }

    /// Write the script and submit `sh <script>` to the job queue.
    ///
    /// A missing conversion path (or a script that cannot be written) fails
    /// synchronously: no process is spawned and subscribers get `false`.
    /// Otherwise the returned receiver yields the job outcome, which the
    /// owner hands back to [`Converter::finish`].
    pub fn start_conversion(
        &mut self,
        ctx: &mut Context,
    ) -> Result<oneshot::Receiver<ProcessOutcome>, ConversionError> {
        let script = match self.build_script(ctx) {
            Ok(script) => script,
            Err(e) => return Err(self.fail(e)),
        };

        let script_path = ctx
            .settings
            .temp_dir
            .join(format!("convcache_{}.sh", self.token.simple()));
        if let Err(e) = fs::write(&script_path, script.render()) {
            return Err(self.fail(ConversionError::SpawnFailure(format!(
                "writing {}: {e}",
                script_path.display()
            ))));
        }
        self.script_path = Some(script_path.clone());

        let Some(quoted) = quote_arg(&script_path.to_string_lossy()) else {
            self.remove_script();
            return Err(self.fail(ConversionError::SpawnFailure(format!(
                "cannot quote script path {}",
                script_path.display()
            ))));
        };

        info!(
            from = %self.from,
            to = %self.to,
            source = %self.source.display(),
            dest = %self.dest.display(),
            "starting conversion"
        );
        self.state = ConverterState::Running;
        Ok(ctx.submit(format!("sh {quoted}")))
    }

    /// Record the job outcome. Returns whether the conversion succeeded.
    pub fn finish(&mut self, outcome: &ProcessOutcome) -> bool {
        self.remove_script();

        let result = match outcome {
            ProcessOutcome::Exited(0) if self.dest.exists() => Ok(()),
            ProcessOutcome::Exited(0) => Err(ConversionError::LoadFailed(format!(
                "converter produced no output at {}",
                self.dest.display()
            ))),
            ProcessOutcome::Exited(code) => Err(ConversionError::NonZeroExit(*code)),
            ProcessOutcome::Signalled(9) => Err(ConversionError::TimeoutUnresponsive(9)),
            ProcessOutcome::Signalled(_) => Err(ConversionError::NonZeroExit(outcome.code())),
            ProcessOutcome::SpawnFailed(reason) => {
                Err(ConversionError::SpawnFailure(reason.clone()))
            }
        };

        match result {
            Ok(()) => {
                info!(from = %self.from, to = %self.to, dest = %self.dest.display(), "conversion finished");
                self.state = ConverterState::Succeeded;
                self.notify(true);
                true
            }
            Err(e) => {
                warn!(from = %self.from, to = %self.to, error = %e, "conversion failed");
                self.fail(e);
                false
            }
        }
    }

    /// The destination file, only once the conversion succeeded.
    pub fn converted_file(&self) -> Option<&Path> {
        match self.state {
            ConverterState::Succeeded => Some(&self.dest),
            _ => None,
        }
    }

    fn fail(&mut self, error: ConversionError) -> ConversionError {
        self.state = ConverterState::Failed;
        self.error = Some(error.clone());
        self.notify(false);
        error
    }

    fn notify(&mut self, ok: bool) {
        for tx in self.subscribers.drain(..) {
            let _ = tx.send(ok);
        }
    }

    fn remove_script(&mut self) {
        let Some(path) = self.script_path.take() else {
            return;
        };
        match fs::remove_file(&path) {
            Ok(()) => debug!(script = %path.display(), "removed conversion script"),
            Err(e) => warn!(script = %path.display(), error = %e, "failed to remove conversion script"),
        }
    }
}

impl Drop for Converter {
    fn drop(&mut self) {
        self.remove_script();
    }
}
