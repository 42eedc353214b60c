//! Trainer invocation adapter
//!
//! The external trainer is an executable accepting a `train` verb,
//! flag/value pairs for each present config field, and a
//! `--result_file` flag naming the output path. Exit status 0 means
//! success; anything else is a fatal invocation failure.
//!
//! The adapter is the only place that touches the external-process
//! boundary, behind the [`Trainer`] trait so tests can substitute a
//! mock without running real training.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use crate::config::RunConfig;
use crate::{Error, Result};

/// The external-trainer boundary.
///
/// `invoke` is a blocking call: the calling thread is suspended for
/// the full duration of training, and no partial result is consumed
/// mid-run. On success a result file must exist at `output_path`;
/// the adapter itself never validates its contents; that is the
/// cache's responsibility after the call returns.
pub trait Trainer {
    /// Run one training job for `config`, writing the result file to
    /// `output_path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TrainerExecution`] if the trainer terminates
    /// unsuccessfully.
    fn invoke(&self, config: &RunConfig, output_path: &Path) -> Result<()>;
}

/// [`Trainer`] backed by an external executable.
pub struct CommandTrainer {
    program: PathBuf,
    leading_args: Vec<String>,
}

impl CommandTrainer {
    /// Wrap the trainer executable at `program`.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
        }
    }

    /// Append an argument passed before the `train` verb. Lets the
    /// program be a launcher, e.g. `cargo` with `run --release --`.
    #[must_use]
    pub fn leading_arg(mut self, arg: impl Into<String>) -> Self {
        self.leading_args.push(arg.into());
        self
    }

    fn args_for(&self, config: &RunConfig, output_path: &Path) -> Vec<String> {
        let mut args = self.leading_args.clone();
        args.push("train".to_string());
        for (name, value) in config.present_fields() {
            args.push(format!("--{name}"));
            args.push(value);
        }
        args.push("--result_file".to_string());
        args.push(output_path.display().to_string());
        args
    }
}

impl Trainer for CommandTrainer {
    fn invoke(&self, config: &RunConfig, output_path: &Path) -> Result<()> {
        let args = self.args_for(config, output_path);
        debug!(program = %self.program.display(), ?args, "invoking trainer");

        let status = Command::new(&self.program).args(&args).status()?;
        if !status.success() {
            return Err(Error::TrainerExecution(match status.code() {
                Some(code) => format!("trainer exited with status {code}"),
                None => "trainer terminated by signal".to_string(),
            }));
        }
        Ok(())
    }
}
