//! Step command execution
//!
//! The command's exit status is data recorded in the link. Only a failure to
//! start the process at all is an error.

use std::fs;
use std::io;
use std::path::Path;
use std::process::Command;
use thiserror::Error;
use tracing::{debug, info};

use steplink_metadata::ByProducts;

/// Recorded when the process was terminated by a signal
pub const SIGNAL_RETURN_VALUE: i64 = -1;

/// Errors that prevent the command from running
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("no command given")]
    EmptyCommand,

    #[error("invalid run directory {path}: {reason}")]
    RunDir { path: String, reason: String },

    #[error("failed to start {program}: {source}")]
    Spawn { program: String, source: io::Error },
}

/// Runs a step command and captures its byproducts
pub trait CommandRunner {
    fn run(&self, command: &[String], run_dir: Option<&Path>) -> Result<ByProducts, RunnerError>;
}

/// Runs commands as child processes and waits for them
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

/// The run directory must exist, be a real directory (not a symlink) and
/// be writable.
pub fn check_run_dir(dir: &Path) -> Result<(), RunnerError> {
    let run_dir_err = |reason: &str| RunnerError::RunDir {
        path: dir.display().to_string(),
        reason: reason.to_string(),
    };

    let metadata = match fs::symlink_metadata(dir) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(run_dir_err("does not exist"))
        }
        Err(e) => return Err(run_dir_err(&e.to_string())),
    };

    if metadata.file_type().is_symlink() {
        return Err(run_dir_err("must not be a symlink"));
    }
    if !metadata.is_dir() {
        return Err(run_dir_err("not a directory"));
    }
    if metadata.permissions().readonly() {
        return Err(run_dir_err("not writable"));
    }
    Ok(())
}

impl CommandRunner for ProcessRunner {
    fn run(&self, command: &[String], run_dir: Option<&Path>) -> Result<ByProducts, RunnerError> {
        let (program, args) = command.split_first().ok_or(RunnerError::EmptyCommand)?;

        let mut cmd = Command::new(program);
        cmd.args(args);
        if let Some(dir) = run_dir {
            check_run_dir(dir)?;
            cmd.current_dir(dir);
        }

        debug!(program = %program, args = ?args, "starting command");
        let output = cmd.output().map_err(|e| RunnerError::Spawn {
            program: program.clone(),
            source: e,
        })?;

        let return_value = output
            .status
            .code()
            .map(i64::from)
            .unwrap_or(SIGNAL_RETURN_VALUE);
        info!(program = %program, return_value, "command finished");

        Ok(ByProducts::from_output(
            String::from_utf8_lossy(&output.stdout).into_owned(),
            String::from_utf8_lossy(&output.stderr).into_owned(),
            return_value,
        ))
    }
}
