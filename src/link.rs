//! Turning an object into an executable with the system C compiler driver.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::core::error::{CompileError, CompileResult};

/// Default linker driver. It supplies the C runtime startup files and libc.
pub const DEFAULT_LINKER: &str = "cc";

/// External link step.
#[derive(Debug, Clone)]
pub struct Linker {
    program: PathBuf,
    extra_args: Vec<String>,
}

impl Linker {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            extra_args: Vec::new(),
        }
    }

    /// Pass `arg` to the driver after the object path.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.extra_args.push(arg.into());
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Build the driver invocation without running it.
    pub fn command(&self, object: &Path, output: &Path) -> Command {
        let mut command = Command::new(&self.program);
        command.arg(object).args(&self.extra_args).arg("-o").arg(output);
        command
    }

    /// Link `object` into the executable `output`.
    pub fn link(&self, object: &Path, output: &Path) -> CompileResult<()> {
        let mut command = self.command(object, output);
        log::info!("linking: {command:?}");

        let result = command.output().map_err(|e| CompileError::Link {
            reason: format!("failed to run {}: {e}", self.program.display()),
        })?;
        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(CompileError::Link {
                reason: format!(
                    "{} exited with {}: {}",
                    self.program.display(),
                    result.status,
                    stderr.trim()
                ),
            });
        }
        Ok(())
    }
}

impl Default for Linker {
    fn default() -> Self {
        Self::new(DEFAULT_LINKER)
    }
}
