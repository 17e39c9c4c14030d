//! Command descriptions and the runner trait every host interaction goes through.
//!
//! # Design
//! - Hook tools, `snap`, `systemctl`, `openssl` and the bridge CLI are all plain child
//!   processes; funnelling them through one trait keeps the operator testable without root.
//! - `run` only fails when the process cannot be spawned; `check` turns a non-zero exit
//!   into [`RuntimeError::Failed`].

use std::fmt::{self, Display, Formatter};
use std::io::Write;
use std::process::{Command, Stdio};
use std::sync::Arc;

use tracing::debug;

use crate::error::{RuntimeError, RuntimeResult};

/// A single program invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Program name or absolute path.
    pub program: String,
    /// Arguments passed verbatim.
    pub args: Vec<String>,
    /// Optional bytes written to the child's stdin.
    pub stdin: Option<Vec<u8>>,
}

impl CommandSpec {
    /// Start describing an invocation of `program`.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdin: None,
        }
    }

    /// Append one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Feed `input` to the child's stdin.
    #[must_use]
    pub fn stdin(mut self, input: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// Whether the invocation starts with `program` followed by `prefix`.
    #[must_use]
    pub fn matches(&self, program: &str, prefix: &[&str]) -> bool {
        self.program == program
            && self.args.len() >= prefix.len()
            && self
                .args
                .iter()
                .zip(prefix)
                .all(|(arg, expected)| arg == expected)
    }
}

impl Display for CommandSpec {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.program)?;
        for arg in &self.args {
            write!(formatter, " {arg}")?;
        }
        Ok(())
    }
}

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when terminated by a signal.
    pub code: Option<i32>,
    /// Captured standard output.
    pub stdout: Vec<u8>,
    /// Captured standard error.
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    /// Successful output carrying `stdout`.
    #[must_use]
    pub fn success(stdout: impl Into<Vec<u8>>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            stderr: Vec::new(),
        }
    }

    /// Failed output with the given exit code and stderr.
    #[must_use]
    pub fn failure(code: i32, stderr: impl Into<Vec<u8>>) -> Self {
        Self {
            code: Some(code),
            stdout: Vec::new(),
            stderr: stderr.into(),
        }
    }

    /// Whether the process exited with status zero.
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        matches!(self.code, Some(0))
    }

    /// Decode stdout as UTF-8.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Utf8`] when stdout is not valid UTF-8.
    pub fn stdout_string(&self, program: &str) -> RuntimeResult<String> {
        String::from_utf8(self.stdout.clone()).map_err(|source| RuntimeError::Utf8 {
            program: program.to_string(),
            source,
        })
    }

    fn into_failure(self, program: &str) -> RuntimeError {
        RuntimeError::Failed {
            program: program.to_string(),
            code: self.code,
            stderr: String::from_utf8_lossy(&self.stderr).trim().to_string(),
        }
    }
}

/// Executes child processes to completion.
pub trait CommandRunner {
    /// Run the command and capture its output whatever the exit status.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Spawn`] when the process cannot be started.
    fn run(&self, spec: &CommandSpec) -> RuntimeResult<CommandOutput>;

    /// Run the command and require a zero exit status.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Failed`] on a non-zero exit, or any error from [`Self::run`].
    fn check(&self, spec: &CommandSpec) -> RuntimeResult<CommandOutput> {
        let output = self.run(spec)?;
        if output.succeeded() {
            Ok(output)
        } else {
            Err(output.into_failure(&spec.program))
        }
    }

    /// Run the command, require success and return stdout as a string.
    ///
    /// # Errors
    ///
    /// Returns any error from [`Self::check`] or a UTF-8 decoding failure.
    fn check_stdout(&self, spec: &CommandSpec) -> RuntimeResult<String> {
        self.check(spec)?.stdout_string(&spec.program)
    }
}

impl<T: CommandRunner + ?Sized> CommandRunner for &T {
    fn run(&self, spec: &CommandSpec) -> RuntimeResult<CommandOutput> {
        (**self).run(spec)
    }
}

impl<T: CommandRunner + ?Sized> CommandRunner for Arc<T> {
    fn run(&self, spec: &CommandSpec) -> RuntimeResult<CommandOutput> {
        (**self).run(spec)
    }
}

/// Runner backed by `std::process::Command`; blocks until the child exits.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, spec: &CommandSpec) -> RuntimeResult<CommandOutput> {
        debug!(command = %spec, "running command");
        let spawn_error = |source| RuntimeError::Spawn {
            program: spec.program.clone(),
            source,
        };

        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(if spec.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            });

        let mut child = command.spawn().map_err(spawn_error)?;
        if let Some(input) = &spec.stdin
            && let Some(mut stdin) = child.stdin.take()
        {
            stdin.write_all(input).map_err(spawn_error)?;
        }
        let output = child.wait_with_output().map_err(spawn_error)?;

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn spec_builder_and_display() {
        let spec = CommandSpec::new("systemctl")
            .arg("reload")
            .args(["matrix-appservice-irc"]);
        assert_eq!(spec.to_string(), "systemctl reload matrix-appservice-irc");
        assert!(spec.matches("systemctl", &["reload"]));
        assert!(!spec.matches("systemctl", &["start"]));
        assert!(!spec.matches("snap", &[]));
    }

    #[test]
    fn system_runner_captures_stdout() -> Result<(), Box<dyn Error>> {
        let spec = CommandSpec::new("sh").args(["-c", "printf hello"]);
        let stdout = SystemRunner.check_stdout(&spec)?;
        assert_eq!(stdout, "hello");
        Ok(())
    }

    #[test]
    fn system_runner_feeds_stdin() -> Result<(), Box<dyn Error>> {
        let spec = CommandSpec::new("cat").stdin("piped");
        assert_eq!(SystemRunner.check_stdout(&spec)?, "piped");
        Ok(())
    }

    #[test]
    fn check_reports_non_zero_exit() {
        let spec = CommandSpec::new("sh").args(["-c", "echo boom >&2; exit 3"]);
        let Err(err) = SystemRunner.check(&spec) else {
            panic!("expected failure");
        };
        match err {
            RuntimeError::Failed { code, stderr, .. } => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr, "boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn run_reports_missing_binary() {
        let spec = CommandSpec::new("/definitely/not/a/binary");
        assert!(matches!(
            SystemRunner.run(&spec),
            Err(RuntimeError::Spawn { .. })
        ));
    }
}
