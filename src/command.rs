//! External tool invocation.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::io::ErrorKind;
use std::process::{Command, Stdio};

use crate::{AsciiMediaError, Result};

/// A program plus its arguments.
///
/// Arguments are kept as `OsString` so paths reach the tool byte for byte; only
/// [`fmt::Display`] renders them lossily.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalCommand {
    pub program: OsString,
    pub args: Vec<OsString>,
}

impl ExternalCommand {
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self { program: program.as_ref().to_os_string(), args: Vec::new() }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        for a in args {
            self = self.arg(a);
        }
        self
    }

    /// UTF-8 value following `flag`, if present. Inspection helper for tests.
    #[doc(hidden)]
    pub fn value_of(&self, flag: &str) -> Option<&str> {
        let pos = self.args.iter().position(|a| a == flag)?;
        self.args.get(pos + 1).and_then(|a| a.to_str())
    }

    #[doc(hidden)]
    pub fn has_arg(&self, arg: &str) -> bool {
        self.args.iter().any(|a| a == arg)
    }

    #[doc(hidden)]
    pub fn last_arg(&self) -> Option<&str> {
        self.args.last().and_then(|a| a.to_str())
    }

    pub(crate) fn program_name(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }
}

impl fmt::Display for ExternalCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.to_string_lossy())?;
        for a in &self.args {
            write!(f, " {}", a.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Runs external tools on behalf of the pipeline stages.
///
/// Implementations block until the command exits and return its stdout. A missing
/// executable must map to [`AsciiMediaError::ToolNotFound`], a non-zero exit to
/// [`AsciiMediaError::ToolFailed`].
pub trait CommandRunner: Send + Sync {
    fn run(&self, command: &ExternalCommand, description: &str) -> Result<String>;
}

/// Runs commands as real subprocesses.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, command: &ExternalCommand, description: &str) -> Result<String> {
        tracing::debug!(command = %command, "{description}");
        let out = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => {
                    AsciiMediaError::ToolNotFound { program: command.program_name() }
                }
                _ => AsciiMediaError::ToolFailed {
                    description: description.to_string(),
                    command: command.to_string(),
                    stderr: e.to_string(),
                },
            })?;

        if !out.status.success() {
            return Err(AsciiMediaError::ToolFailed {
                description: description.to_string(),
                command: command.to_string(),
                stderr: String::from_utf8_lossy(&out.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&out.stdout).into_owned())
    }
}

/// Whether `program` can be spawned from `PATH`.
pub fn is_on_path(program: &str, version_flag: &str) -> bool {
    Command::new(program)
        .arg(version_flag)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok()
}

/// Fails with [`AsciiMediaError::ToolNotFound`] for the first tool that cannot be spawned.
pub fn require_tools(tools: &[(&str, &str)]) -> Result<()> {
    for (program, version_flag) in tools {
        if !is_on_path(program, version_flag) {
            return Err(AsciiMediaError::ToolNotFound { program: program.to_string() });
        }
    }
    Ok(())
}
