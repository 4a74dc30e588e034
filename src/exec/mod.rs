//! External command execution
//!
//! Everything envboot does to the host goes through a [`CommandRunner`]:
//! locating executables, read-only queries (`pip show`, `nvidia-smi -L`)
//! and mutating installs. The runner is the seam used by dry runs and tests.

mod system;
#[cfg(test)]
mod mock;

pub use system::*;
#[cfg(test)]
pub use mock::*;

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Whether a command only inspects the host or changes it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    Query,
    Mutate,
}

/// A single external command invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub effect: Effect,
}

impl CommandSpec {
    /// A read-only command
    pub fn query<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            effect: Effect::Query,
        }
    }

    /// A command that changes the host
    pub fn mutate<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            effect: Effect::Mutate,
        }
    }

    /// Wrap this command in `sudo`
    pub fn with_sudo(self) -> Self {
        let mut args = Vec::with_capacity(self.args.len() + 1);
        args.push(self.program);
        args.extend(self.args);
        Self {
            program: "sudo".to_string(),
            args,
            effect: self.effect,
        }
    }

    pub fn is_mutating(&self) -> bool {
        self.effect == Effect::Mutate
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) || arg.contains(['|', '>', '<', '&', ';']) {
                write!(f, " '{}'", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Captured result of a finished command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code (None when terminated by a signal)
    pub code: Option<i32>,
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// A successful, silent result
    pub fn ok() -> Self {
        Self {
            code: Some(0),
            success: true,
            ..Default::default()
        }
    }

    /// A failed result with the given exit code and stderr
    #[cfg(test)]
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            success: false,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

/// Runs external commands on behalf of the probe and the installer
pub trait CommandRunner {
    /// Resolve an executable on the search path
    fn locate(&self, program: &str) -> Option<PathBuf>;

    /// Run a command to completion.
    ///
    /// Only a failure to start the process is an error; a non-zero exit
    /// is reported through [`CommandOutput::success`].
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput>;

    /// Whether mutating commands are actually executed
    fn is_dry_run(&self) -> bool {
        false
    }

    fn exists(&self, program: &str) -> bool {
        self.locate(program).is_some()
    }
}
