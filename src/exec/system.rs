//! Runners that talk to the real host

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Command;

use tracing::{debug, info, trace};

use crate::error::{Error, Result};

use super::{CommandOutput, CommandRunner, CommandSpec};

/// Spawns processes synchronously, resolving programs via `which`
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    search_path: Option<OsString>,
}

impl SystemRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict executable lookup to the given colon-separated directories
    pub fn with_search_path(search_path: impl Into<OsString>) -> Self {
        Self {
            search_path: Some(search_path.into()),
        }
    }
}

impl CommandRunner for SystemRunner {
    fn locate(&self, program: &str) -> Option<PathBuf> {
        let found = match self.search_path {
            Some(ref paths) => {
                let cwd = std::env::current_dir().ok()?;
                which::which_in(program, Some(paths), cwd).ok()
            }
            None => which::which(program).ok(),
        };
        trace!(program, found = ?found, "Executable lookup");
        found
    }

    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        // With a custom search path the child must not fall back to $PATH
        let executable = match self.search_path {
            Some(_) => self.locate(&spec.program).ok_or_else(|| Error::CommandSpawn {
                program: spec.program.clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not on search path"),
            })?,
            None => PathBuf::from(&spec.program),
        };

        debug!(command = %spec, "Running command");

        let output = Command::new(&executable)
            .args(&spec.args)
            .output()
            .map_err(|e| Error::CommandSpawn {
                program: spec.program.clone(),
                source: e,
            })?;

        let result = CommandOutput {
            code: output.status.code(),
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        trace!(
            command = %spec,
            code = ?result.code,
            stdout = %result.stdout.trim(),
            stderr = %result.stderr.trim(),
            "Command finished"
        );

        Ok(result)
    }
}

/// Executes queries for real but only logs mutating commands
#[derive(Debug, Clone, Default)]
pub struct DryRunRunner<R = SystemRunner> {
    inner: R,
}

impl<R: CommandRunner> DryRunRunner<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    #[cfg(test)]
    pub fn inner(&self) -> &R {
        &self.inner
    }
}

impl<R: CommandRunner> CommandRunner for DryRunRunner<R> {
    fn locate(&self, program: &str) -> Option<PathBuf> {
        self.inner.locate(program)
    }

    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        if spec.is_mutating() {
            info!(command = %spec, "[dry-run] would run");
            return Ok(CommandOutput::ok());
        }
        self.inner.run(spec)
    }

    fn is_dry_run(&self) -> bool {
        true
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    fn write_script(dir: &TempDir, name: &str, body: &str) {
        let path = dir.path().join(name);
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[test]
    fn test_locate_respects_search_path() {
        let dir = TempDir::new().unwrap();
        write_script(&dir, "fake-tool", "exit 0");

        let runner = SystemRunner::with_search_path(dir.path().as_os_str());
        assert!(runner.exists("fake-tool"));
        assert!(!runner.exists("definitely-not-installed-xyz"));
    }

    #[test]
    fn test_run_captures_output_and_status() {
        let dir = TempDir::new().unwrap();
        write_script(&dir, "say", "echo \"hello $1\"\necho oops >&2\nexit 3");

        let runner = SystemRunner::with_search_path(dir.path().as_os_str());
        let out = runner.run(&CommandSpec::query("say", ["world"])).unwrap();

        assert!(!out.success);
        assert_eq!(out.code, Some(3));
        assert_eq!(out.stdout.trim(), "hello world");
        assert_eq!(out.stderr.trim(), "oops");
    }

    #[test]
    fn test_run_missing_program_is_spawn_error() {
        let dir = TempDir::new().unwrap();
        let runner = SystemRunner::with_search_path(dir.path().as_os_str());
        let err = runner.run(&CommandSpec::query("nope", Vec::<String>::new())).unwrap_err();
        assert!(matches!(err, Error::CommandSpawn { .. }));
    }

    #[test]
    fn test_dry_run_skips_mutations() {
        let dir = TempDir::new().unwrap();
        let marker = dir.path().join("touched");
        write_script(&dir, "installer", &format!("touch {}", marker.display()));

        let runner = DryRunRunner::new(SystemRunner::with_search_path(dir.path().as_os_str()));
        let out = runner.run(&CommandSpec::mutate("installer", Vec::<String>::new())).unwrap();

        assert!(out.success);
        assert!(runner.is_dry_run());
        assert!(!marker.exists());

        // Queries still execute
        runner.run(&CommandSpec::query("installer", Vec::<String>::new())).unwrap();
        assert!(marker.exists());
    }
}
