//! Scripted runner for unit tests

use std::collections::HashSet;
use std::path::PathBuf;

use parking_lot::Mutex;

use crate::error::{Error, Result};

use super::{CommandOutput, CommandRunner, CommandSpec};

/// Records every command and answers from a script of canned outputs.
///
/// Programs not registered with [`MockRunner::with_program`] are absent:
/// `locate` returns None and `run` fails to spawn them.
#[derive(Default)]
pub struct MockRunner {
    programs: HashSet<String>,
    responses: Vec<(String, CommandOutput)>,
    calls: Mutex<Vec<CommandSpec>>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_program(mut self, program: &str) -> Self {
        self.programs.insert(program.to_string());
        self
    }

    pub fn with_programs(mut self, programs: &[&str]) -> Self {
        self.programs.extend(programs.iter().map(|p| p.to_string()));
        self
    }

    /// Answer commands whose rendered form starts with `prefix`.
    /// Later registrations win.
    pub fn respond(mut self, prefix: &str, output: CommandOutput) -> Self {
        self.responses.push((prefix.to_string(), output));
        self
    }

    /// Every command run so far, rendered
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().iter().map(|c| c.to_string()).collect()
    }

    /// Rendered mutating commands run so far
    pub fn mutations(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.is_mutating())
            .map(|c| c.to_string())
            .collect()
    }
}

impl CommandRunner for MockRunner {
    fn locate(&self, program: &str) -> Option<PathBuf> {
        self.programs
            .contains(program)
            .then(|| PathBuf::from("/mock/bin").join(program))
    }

    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        self.calls.lock().push(spec.clone());

        if !self.programs.contains(&spec.program) {
            return Err(Error::CommandSpawn {
                program: spec.program.clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "mock: not installed"),
            });
        }

        let rendered = spec.to_string();
        let scripted = self
            .responses
            .iter()
            .rev()
            .find(|(prefix, _)| rendered.starts_with(prefix.as_str()))
            .map(|(_, out)| out.clone());

        // Unscripted queries fail (tool/package absent), mutations succeed
        Ok(scripted.unwrap_or_else(|| {
            if spec.is_mutating() {
                CommandOutput::ok()
            } else {
                CommandOutput::failed(1, "")
            }
        }))
    }
}
