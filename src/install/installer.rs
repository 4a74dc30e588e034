//! Sequential step execution

use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::exec::{CommandRunner, CommandSpec};

use super::{Guard, InstallReport, Plan, Presence, Step, StepOutcome, StepRecord, Tier};

/// Executes a [`Plan`] one step at a time
pub struct Installer<'a> {
    runner: &'a dyn CommandRunner,
}

impl<'a> Installer<'a> {
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        Self { runner }
    }

    /// Fail before any step runs if a required tool is missing
    pub fn check_prerequisites(&self, plan: &Plan) -> Result<()> {
        for pre in &plan.prerequisites {
            if self.runner.exists(&pre.program) {
                debug!(program = %pre.program, "Prerequisite found");
                continue;
            }
            error!(program = %pre.program, purpose = %pre.purpose, "Prerequisite missing");
            return Err(Error::missing_prerequisite(
                pre.program.as_str(),
                pre.purpose.as_str(),
                pre.hint.clone(),
            ));
        }
        Ok(())
    }

    /// Check prerequisites, then run every step in order.
    ///
    /// A failing core step stops the run and is returned as the error;
    /// optional failures are recorded and the run continues.
    pub fn run(&self, plan: &Plan, report: &mut InstallReport) -> Result<()> {
        self.check_prerequisites(plan)?;

        let total = plan.steps.len();
        for (idx, step) in plan.steps.iter().enumerate() {
            info!(step = %step.name, "[{}/{}] {}", idx + 1, total, step.name);
            let outcome = self.run_step(step);

            let abort = match &outcome {
                StepOutcome::Failed { exit_code, message } if step.tier == Tier::Core => Some(Error::InstallFailed {
                    step: step.name.clone(),
                    exit_code: *exit_code,
                    stderr: message.clone(),
                }),
                _ => None,
            };

            report.record(StepRecord {
                name: step.name.clone(),
                tier: step.tier,
                command: step.command.to_string(),
                outcome,
            });

            if let Some(err) = abort {
                error!(error = %err.format_for_log(), "Core step failed, aborting");
                return Err(err);
            }
        }
        Ok(())
    }

    fn run_step(&self, step: &Step) -> StepOutcome {
        if let Some(presence) = &step.presence {
            if self.is_present(presence) {
                info!(step = %step.name, "Already installed");
                return StepOutcome::AlreadyPresent;
            }
        }

        if let Some(unmet) = step.guards.iter().find(|g| !self.guard_holds(g)) {
            let reason = unmet.to_string();
            warn!(step = %step.name, %reason, "Skipping step");
            return StepOutcome::Skipped { reason };
        }

        let result = self.runner.run(&step.command);
        if self.runner.is_dry_run() {
            return StepOutcome::DryRun;
        }

        let (exit_code, message) = match result {
            Ok(out) if out.success && step.refresh => {
                info!(step = %step.name, "Refreshed");
                return StepOutcome::Refreshed;
            }
            Ok(out) if out.success => {
                info!(step = %step.name, "Installed");
                return StepOutcome::Completed;
            }
            Ok(out) => (out.code, last_line(&out.stderr)),
            Err(e) => (None, e.to_string()),
        };

        match step.tier {
            Tier::Core => error!(step = %step.name, command = %step.command, ?exit_code, %message, "Step failed"),
            Tier::Optional => warn!(
                step = %step.name,
                command = %step.command,
                ?exit_code,
                %message,
                "Optional step failed, continuing"
            ),
        }
        StepOutcome::Failed { exit_code, message }
    }

    fn guard_holds(&self, guard: &Guard) -> bool {
        match guard {
            Guard::Binary { program } => self.runner.exists(program),
            Guard::File { path } => path.is_file(),
        }
    }

    /// Presence checks never mutate the host, so they also run in dry-run mode
    fn is_present(&self, presence: &Presence) -> bool {
        match presence {
            Presence::Binary { program } => self.runner.exists(program),
            Presence::PythonPackage {
                interpreter,
                distribution,
            } => self.query_succeeds(CommandSpec::query(
                interpreter.as_str(),
                ["-m", "pip", "show", "-q", distribution.as_str()],
            )),
            Presence::TexPackage { package } => {
                self.runner.exists("kpsewhich")
                    && self.query_succeeds(CommandSpec::query("kpsewhich", [format!("{}.sty", package)]))
            }
        }
    }

    fn query_succeeds(&self, spec: CommandSpec) -> bool {
        match self.runner.run(&spec) {
            Ok(out) => out.success,
            Err(e) => {
                debug!(command = %spec, error = %e, "Presence check could not run");
                false
            }
        }
    }
}

fn last_line(stderr: &str) -> String {
    stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("non-zero exit status")
        .to_string()
}
