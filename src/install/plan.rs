//! Install plan construction
//!
//! A [`Plan`] is built from the probed [`Capabilities`] and the config
//! before anything runs, so it can be printed (`envboot plan`) or executed.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::{BootstrapConfig, LatexDistribution, SudoMode};
use crate::exec::CommandSpec;
use crate::probe::{Capabilities, OsKind};

use super::PackageManager;

/// How a step failure is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Failure aborts the run with a non-zero exit
    Core,
    /// Failure is logged and the run continues
    Optional,
}

/// How to tell a step's target is already installed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Presence {
    /// Executable on the search path
    Binary { program: String },
    /// `python -m pip show <distribution>` succeeds
    PythonPackage { interpreter: String, distribution: String },
    /// `kpsewhich <package>.sty` finds the style file
    TexPackage { package: String },
}

/// Condition that must hold at run time for a step to be attempted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Guard {
    Binary { program: String },
    File { path: PathBuf },
}

impl fmt::Display for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Guard::Binary { program } => write!(f, "{} not found", program),
            Guard::File { path } => write!(f, "{} does not exist", path.display()),
        }
    }
}

/// A tool that must exist before any step runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prerequisite {
    pub program: String,
    pub purpose: String,
    pub hint: Option<String>,
}

/// One install-if-absent operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub name: String,
    pub tier: Tier,
    pub guards: Vec<Guard>,
    pub presence: Option<Presence>,
    pub command: CommandSpec,
    /// Refreshes metadata instead of installing anything
    #[serde(default)]
    pub refresh: bool,
}

impl Step {
    fn new(name: impl Into<String>, tier: Tier, command: CommandSpec) -> Self {
        Self {
            name: name.into(),
            tier,
            guards: vec![],
            presence: None,
            command,
            refresh: false,
        }
    }

    fn refreshing(mut self) -> Self {
        self.refresh = true;
        self
    }

    fn present_if(mut self, presence: Presence) -> Self {
        self.presence = Some(presence);
        self
    }

    fn guarded_by(mut self, guard: Guard) -> Self {
        self.guards.push(guard);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Warning,
}

/// Something the user should know that is not a step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }
}

/// Ordered work for one bootstrap run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Plan {
    pub prerequisites: Vec<Prerequisite>,
    pub steps: Vec<Step>,
    pub notices: Vec<Notice>,
}

#[cfg(test)]
impl Plan {
    pub fn step(&self, name: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.name == name)
    }

    pub fn has_step(&self, name: &str) -> bool {
        self.step(name).is_some()
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Prerequisites:")?;
        for pre in &self.prerequisites {
            writeln!(f, "  {:<12} {}", pre.program, pre.purpose)?;
        }

        writeln!(f)?;
        writeln!(f, "Steps:")?;
        for (idx, step) in self.steps.iter().enumerate() {
            let tier = match step.tier {
                Tier::Core => "core",
                Tier::Optional => "optional",
            };
            writeln!(f, "  {:>2}. [{:<8}] {}", idx + 1, tier, step.name)?;
            writeln!(f, "      $ {}", step.command)?;
        }

        if !self.notices.is_empty() {
            writeln!(f)?;
            writeln!(f, "Notes:")?;
            for notice in &self.notices {
                let marker = match notice.level {
                    NoticeLevel::Info => "-",
                    NoticeLevel::Warning => "!",
                };
                writeln!(f, "  {} {}", marker, notice.message)?;
            }
        }
        Ok(())
    }
}

/// Strip version specifiers and extras from a pip requirement
/// (`pylatex>=1.4.0` → `pylatex`, `uvicorn[standard]` → `uvicorn`)
pub fn distribution_name(requirement: &str) -> &str {
    let end = requirement
        .find(|c: char| matches!(c, '<' | '>' | '=' | '!' | '~' | '[' | ';' | '@' | ' '))
        .unwrap_or(requirement.len());
    requirement[..end].trim()
}

fn pip_install<I, S>(interpreter: &str, args: I) -> CommandSpec
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut all: Vec<String> = vec!["-m".into(), "pip".into(), "install".into()];
    all.extend(args.into_iter().map(Into::into));
    CommandSpec::mutate(interpreter, all)
}

fn python_presence(interpreter: &str, requirement: &str) -> Presence {
    Presence::PythonPackage {
        interpreter: interpreter.to_string(),
        distribution: distribution_name(requirement).to_string(),
    }
}

/// Build the plan for this host
pub fn build_plan(caps: &Capabilities, config: &BootstrapConfig) -> Plan {
    let mut plan = Plan::default();
    let python = config.python.interpreter.as_str();
    let gpu = caps.gpu_available();

    let manager = match PackageManager::for_os(&caps.os) {
        Ok(pm) => Some(pm),
        Err(e) => {
            plan.notices.push(Notice::warning(format!(
                "{}. {} Continuing with Python packages.",
                e,
                e.suggestion().unwrap_or_default()
            )));
            None
        }
    };

    // ── Prerequisites ────────────────────────────────────────────
    if let Some(pm) = manager {
        plan.prerequisites.push(Prerequisite {
            program: pm.binary().to_string(),
            purpose: format!("{} package manager", caps.os),
            hint: pm.install_hint().map(str::to_string),
        });
    }

    let escalate = match manager {
        Some(pm) if pm.needs_privilege() => match config.system.sudo {
            SudoMode::Always => {
                plan.prerequisites.push(Prerequisite {
                    program: "sudo".to_string(),
                    purpose: "privilege escalation (system.sudo = always)".to_string(),
                    hint: None,
                });
                true
            }
            SudoMode::Never => false,
            SudoMode::Auto if caps.privileged => false,
            SudoMode::Auto if caps.sudo_available => true,
            SudoMode::Auto => {
                plan.notices.push(Notice::warning(
                    "Not running as root and sudo is unavailable; system package installs may fail",
                ));
                false
            }
        },
        _ => false,
    };
    let system = |spec: CommandSpec| if escalate { spec.with_sudo() } else { spec };

    plan.prerequisites.push(Prerequisite {
        program: python.to_string(),
        purpose: "Python package installer (pip)".to_string(),
        hint: Some("Install Python 3 with pip, or point python.interpreter at an existing one.".to_string()),
    });

    // ── System packages ──────────────────────────────────────────
    if let Some(pm) = manager {
        if config.system.update_index {
            if let Some(update) = pm.update_index_command() {
                plan.steps.push(Step::new("package index update", Tier::Core, system(update)).refreshing());
            }
        }

        plan.steps.push(
            Step::new("graphviz", Tier::Core, system(pm.install_command(&pm.graphviz())))
                .present_if(Presence::Binary { program: "dot".into() }),
        );
    }

    match config.latex.distribution {
        LatexDistribution::Native => {
            if let Some(pm) = manager {
                plan.steps.push(
                    Step::new("LaTeX distribution", Tier::Core, system(pm.install_command(&pm.latex())))
                        .present_if(Presence::Binary { program: "pdflatex".into() }),
                );
            }
        }
        LatexDistribution::Tinytex if manager.is_some() => {
            let script = format!("curl -sL \"{}\" | sh", config.latex.tinytex_url);
            plan.steps.push(
                Step::new("TinyTeX", Tier::Core, CommandSpec::mutate("sh", ["-c".to_string(), script]))
                    .present_if(Presence::Binary { program: "pdflatex".into() })
                    .guarded_by(Guard::Binary { program: "sh".into() })
                    .guarded_by(Guard::Binary { program: "curl".into() }),
            );
            plan.notices.push(Notice::info(
                "TinyTeX installs into ~/.TinyTeX; add its bin directory to PATH and restart the shell",
            ));
        }
        LatexDistribution::Tinytex => {}
        LatexDistribution::Skip => {
            plan.notices.push(Notice::info("LaTeX installation skipped (latex.distribution = skip)"));
        }
    }

    if gpu {
        match manager.and_then(|pm| pm.cuda_toolkit().map(|pkg| (pm, pkg))) {
            Some((pm, pkg)) => plan.steps.push(
                Step::new("CUDA toolkit", Tier::Optional, system(pm.install_command(&pkg)))
                    .present_if(Presence::Binary { program: "nvcc".into() }),
            ),
            None => plan
                .notices
                .push(Notice::info("No CUDA toolkit package for this platform; skipping")),
        }
    } else {
        plan.notices.push(Notice::info(format!(
            "No GPU detected ({}): skipping CUDA toolkit and GPU extras, installing CPU tensor build",
            caps.gpu.reason
        )));
    }

    if manager.is_some() && config.latex.distribution != LatexDistribution::Skip {
        for package in &config.latex.extra_packages {
            plan.steps.push(
                Step::new(
                    format!("LaTeX package {}", package),
                    Tier::Optional,
                    CommandSpec::mutate("tlmgr", ["install".to_string(), package.clone()]),
                )
                .present_if(Presence::TexPackage { package: package.clone() })
                .guarded_by(Guard::Binary { program: "tlmgr".into() }),
            );
        }
    }

    // ── Python packages ──────────────────────────────────────────
    let mut tensor_args: Vec<String> = config.python.tensor_packages.clone();
    let (variant, index_url) = if gpu {
        ("CUDA", Some(config.python.cuda_index_url.as_str()))
    } else if caps.os == OsKind::MacOs {
        // macOS wheels on PyPI are the CPU/MPS build
        ("CPU", None)
    } else {
        ("CPU", Some(config.python.cpu_index_url.as_str()))
    };
    if let Some(url) = index_url {
        tensor_args.push("--index-url".to_string());
        tensor_args.push(url.to_string());
    }
    if let Some(first) = config.python.tensor_packages.first() {
        plan.steps.push(
            Step::new(
                format!("tensor library ({})", variant),
                Tier::Core,
                pip_install(python, tensor_args),
            )
            .present_if(python_presence(python, first)),
        );
    }

    for requirement in &config.python.packages {
        plan.steps.push(
            Step::new(
                format!("python {}", distribution_name(requirement)),
                Tier::Core,
                pip_install(python, [requirement.as_str()]),
            )
            .present_if(python_presence(python, requirement)),
        );
    }

    if gpu {
        for requirement in &config.python.gpu_packages {
            plan.steps.push(
                Step::new(
                    format!("python {} (GPU extra)", distribution_name(requirement)),
                    Tier::Optional,
                    pip_install(python, [requirement.as_str()]),
                )
                .present_if(python_presence(python, requirement)),
            );
        }
    }

    // ── Smoke test ───────────────────────────────────────────────
    if config.smoke_test.enabled {
        let script = PathBuf::from(&config.smoke_test.script);
        plan.steps.push(
            Step::new(
                "smoke test",
                Tier::Optional,
                CommandSpec::mutate(python, [config.smoke_test.script.clone()]),
            )
            .guarded_by(Guard::File { path: script }),
        );
    }

    plan
}
