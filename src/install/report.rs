//! Per-run outcome record

use std::fmt;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::probe::Capabilities;

use super::{Notice, Tier};

/// What happened to one step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepOutcome {
    Completed,
    /// Package metadata refreshed; nothing installed
    Refreshed,
    AlreadyPresent,
    Skipped { reason: String },
    Failed { exit_code: Option<i32>, message: String },
    DryRun,
}

impl StepOutcome {
    fn label(&self) -> &'static str {
        match self {
            StepOutcome::Completed => "installed",
            StepOutcome::Refreshed => "refreshed",
            StepOutcome::AlreadyPresent => "present",
            StepOutcome::Skipped { .. } => "skipped",
            StepOutcome::Failed { .. } => "FAILED",
            StepOutcome::DryRun => "would run",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub name: String,
    pub tier: Tier,
    pub command: String,
    #[serde(flatten)]
    pub outcome: StepOutcome,
}

/// Summary of one `install` run, optionally written as JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub dry_run: bool,
    pub capabilities: Capabilities,
    pub notices: Vec<Notice>,
    pub records: Vec<StepRecord>,
}

impl InstallReport {
    pub fn new(capabilities: Capabilities, notices: Vec<Notice>, dry_run: bool) -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            dry_run,
            capabilities,
            notices,
            records: Vec::new(),
        }
    }

    pub fn record(&mut self, record: StepRecord) {
        self.records.push(record);
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    #[cfg(test)]
    pub fn outcome(&self, step: &str) -> Option<&StepOutcome> {
        self.records.iter().find(|r| r.name == step).map(|r| &r.outcome)
    }

    fn count(&self, pred: impl Fn(&StepOutcome) -> bool) -> usize {
        self.records.iter().filter(|r| pred(&r.outcome)).count()
    }

    /// Steps that failed without aborting the run
    pub fn optional_failures(&self) -> usize {
        self.count(|o| matches!(o, StepOutcome::Failed { .. }))
    }

    /// One-line summary for the terminal
    pub fn summary(&self) -> String {
        let installed = self.count(|o| matches!(o, StepOutcome::Completed));
        let present = self.count(|o| matches!(o, StepOutcome::AlreadyPresent));
        let skipped = self.count(|o| matches!(o, StepOutcome::Skipped { .. }));
        let failed = self.optional_failures();
        if self.dry_run {
            let planned = self.count(|o| matches!(o, StepOutcome::DryRun));
            format!(
                "Dry run: {} to install, {} already present, {} skipped",
                planned, present, skipped
            )
        } else {
            format!(
                "{} installed, {} already present, {} skipped, {} failed",
                installed, present, skipped, failed
            )
        }
    }

    /// Write the report as pretty JSON
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).map_err(|e| Error::IoWrite {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

impl fmt::Display for InstallReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for record in &self.records {
            write!(f, "  {:<10} {}", record.outcome.label(), record.name)?;
            match &record.outcome {
                StepOutcome::Skipped { reason } => write!(f, " ({})", reason)?,
                StepOutcome::Failed { message, .. } => write!(f, " ({})", message)?,
                _ => {}
            }
            writeln!(f)?;
        }
        write!(f, "{}", self.summary())
    }
}
