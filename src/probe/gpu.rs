//! GPU presence probe via the vendor diagnostic tool

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::GpuSettings;
use crate::exec::{CommandRunner, CommandSpec};

/// Result of the GPU probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpuProbe {
    pub available: bool,

    /// Device names reported by the diagnostic tool
    #[serde(default)]
    pub devices: Vec<String>,

    /// Why the GPU path is (not) taken
    pub reason: String,
}

impl GpuProbe {
    fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            available: false,
            devices: vec![],
            reason: reason.into(),
        }
    }
}

/// Probe for a usable GPU.
///
/// The GPU counts as available only when the diagnostic command is on the
/// search path and exits successfully. Every other outcome selects the CPU path.
pub fn detect_gpu(runner: &dyn CommandRunner, settings: &GpuSettings) -> GpuProbe {
    if !settings.enable {
        return GpuProbe::unavailable("GPU probing disabled in configuration");
    }

    let command = settings.probe_command.as_str();
    if !runner.exists(command) {
        debug!(command, "GPU diagnostic tool not found");
        return GpuProbe::unavailable(format!("{} not found", command));
    }

    let spec = CommandSpec::query(command, settings.probe_args.iter().cloned());
    match runner.run(&spec) {
        Ok(out) if out.success => {
            let devices = parse_device_list(&out.stdout);
            info!(devices = devices.len(), "GPU detected");
            GpuProbe {
                available: true,
                devices,
                reason: format!("{} succeeded", command),
            }
        }
        Ok(out) => {
            debug!(command, code = ?out.code, stderr = %out.stderr.trim(), "GPU diagnostic failed");
            GpuProbe::unavailable(format!(
                "{} exited with status {}",
                command,
                out.code.map(|c| c.to_string()).unwrap_or_else(|| "unknown".to_string())
            ))
        }
        Err(e) => {
            debug!(command, error = %e, "GPU diagnostic could not run");
            GpuProbe::unavailable(format!("{} could not run: {}", command, e))
        }
    }
}

/// Extract device names from `nvidia-smi -L` style output
/// (`GPU 0: NVIDIA A100-SXM4-40GB (UUID: GPU-...)`)
fn parse_device_list(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .filter_map(|line| {
            let rest = line.trim().strip_prefix("GPU ")?;
            let (_, name) = rest.split_once(':')?;
            let name = match name.rfind(" (UUID") {
                Some(idx) => &name[..idx],
                None => name,
            };
            let name = name.trim();
            (!name.is_empty()).then(|| name.to_string())
        })
        .collect()
}
