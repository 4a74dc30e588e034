//! Host capability probe
//!
//! Provides:
//! - OS / Linux distribution classification from os-release
//! - GPU presence via the vendor diagnostic tool
//! - Privilege detection for system package installs

mod gpu;
mod os;

pub use gpu::*;
pub use os::*;

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::BootstrapConfig;
use crate::exec::{CommandRunner, CommandSpec};

/// Everything the installer needs to know about the host
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Capabilities {
    pub os: OsKind,
    pub gpu: GpuProbe,

    /// Running as root (no sudo needed)
    pub privileged: bool,

    /// `sudo` is on the search path
    pub sudo_available: bool,

    pub hostname: String,
    pub arch: String,
    pub cpu_count: usize,
}

impl Capabilities {
    pub fn gpu_available(&self) -> bool {
        self.gpu.available
    }
}

impl fmt::Display for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Host:       {} ({}, {} CPUs)", self.hostname, self.arch, self.cpu_count)?;
        writeln!(f, "OS:         {}", self.os)?;
        if self.gpu.available {
            writeln!(f, "GPU:        available ({})", self.gpu.reason)?;
            for device in &self.gpu.devices {
                writeln!(f, "            - {}", device)?;
            }
        } else {
            writeln!(f, "GPU:        not available ({})", self.gpu.reason)?;
        }
        writeln!(f, "Privileged: {}", if self.privileged { "yes (root)" } else { "no" })?;
        Ok(())
    }
}

/// Whether the current user is root, via `id -u`
pub fn detect_privilege(runner: &dyn CommandRunner) -> bool {
    if !runner.exists("id") {
        return false;
    }
    match runner.run(&CommandSpec::query("id", ["-u"])) {
        Ok(out) if out.success => out.stdout.trim() == "0",
        Ok(_) | Err(_) => false,
    }
}

/// Probe the host
pub fn probe(runner: &dyn CommandRunner, config: &BootstrapConfig) -> Capabilities {
    let os = detect_os(config.os_release_path());
    let gpu = detect_gpu(runner, &config.gpu);
    let privileged = detect_privilege(runner);
    let sudo_available = runner.exists("sudo");

    let caps = Capabilities {
        os,
        gpu,
        privileged,
        sudo_available,
        hostname: hostname::get()
            .map(|h| h.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "unknown".to_string()),
        arch: std::env::consts::ARCH.to_string(),
        cpu_count: num_cpus::get(),
    };

    info!(
        os = %caps.os,
        gpu = caps.gpu.available,
        privileged = caps.privileged,
        "Host probed"
    );
    debug!(gpu_reason = %caps.gpu.reason, devices = ?caps.gpu.devices, "GPU probe detail");
    if !caps.os.is_supported() {
        warn!(os = %caps.os, "No system package manager support for this platform");
    }

    caps
}
