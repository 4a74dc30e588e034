//! Platform package manager dispatch

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::exec::CommandSpec;
use crate::probe::{DistroFamily, OsKind};

const HOMEBREW_HINT: &str = "Install Homebrew first: /bin/bash -c \"$(curl -fsSL https://raw.githubusercontent.com/Homebrew/install/HEAD/install.sh)\"";

/// Native package managers envboot can drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PackageManager {
    Homebrew,
    Apt,
    Yum,
    Dnf,
}

/// A set of native packages installed by one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativePackage {
    pub names: Vec<&'static str>,
    /// Homebrew cask rather than formula
    pub cask: bool,
}

impl NativePackage {
    fn formula(names: &[&'static str]) -> Self {
        Self {
            names: names.to_vec(),
            cask: false,
        }
    }

    fn cask(name: &'static str) -> Self {
        Self {
            names: vec![name],
            cask: true,
        }
    }
}

impl PackageManager {
    /// Select the package manager for a classified host
    pub fn for_os(os: &OsKind) -> Result<Self> {
        match os {
            OsKind::MacOs => Ok(PackageManager::Homebrew),
            OsKind::Linux(distro) => Ok(match distro.family {
                DistroFamily::Debian => PackageManager::Apt,
                DistroFamily::RedHat => PackageManager::Yum,
                DistroFamily::Fedora => PackageManager::Dnf,
            }),
            OsKind::Unsupported { name } => Err(Error::UnsupportedPlatform { name: name.clone() }),
        }
    }

    /// Executable that must be on the search path
    pub fn binary(&self) -> &'static str {
        match self {
            PackageManager::Homebrew => "brew",
            PackageManager::Apt => "apt-get",
            PackageManager::Yum => "yum",
            PackageManager::Dnf => "dnf",
        }
    }

    /// Homebrew refuses to run as root; the Linux managers need it
    pub fn needs_privilege(&self) -> bool {
        !matches!(self, PackageManager::Homebrew)
    }

    /// Guidance shown when the manager itself is missing
    pub fn install_hint(&self) -> Option<&'static str> {
        match self {
            PackageManager::Homebrew => Some(HOMEBREW_HINT),
            _ => None,
        }
    }

    /// Package index refresh, for managers that need one before installing
    pub fn update_index_command(&self) -> Option<CommandSpec> {
        match self {
            PackageManager::Apt => Some(CommandSpec::mutate("apt-get", ["update"])),
            _ => None,
        }
    }

    /// Non-interactive install command
    pub fn install_command(&self, package: &NativePackage) -> CommandSpec {
        let mut args: Vec<String> = vec!["install".to_string()];
        match self {
            PackageManager::Homebrew => {
                if package.cask {
                    args.push("--cask".to_string());
                }
            }
            PackageManager::Apt | PackageManager::Yum | PackageManager::Dnf => {
                args.push("-y".to_string());
            }
        }
        args.extend(package.names.iter().map(|n| n.to_string()));
        CommandSpec::mutate(self.binary(), args)
    }

    /// Graph rendering toolkit (provides `dot`)
    pub fn graphviz(&self) -> NativePackage {
        NativePackage::formula(&["graphviz"])
    }

    /// TeX distribution (provides `pdflatex`)
    pub fn latex(&self) -> NativePackage {
        match self {
            PackageManager::Homebrew => NativePackage::cask("basictex"),
            PackageManager::Apt => NativePackage::formula(&[
                "texlive-latex-base",
                "texlive-latex-extra",
                "texlive-fonts-recommended",
            ]),
            PackageManager::Yum | PackageManager::Dnf => {
                NativePackage::formula(&["texlive-latex", "texlive-latex-extra"])
            }
        }
    }

    /// CUDA compiler toolchain (provides `nvcc`); not offered on macOS
    pub fn cuda_toolkit(&self) -> Option<NativePackage> {
        match self {
            PackageManager::Homebrew => None,
            PackageManager::Apt => Some(NativePackage::formula(&["nvidia-cuda-toolkit"])),
            PackageManager::Yum | PackageManager::Dnf => Some(NativePackage::formula(&["cuda-toolkit"])),
        }
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.binary())
    }
}
