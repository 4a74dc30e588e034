//! Operating system and Linux distribution detection

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Linux distribution families envboot knows how to provision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DistroFamily {
    /// Debian, Ubuntu and derivatives (apt)
    Debian,
    /// CentOS, RHEL, Amazon Linux and rebuilds (yum)
    RedHat,
    /// Fedora (dnf)
    Fedora,
}

impl DistroFamily {
    /// Map a single os-release token (ID, ID_LIKE entry or NAME word)
    fn from_token(token: &str) -> Option<Self> {
        match token {
            "ubuntu" | "debian" => Some(DistroFamily::Debian),
            "centos" | "rhel" | "amazon" | "amzn" => Some(DistroFamily::RedHat),
            "fedora" => Some(DistroFamily::Fedora),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DistroFamily::Debian => "Debian/Ubuntu",
            DistroFamily::RedHat => "CentOS/RHEL/Amazon Linux",
            DistroFamily::Fedora => "Fedora",
        }
    }
}

/// A recognised Linux distribution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distro {
    /// os-release ID (or the matched token when ID is missing)
    pub id: String,
    /// Human-readable name from PRETTY_NAME or NAME
    pub name: String,
    pub family: DistroFamily,
}

/// Host operating system classification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OsKind {
    MacOs,
    Linux(Distro),
    Unsupported { name: String },
}

impl OsKind {
    pub fn is_supported(&self) -> bool {
        !matches!(self, OsKind::Unsupported { .. })
    }
}

impl fmt::Display for OsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OsKind::MacOs => write!(f, "macOS"),
            OsKind::Linux(distro) => write!(f, "Linux ({}, {} family)", distro.name, distro.family.name()),
            OsKind::Unsupported { name } => write!(f, "unsupported ({})", name),
        }
    }
}

/// Parse os-release `KEY=value` lines.
///
/// Values may be single- or double-quoted; comments and blank lines are ignored.
pub fn parse_os_release(content: &str) -> HashMap<String, String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| {
            let value = value.trim();
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
                .unwrap_or(value);
            (key.trim().to_string(), value.to_string())
        })
        .collect()
}

/// Classify the host from its kernel name and os-release contents
///
/// `kernel` accepts both `uname -s` output (`Darwin`, `Linux`) and
/// `std::env::consts::OS` values (`macos`, `linux`).
pub fn classify(kernel: &str, os_release: Option<&str>) -> OsKind {
    match kernel.to_lowercase().as_str() {
        "darwin" | "macos" => OsKind::MacOs,
        "linux" => match os_release {
            Some(content) => classify_linux(&parse_os_release(content)),
            None => OsKind::Unsupported {
                name: "Linux (no os-release file)".to_string(),
            },
        },
        other => OsKind::Unsupported {
            name: other.to_string(),
        },
    }
}

fn classify_linux(fields: &HashMap<String, String>) -> OsKind {
    let lower = |key: &str| fields.get(key).map(|v| v.to_lowercase()).unwrap_or_default();
    let id = lower("ID");
    let id_like = lower("ID_LIKE");
    let name = lower("NAME");

    let display_name = fields
        .get("PRETTY_NAME")
        .or_else(|| fields.get("NAME"))
        .cloned()
        .unwrap_or_else(|| "Linux".to_string());

    // ID first, then what the distro declares itself to be like, then NAME words
    let tokens = std::iter::once(id.as_str())
        .chain(id_like.split_whitespace())
        .chain(name.split(|c: char| !c.is_ascii_alphanumeric()));

    for token in tokens.filter(|t| !t.is_empty()) {
        if let Some(family) = DistroFamily::from_token(token) {
            let id = if id.is_empty() { token.to_string() } else { id.clone() };
            return OsKind::Linux(Distro {
                id,
                name: display_name,
                family,
            });
        }
    }

    OsKind::Unsupported {
        name: format!("Linux ({})", display_name),
    }
}

/// Detect the running OS, reading `os_release_path` on Linux
pub fn detect_os(os_release_path: &Path) -> OsKind {
    let kernel = std::env::consts::OS;
    let os_release = if kernel == "linux" {
        match std::fs::read_to_string(os_release_path) {
            Ok(content) => Some(content),
            Err(e) => {
                warn!(path = %os_release_path.display(), error = %e, "Could not read os-release");
                None
            }
        }
    } else {
        None
    };

    let os = classify(kernel, os_release.as_deref());
    debug!(kernel, os = %os, "Operating system classified");
    os
}
