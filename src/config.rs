//! Configuration system for envboot
//!
//! Supports multiple configuration sources with the following precedence (highest to lowest):
//! 1. CLI arguments
//! 2. Environment variables (ENVBOOT_* prefix)
//! 3. Configuration file (TOML)
//! 4. Default values

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Main bootstrap configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Host detection and system package manager settings
    pub system: SystemSettings,

    /// GPU probe settings
    pub gpu: GpuSettings,

    /// LaTeX toolchain settings
    pub latex: LatexSettings,

    /// Python package settings
    pub python: PythonSettings,

    /// Post-install smoke test
    pub smoke_test: SmokeTestSettings,

    /// Logging configuration
    pub logging: LoggingSettings,
}

/// When to prefix system package manager calls with `sudo`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SudoMode {
    /// Use sudo when not root and sudo is installed
    Auto,
    Always,
    Never,
}

impl std::str::FromStr for SudoMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(SudoMode::Auto),
            "always" => Ok(SudoMode::Always),
            "never" => Ok(SudoMode::Never),
            other => Err(Error::config_field_invalid(
                "system.sudo",
                format!("Invalid sudo mode '{}'. Must be one of: auto, always, never", other),
            )),
        }
    }
}

/// Which TeX distribution to provision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LatexDistribution {
    /// The platform package manager's TeX Live / BasicTeX
    Native,
    /// TinyTeX via its upstream install script
    Tinytex,
    /// Leave LaTeX alone
    Skip,
}

impl std::str::FromStr for LatexDistribution {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "native" => Ok(LatexDistribution::Native),
            "tinytex" => Ok(LatexDistribution::Tinytex),
            "skip" => Ok(LatexDistribution::Skip),
            other => Err(Error::config_field_invalid(
                "latex.distribution",
                format!(
                    "Invalid LaTeX distribution '{}'. Must be one of: native, tinytex, skip",
                    other
                ),
            )),
        }
    }
}

/// Host detection and system package manager settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemSettings {
    /// os-release file used for Linux distro detection
    pub os_release_path: String,

    /// Colon-separated directories searched for executables (None = $PATH)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_path: Option<String>,

    /// Privilege escalation for system package installs
    pub sudo: SudoMode,

    /// Refresh the package index before installing (apt only)
    pub update_index: bool,
}

/// GPU probe settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GpuSettings {
    /// Probe for a GPU at all (false = always CPU path)
    pub enable: bool,

    /// GPU diagnostic command
    pub probe_command: String,

    /// Arguments passed to the diagnostic command
    pub probe_args: Vec<String>,
}

/// LaTeX toolchain settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LatexSettings {
    /// Distribution to install when pdflatex is missing
    pub distribution: LatexDistribution,

    /// TinyTeX installer script URL
    pub tinytex_url: String,

    /// Extra packages installed with tlmgr (best effort)
    pub extra_packages: Vec<String>,
}

/// Python package settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PythonSettings {
    /// Python interpreter used to run `-m pip`
    pub interpreter: String,

    /// Tensor library packages (installed from the CPU or CUDA index)
    pub tensor_packages: Vec<String>,

    /// Package index for the CPU tensor build
    pub cpu_index_url: String,

    /// Package index for the CUDA tensor build
    pub cuda_index_url: String,

    /// Core packages (web demo UI, document generation helpers)
    pub packages: Vec<String>,

    /// GPU-accelerated extras (best effort, GPU hosts only)
    pub gpu_packages: Vec<String>,
}

/// Post-install smoke test
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmokeTestSettings {
    /// Run the smoke test after installing
    pub enabled: bool,

    /// Script run with the Python interpreter
    pub script: String,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level: trace, debug, info, warn, error
    pub level: String,

    /// Log file path (empty = no file logging)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    /// Number of rotated log files to keep
    pub max_files: u32,

    /// Enable JSON formatted logging
    pub json_format: bool,
}

// Default implementations

impl Default for SystemSettings {
    fn default() -> Self {
        Self {
            os_release_path: "/etc/os-release".to_string(),
            search_path: None,
            sudo: SudoMode::Auto,
            update_index: true,
        }
    }
}

impl Default for GpuSettings {
    fn default() -> Self {
        Self {
            enable: true,
            probe_command: "nvidia-smi".to_string(),
            probe_args: vec!["-L".to_string()],
        }
    }
}

impl Default for LatexSettings {
    fn default() -> Self {
        Self {
            distribution: LatexDistribution::Native,
            tinytex_url: "https://yihui.org/tinytex/install-bin-unix.sh".to_string(),
            extra_packages: [
                "fancyhdr",
                "geometry",
                "xcolor",
                "booktabs",
                "float",
                "caption",
                "hyperref",
                "listings",
                "algorithm2e",
                "algorithmicx",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl Default for PythonSettings {
    fn default() -> Self {
        Self {
            interpreter: "python3".to_string(),
            tensor_packages: vec![
                "torch".to_string(),
                "torchvision".to_string(),
                "torchaudio".to_string(),
            ],
            cpu_index_url: "https://download.pytorch.org/whl/cpu".to_string(),
            cuda_index_url: "https://download.pytorch.org/whl/cu121".to_string(),
            packages: [
                "gradio",
                "pylatex>=1.4.0",
                "nbconvert>=7.0.0",
                "pypandoc",
                "bibtexparser",
                "plumbum",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            gpu_packages: vec!["cupy-cuda12x".to_string()],
        }
    }
}

impl Default for SmokeTestSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            script: "smoke_test.py".to_string(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            max_files: 5,
            json_format: false,
        }
    }
}

impl BootstrapConfig {
    /// Load configuration from file with environment variable overrides
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut config = Self::default();

        // 1. Load from config file if it exists
        if let Some(path) = Self::find_config_file(config_path)? {
            debug!(path = %path.display(), "Loading configuration file");
            let content = fs::read_to_string(&path).map_err(|e| Error::IoRead {
                path: path.clone(),
                source: e,
            })?;
            config = toml::from_str(&content).map_err(|e| Error::ConfigParse {
                message: format!("{}: {}", path.display(), e.message()),
                source: Some(e),
            })?;
            info!(path = %path.display(), "Configuration loaded from file");
        }

        // 2. Apply environment variable overrides
        config.apply_env_overrides()?;

        // 3. Expand paths
        config.expand_paths();

        // 4. Validate
        config.validate()?;

        Ok(config)
    }

    /// Find the configuration file to use
    fn find_config_file(explicit_path: Option<&str>) -> Result<Option<PathBuf>> {
        // If explicit path provided, use it (error if not found)
        if let Some(path) = explicit_path {
            let path = PathBuf::from(expand_path(path));
            if path.exists() {
                return Ok(Some(path));
            }
            return Err(Error::ConfigNotFound { path });
        }

        let search_paths = [
            PathBuf::from("envboot.toml"),
            dirs::config_dir()
                .map(|p| p.join("envboot").join("config.toml"))
                .unwrap_or_default(),
            dirs::home_dir()
                .map(|p| p.join(".envboot").join("config.toml"))
                .unwrap_or_default(),
            PathBuf::from("/etc/envboot/config.toml"),
        ];

        for path in &search_paths {
            if !path.as_os_str().is_empty() && path.exists() {
                debug!(path = %path.display(), "Found configuration file");
                return Ok(Some(path.clone()));
            }
        }

        debug!("No configuration file found, using defaults");
        Ok(None)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        // System settings
        if let Ok(val) = std::env::var("ENVBOOT_OS_RELEASE") {
            self.system.os_release_path = val;
        }
        if let Ok(val) = std::env::var("ENVBOOT_SEARCH_PATH") {
            self.system.search_path = Some(val);
        }
        if let Ok(val) = std::env::var("ENVBOOT_SUDO") {
            self.system.sudo = val.parse()?;
        }

        // GPU settings
        if let Ok(val) = std::env::var("ENVBOOT_GPU_ENABLE") {
            self.gpu.enable = parse_bool(&val);
        }
        if let Ok(val) = std::env::var("ENVBOOT_GPU_PROBE") {
            // Configured arguments belong to the configured tool
            if val != self.gpu.probe_command {
                self.gpu.probe_args.clear();
            }
            self.gpu.probe_command = val;
        }
        if let Ok(val) = std::env::var("ENVBOOT_GPU_PROBE_ARGS") {
            self.gpu.probe_args = val.split_whitespace().map(str::to_string).collect();
        }

        // LaTeX settings
        if let Ok(val) = std::env::var("ENVBOOT_LATEX") {
            self.latex.distribution = val.parse()?;
        }

        // Python settings
        if let Ok(val) = std::env::var("ENVBOOT_PYTHON") {
            self.python.interpreter = val;
        }
        if let Ok(val) = std::env::var("ENVBOOT_TORCH_CPU_INDEX") {
            self.python.cpu_index_url = val;
        }
        if let Ok(val) = std::env::var("ENVBOOT_TORCH_CUDA_INDEX") {
            self.python.cuda_index_url = val;
        }

        // Smoke test
        if let Ok(val) = std::env::var("ENVBOOT_SMOKE_TEST") {
            self.smoke_test.apply_override(&val);
        }

        // Logging settings
        if let Ok(val) = std::env::var("ENVBOOT_LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Ok(val) = std::env::var("ENVBOOT_LOG_FILE") {
            self.logging.file = Some(val);
        }
        if let Ok(val) = std::env::var("ENVBOOT_LOG_JSON") {
            self.logging.json_format = parse_bool(&val);
        }

        Ok(())
    }

    /// Expand ~ and environment variables in paths
    fn expand_paths(&mut self) {
        self.system.os_release_path = expand_path(&self.system.os_release_path);
        self.smoke_test.script = expand_path(&self.smoke_test.script);

        if let Some(ref file) = self.logging.file {
            self.logging.file = Some(expand_path(file));
        }
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        if self.python.interpreter.trim().is_empty() {
            return Err(Error::config_field_invalid(
                "python.interpreter",
                "Python interpreter cannot be empty",
            ));
        }

        if self.python.tensor_packages.is_empty() {
            return Err(Error::config_field_invalid(
                "python.tensor_packages",
                "At least one tensor package is required",
            ));
        }

        for (field, url) in [
            ("python.cpu_index_url", &self.python.cpu_index_url),
            ("python.cuda_index_url", &self.python.cuda_index_url),
            ("latex.tinytex_url", &self.latex.tinytex_url),
        ] {
            if !url.starts_with("https://") && !url.starts_with("http://") {
                return Err(Error::config_field_invalid(
                    field,
                    format!("'{}' must start with http:// or https://", url),
                ));
            }
        }

        if self.gpu.enable && self.gpu.probe_command.trim().is_empty() {
            return Err(Error::config_field_invalid(
                "gpu.probe_command",
                "GPU probe command cannot be empty while gpu.enable is true",
            ));
        }

        if self.smoke_test.enabled && self.smoke_test.script.trim().is_empty() {
            return Err(Error::config_field_invalid(
                "smoke_test.script",
                "Smoke test script cannot be empty while smoke_test.enabled is true",
            ));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(Error::config_field_invalid(
                "logging.level",
                format!(
                    "Invalid log level '{}'. Must be one of: {}",
                    self.logging.level,
                    valid_levels.join(", ")
                ),
            ));
        }

        Ok(())
    }

    /// The os-release file as a path
    pub fn os_release_path(&self) -> &Path {
        Path::new(&self.system.os_release_path)
    }
}

fn parse_bool(val: &str) -> bool {
    val.eq_ignore_ascii_case("true") || val == "1"
}

fn parse_false(val: &str) -> bool {
    val.is_empty() || val.eq_ignore_ascii_case("false") || val == "0"
}

impl SmokeTestSettings {
    /// `ENVBOOT_SMOKE_TEST` is a switch, or a script path that also enables
    fn apply_override(&mut self, val: &str) {
        if parse_false(val) {
            self.enabled = false;
        } else {
            self.enabled = true;
            if !parse_bool(val) {
                self.script = val.to_string();
            }
        }
    }
}

/// Expand ~ and environment variables in paths
fn expand_path(path: &str) -> String {
    shellexpand::full(path)
        .unwrap_or(std::borrow::Cow::Borrowed(path))
        .into_owned()
}

/// Initialize a new configuration file
pub fn init_config(path: Option<&str>, force: bool) -> Result<PathBuf> {
    let config_path = path
        .map(|p| PathBuf::from(expand_path(p)))
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".envboot")
                .join("config.toml")
        });

    if config_path.exists() && !force {
        return Err(Error::config_validation(format!(
            "Configuration file already exists: {}. Use --force to overwrite.",
            config_path.display()
        )));
    }

    if let Some(parent) = config_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| Error::IoWrite {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
    }

    fs::write(&config_path, generate_default_config()).map_err(|e| Error::IoWrite {
        path: config_path.clone(),
        source: e,
    })?;

    Ok(config_path)
}

/// Generate default configuration content with comments
fn generate_default_config() -> String {
    r#"# envboot configuration

[system]
# os-release file used to detect the Linux distribution
os_release_path = "/etc/os-release"

# Directories searched for executables (default: $PATH)
# search_path = "/usr/local/bin:/usr/bin:/bin"

# Prefix system package installs with sudo: auto, always, never
sudo = "auto"

# Refresh the package index before installing (apt only)
update_index = true

[gpu]
# Probe for a GPU (false = always install the CPU tensor build)
enable = true

# GPU diagnostic command; the GPU counts as present when it exits successfully
probe_command = "nvidia-smi"
probe_args = ["-L"]

[latex]
# TeX distribution to install when pdflatex is missing: native, tinytex, skip
distribution = "native"

tinytex_url = "https://yihui.org/tinytex/install-bin-unix.sh"

# Installed with tlmgr when available; failures only warn
extra_packages = ["fancyhdr", "geometry", "xcolor", "booktabs", "float", "caption", "hyperref", "listings", "algorithm2e", "algorithmicx"]

[python]
interpreter = "python3"

# Installed from cpu_index_url, or cuda_index_url when a GPU is detected
tensor_packages = ["torch", "torchvision", "torchaudio"]
cpu_index_url = "https://download.pytorch.org/whl/cpu"
cuda_index_url = "https://download.pytorch.org/whl/cu121"

# Core packages; a failed install aborts the run
packages = ["gradio", "pylatex>=1.4.0", "nbconvert>=7.0.0", "pypandoc", "bibtexparser", "plumbum"]

# GPU-accelerated extras; failures only warn
gpu_packages = ["cupy-cuda12x"]

[smoke_test]
enabled = true
script = "smoke_test.py"

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log file path (comment out to disable file logging)
# file = "~/.envboot/logs/envboot.log"

# Number of rotated log files to keep
max_files = 5

# Enable JSON formatted logging
json_format = false
"#
    .to_string()
}
