//! Error types for envboot
//!
//! Provides structured error handling with:
//! - Numeric error codes for machine parsing
//! - User-friendly messages with suggestions
//! - Exit codes for CLI

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for bootstrap operations
pub type Result<T> = std::result::Result<T, Error>;

/// Numeric error codes for machine parsing and documentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ErrorCode {
    // Configuration errors (1xx)
    ConfigNotFound = 100,
    ConfigParseError = 101,
    ConfigValidation = 102,

    // IO errors (2xx)
    IoRead = 200,
    IoWrite = 201,
    IoPermission = 202,
    IoNotFound = 203,

    // Prerequisite / platform errors (3xx)
    PrerequisiteMissing = 300,
    UnsupportedPlatform = 310,

    // Command execution errors (4xx)
    CommandSpawn = 400,
    InstallFailed = 401,

    // Internal errors (9xx)
    InternalError = 900,
}

impl ErrorCode {
    /// Get the string code (e.g., "E100")
    pub fn as_str(&self) -> String {
        format!("E{}", *self as u16)
    }

    /// Get the exit code for CLI (maps to 1-125 range)
    pub fn exit_code(&self) -> i32 {
        match *self as u16 {
            100..=199 => 10, // Config errors
            200..=299 => 20, // IO errors
            300..=399 => 30, // Prerequisite errors
            400..=499 => 40, // Command errors
            900..=999 => 90, // Internal errors
            _ => 1,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Main error type
#[derive(Error, Debug)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Configuration parse error
    #[error("Failed to parse configuration: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<toml::de::Error>,
    },

    /// Configuration validation error
    #[error("Configuration validation failed: {message}")]
    ConfigValidation { message: String, field: Option<String> },

    // ─────────────────────────────────────────────────────────────
    // IO Errors
    // ─────────────────────────────────────────────────────────────

    /// File read error
    #[error("Failed to read file: {path}")]
    IoRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File write error
    #[error("Failed to write file: {path}")]
    IoWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    Toml(#[from] toml::ser::Error),

    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // ─────────────────────────────────────────────────────────────
    // Prerequisite / Platform Errors
    // ─────────────────────────────────────────────────────────────

    /// A required tool (package manager, Python) is not installed
    #[error("Required program '{program}' not found ({purpose})")]
    MissingPrerequisite {
        program: String,
        purpose: String,
        hint: Option<String>,
    },

    /// Operation cannot be performed on this platform
    #[error("Unsupported platform: {name}")]
    UnsupportedPlatform { name: String },

    // ─────────────────────────────────────────────────────────────
    // Command Errors
    // ─────────────────────────────────────────────────────────────

    /// Process could not be started
    #[error("Failed to start '{program}'")]
    CommandSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// A core install step exited unsuccessfully
    #[error("Step '{step}' failed (exit status {})", status_text(.exit_code))]
    InstallFailed {
        step: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    // ─────────────────────────────────────────────────────────────
    // Internal Errors
    // ─────────────────────────────────────────────────────────────

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Get the numeric error code
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::ConfigNotFound { .. } => ErrorCode::ConfigNotFound,
            Error::ConfigParse { .. } => ErrorCode::ConfigParseError,
            Error::ConfigValidation { .. } => ErrorCode::ConfigValidation,

            Error::IoRead { .. } => ErrorCode::IoRead,
            Error::IoWrite { .. } => ErrorCode::IoWrite,
            Error::Io(e) => match e.kind() {
                std::io::ErrorKind::NotFound => ErrorCode::IoNotFound,
                std::io::ErrorKind::PermissionDenied => ErrorCode::IoPermission,
                _ => ErrorCode::IoRead,
            },
            Error::Toml(_) => ErrorCode::ConfigParseError,
            Error::Json(_) => ErrorCode::IoWrite,

            Error::MissingPrerequisite { .. } => ErrorCode::PrerequisiteMissing,
            Error::UnsupportedPlatform { .. } => ErrorCode::UnsupportedPlatform,

            Error::CommandSpawn { .. } => ErrorCode::CommandSpawn,
            Error::InstallFailed { .. } => ErrorCode::InstallFailed,

            Error::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Get the exit code for CLI
    pub fn exit_code(&self) -> i32 {
        self.code().exit_code()
    }

    /// Get a user-friendly suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Error::ConfigNotFound { .. } => Some(
                "Run 'envboot config init' to create a default configuration file.".to_string(),
            ),
            Error::ConfigParse { .. } => Some(
                "Check your configuration file syntax. Run 'envboot config validate' to see details."
                    .to_string(),
            ),
            Error::ConfigValidation { field: Some(field), .. } => {
                Some(format!("Fix the value of '{}' in your configuration file.", field))
            }
            Error::ConfigValidation { .. } => Some(
                "Review the configuration file and fix the invalid values.".to_string(),
            ),
            Error::MissingPrerequisite { hint: Some(hint), .. } => Some(hint.clone()),
            Error::MissingPrerequisite { program, .. } => Some(format!(
                "Install '{}' and make sure it is on your PATH, then re-run envboot.",
                program
            )),
            Error::UnsupportedPlatform { .. } => Some(
                "Install graphviz, a TeX distribution and the Python packages manually.".to_string(),
            ),
            Error::InstallFailed { .. } => Some(
                "Re-run with -v to see the full command output. Already installed components are kept."
                    .to_string(),
            ),
            _ => None,
        }
    }

    /// Format the error for terminal display with colors
    pub fn format_for_terminal(&self) -> String {
        let mut output = format!("\x1b[31mError [{}]\x1b[0m: {}\n", self.code().as_str(), self);

        if let Error::InstallFailed { stderr, .. } = self {
            let stderr = stderr.trim();
            if !stderr.is_empty() {
                output.push_str(&format!("\n{}\n", stderr));
            }
        }

        if let Some(hint) = self.suggestion() {
            output.push_str(&format!("\n\x1b[33mHint\x1b[0m: {}\n", hint));
        }

        output
    }

    /// Format the error for logging (no colors)
    pub fn format_for_log(&self) -> String {
        format!("[{}] {}", self.code().as_str(), self)
    }
}

fn status_text(code: &Option<i32>) -> String {
    code.map(|c| c.to_string()).unwrap_or_else(|| "unknown".to_string())
}

// ─────────────────────────────────────────────────────────────────
// Error Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    /// Create a config validation error
    pub fn config_validation(message: impl Into<String>) -> Self {
        Error::ConfigValidation {
            message: message.into(),
            field: None,
        }
    }

    /// Create a config validation error with field name
    pub fn config_field_invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ConfigValidation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a missing prerequisite error
    pub fn missing_prerequisite(
        program: impl Into<String>,
        purpose: impl Into<String>,
        hint: Option<String>,
    ) -> Self {
        Error::MissingPrerequisite {
            program: program.into(),
            purpose: purpose.into(),
            hint,
        }
    }
}
