//! Install-if-absent provisioning
//!
//! Provides:
//! - Package manager selection per platform
//! - Plan construction from probed capabilities
//! - Sequential, idempotent execution with a per-step report

mod installer;
mod package_manager;
mod plan;
mod report;

pub use installer::*;
pub use package_manager::*;
pub use plan::*;
pub use report::*;
