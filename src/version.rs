//! `envboot version` output

use std::fmt;

/// What `build.rs` stamped into this binary
#[derive(Debug, Clone, Copy)]
pub struct BuildInfo {
    pub version: &'static str,
    /// Short hash, suffixed `-dirty` for uncommitted builds
    pub commit: &'static str,
    pub build_date: &'static str,
    pub target: &'static str,
}

impl BuildInfo {
    pub const fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            commit: env!("ENVBOOT_COMMIT"),
            build_date: env!("ENVBOOT_BUILD_DATE"),
            target: env!("ENVBOOT_TARGET"),
        }
    }

    /// e.g. "0.1.0-abc12345"
    pub fn full_version(&self) -> String {
        format!("{}-{}", self.version, self.commit)
    }
}

impl fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "envboot {}", self.full_version())?;
        writeln!(f)?;
        writeln!(f, "Build Information:")?;
        writeln!(f, "  Git Hash:   {}", self.commit)?;
        writeln!(f, "  Built:      {}", self.build_date)?;
        writeln!(f, "  Target:     {}", self.target)
    }
}

pub fn print_version() {
    print!("{}", BuildInfo::current());
}
