//! Build script for envboot
//!
//! Stamps the binary with the commit it was built from, the build date and
//! the target triple, shown by `envboot version` and in bug reports.

use std::env;
use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/index");

    let commit = match git(&["rev-parse", "--short=8", "HEAD"]) {
        Some(hash) if git(&["status", "--porcelain"]).is_some_and(|s| !s.is_empty()) => format!("{}-dirty", hash),
        Some(hash) => hash,
        None => "unknown".to_string(),
    };
    let built = chrono::Utc::now().format("%Y-%m-%d").to_string();
    let target = env::var("TARGET").unwrap_or_else(|_| "unknown".to_string());

    println!("cargo:rustc-env=ENVBOOT_COMMIT={}", commit);
    println!("cargo:rustc-env=ENVBOOT_BUILD_DATE={}", built);
    println!("cargo:rustc-env=ENVBOOT_TARGET={}", target);
}

/// Trimmed stdout of a successful git command
fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout).ok().map(|s| s.trim().to_string())
}
