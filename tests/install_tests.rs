//! End-to-end install tests
//!
//! Runs the real binary against a fake Linux host whose package managers
//! are logging shell scripts (see `common::FakeHost`).

#![cfg(target_os = "linux")]

mod common;

use std::fs;

use common::FakeHost;
use predicates::prelude::*;

const NVIDIA_SMI_OK: &str = "echo 'GPU 0: NVIDIA GeForce RTX 4090 (UUID: GPU-0000)'\nexit 0";

// ─────────────────────────────────────────────────────────────────
// Fresh Host
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_bare_invocation_installs_cpu_stack_on_ubuntu() {
    let host = FakeHost::ubuntu();

    host.envboot().assert().success();

    let installs = host.installs();
    assert_eq!(installs[0], "apt-get update");
    assert_eq!(installs[1], "apt-get install -y graphviz");
    assert!(installs[2].starts_with("apt-get install -y texlive-latex-base"));
    assert!(installs
        .iter()
        .any(|c| c == "python3 -m pip install torch torchvision torchaudio --index-url https://download.pytorch.org/whl/cpu"));
    assert!(installs.iter().any(|c| c == "python3 -m pip install gradio"));
    assert!(installs.iter().any(|c| c == "python3 -m pip install pylatex>=1.4.0"));

    // No GPU tool on the host: nothing from the CUDA path
    assert!(!installs.iter().any(|c| c.contains("cuda") || c.contains("cu121") || c.contains("cupy")));
}

#[test]
fn test_rerun_is_idempotent() {
    let host = FakeHost::ubuntu();
    host.envboot().arg("install").assert().success();

    host.clear_log();
    host.envboot()
        .arg("install")
        .assert()
        .success()
        .stdout(predicate::str::contains("refreshed  package index update"))
        .stdout(predicate::str::contains("0 installed"));

    // Only the index refresh runs again; every package is detected as present
    assert_eq!(host.installs(), vec!["apt-get update".to_string()]);
    assert!(host.calls().iter().any(|c| c.starts_with("python3 -m pip show")));
}

// ─────────────────────────────────────────────────────────────────
// Prerequisites
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_missing_package_manager_aborts_before_installing() {
    let host = FakeHost::new();
    host.tool("id", "echo 0");
    host.python3();

    host.envboot()
        .assert()
        .failure()
        .code(30)
        .stderr(predicate::str::contains("apt-get"));

    assert!(host.installs().is_empty());
}

#[test]
fn test_missing_python_aborts_before_installing() {
    let host = FakeHost::new();
    host.tool("id", "echo 0");
    host.apt_get();

    host.envboot()
        .assert()
        .failure()
        .code(30)
        .stderr(predicate::str::contains("python3"));

    assert!(host.installs().is_empty());
}

// ─────────────────────────────────────────────────────────────────
// Failure Tiers
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_core_failure_exits_nonzero() {
    let host = FakeHost::ubuntu();
    host.tool(
        "apt-get",
        "if [ \"$1\" = \"install\" ]; then echo 'E: Could not get lock' >&2; exit 100; fi\nexit 0",
    );

    host.envboot()
        .assert()
        .failure()
        .code(40)
        .stderr(predicate::str::contains("graphviz"))
        .stderr(predicate::str::contains("Could not get lock"));

    // Nothing after the failed step was attempted
    assert!(!host.installs().iter().any(|c| c.contains("texlive") || c.contains("pip install")));
}

#[test]
fn test_optional_failure_does_not_abort() {
    let host = FakeHost::ubuntu();
    host.tool("nvidia-smi", NVIDIA_SMI_OK);
    host.tool(
        "apt-get",
        "case \"$*\" in *nvidia-cuda-toolkit*) echo 'E: Unable to locate package' >&2; exit 100;; esac\nexit 0",
    );

    host.envboot().assert().success();

    let installs = host.installs();
    assert!(installs.iter().any(|c| c.contains("nvidia-cuda-toolkit")));
    assert!(installs.iter().any(|c| c.contains("--index-url https://download.pytorch.org/whl/cu121")));
    assert!(installs.iter().any(|c| c == "python3 -m pip install cupy-cuda12x"));
    assert!(installs.iter().any(|c| c == "python3 -m pip install gradio"));
}

#[test]
fn test_failing_gpu_tool_selects_cpu_path() {
    let host = FakeHost::ubuntu();
    host.tool("nvidia-smi", "echo 'NVIDIA-SMI has failed' >&2\nexit 9");

    host.envboot().assert().success();

    let installs = host.installs();
    assert!(installs.iter().any(|c| c.contains("whl/cpu")));
    assert!(!installs.iter().any(|c| c.contains("cuda")));
}

// ─────────────────────────────────────────────────────────────────
// Platforms
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_unsupported_distro_installs_python_only() {
    let host = FakeHost::ubuntu();
    host.os_release("NAME=\"Arch Linux\"\nID=arch\n");

    host.envboot()
        .assert()
        .success()
        .stderr(predicate::str::contains("Unsupported platform"));

    let installs = host.installs();
    assert!(!installs.iter().any(|c| c.starts_with("apt-get")));
    assert!(installs.iter().any(|c| c.contains("pip install torch")));
}

#[test]
fn test_redhat_family_uses_yum() {
    let host = FakeHost::new();
    host.tool("id", "echo 0");
    host.tool("yum", "exit 0");
    host.python3();
    host.os_release("NAME=\"Amazon Linux\"\nID=\"amzn\"\n");

    host.envboot().assert().success();

    let calls = host.calls();
    assert!(calls.iter().any(|c| c == "yum install -y graphviz"));
    assert!(calls.iter().any(|c| c == "yum install -y texlive-latex texlive-latex-extra"));
    assert!(!calls.iter().any(|c| c.contains("update")));
}

#[test]
fn test_sudo_used_for_non_root() {
    let host = FakeHost::ubuntu();
    host.tool("id", "echo 1000");
    host.tool("sudo", "exit 0");

    host.envboot().assert().success();

    let calls = host.calls();
    assert!(calls.iter().any(|c| c == "sudo apt-get install -y graphviz"));
    // pip is never escalated
    assert!(calls.iter().any(|c| c == "python3 -m pip install gradio"));
}

// ─────────────────────────────────────────────────────────────────
// Options
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_dry_run_changes_nothing() {
    let host = FakeHost::ubuntu();

    host.envboot()
        .arg("install")
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(predicate::str::contains("Dry run"));

    assert!(host.installs().is_empty());
    assert!(!host.bin().join("dot").exists());
    // Presence checks still ran
    assert!(host.calls().iter().any(|c| c.starts_with("python3 -m pip show")));
}

#[test]
fn test_plan_runs_nothing() {
    let host = FakeHost::ubuntu();

    host.envboot()
        .arg("plan")
        .assert()
        .success()
        .stdout(predicate::str::contains("apt-get install -y graphviz"))
        .stdout(predicate::str::contains("tensor library (CPU)"));

    assert!(host.installs().is_empty());
}

#[test]
fn test_report_written() {
    let host = FakeHost::ubuntu();
    let report = host.root().join("report.json");

    host.envboot()
        .arg("install")
        .arg("--report")
        .arg(&report)
        .assert()
        .success();

    let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&report).unwrap()).unwrap();
    assert_eq!(value["dry_run"], false);
    assert_eq!(value["capabilities"]["gpu"]["available"], false);
    let records = value["records"].as_array().unwrap();
    assert!(records
        .iter()
        .any(|r| r["name"] == "graphviz" && r["status"] == "completed"));
    assert!(records
        .iter()
        .any(|r| r["name"] == "LaTeX package booktabs" && r["status"] == "skipped"));
}

#[test]
fn test_smoke_test_runs_last() {
    let host = FakeHost::ubuntu();
    let script = host.root().join("smoke_test.py");
    fs::write(&script, "print('ok')\n").unwrap();

    host.envboot()
        .env("ENVBOOT_SMOKE_TEST", &script)
        .assert()
        .success();

    let calls = host.calls();
    assert_eq!(calls.last().unwrap(), &format!("python3 {}", script.display()));

    host.clear_log();
    host.envboot()
        .env("ENVBOOT_SMOKE_TEST", &script)
        .arg("install")
        .arg("--skip-smoke-test")
        .assert()
        .success();
    assert!(!host.calls().iter().any(|c| c.contains("smoke_test.py")));
}

#[test]
fn test_smoke_test_switch_keeps_configured_script() {
    let host = FakeHost::ubuntu();
    fs::write(host.root().join("smoke_test.py"), "print('ok')\n").unwrap();

    host.envboot().env("ENVBOOT_SMOKE_TEST", "1").assert().success();

    assert_eq!(host.calls().last().unwrap(), "python3 smoke_test.py");
}

#[test]
fn test_failing_smoke_test_only_warns() {
    let host = FakeHost::ubuntu();
    let script = host.root().join("smoke_test.py");
    fs::write(&script, "raise SystemExit(1)\n").unwrap();
    // Wrap the stateful python3 so running the script itself fails
    let python = fs::read_to_string(host.bin().join("python3")).unwrap();
    let python = python.replacen(
        "state=",
        "case \"$1\" in *smoke_test.py) exit 1;; esac\nstate=",
        1,
    );
    fs::write(host.bin().join("python3"), python).unwrap();

    host.envboot()
        .env("ENVBOOT_SMOKE_TEST", &script)
        .assert()
        .success()
        .stdout(predicate::str::contains("1 failed"));
}
