//! Common test utilities and fixtures
//!
//! [`FakeHost`] is a temporary directory holding shell-script stand-ins
//! for apt-get, python3 and friends. Every script appends its command line
//! to a shared log, so tests can assert on exactly what envboot ran.

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::TempDir;

pub const UBUNTU_OS_RELEASE: &str = "NAME=\"Ubuntu\"\nVERSION=\"22.04.4 LTS (Jammy Jellyfish)\"\n";

pub struct FakeHost {
    dir: TempDir,
}

impl FakeHost {
    /// Empty host: no tools, Ubuntu os-release, empty config file
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("bin")).unwrap();
        fs::create_dir(dir.path().join("pip-state")).unwrap();
        fs::write(dir.path().join("envboot.toml"), "").unwrap();
        fs::write(dir.path().join("calls.log"), "").unwrap();
        let host = Self { dir };
        host.os_release(UBUNTU_OS_RELEASE);
        host
    }

    /// Root user with apt-get and a stateful python3
    pub fn ubuntu() -> Self {
        let host = Self::new();
        host.tool("id", "echo 0");
        host.apt_get();
        host.python3();
        host
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn bin(&self) -> PathBuf {
        self.root().join("bin")
    }

    pub fn log_path(&self) -> PathBuf {
        self.root().join("calls.log")
    }

    pub fn os_release(&self, content: &str) {
        fs::write(self.root().join("os-release"), content).unwrap();
    }

    /// Install a tool script. Its invocation is logged before `body` runs.
    pub fn tool(&self, name: &str, body: &str) {
        let path = self.bin().join(name);
        let script = format!(
            "#!/bin/sh\necho \"{name} $*\" >> '{log}'\n{body}\n",
            name = name,
            log = self.log_path().display(),
            body = body
        );
        fs::write(&path, script).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    /// A tool that is present but never invoked (e.g. `dot` after graphviz)
    pub fn present(&self, name: &str) {
        self.tool(name, "exit 0");
    }

    /// apt-get that "installs" graphviz and TeX Live by creating their binaries
    pub fn apt_get(&self) {
        let body = format!(
            r#"if [ "$1" = "install" ]; then
  for pkg in "$@"; do
    case "$pkg" in
      graphviz) tool=dot ;;
      texlive-latex-base) tool=pdflatex ;;
      *) tool= ;;
    esac
    if [ -n "$tool" ]; then
      printf '#!/bin/sh\nexit 0\n' > '{bin}'/$tool
      chmod +x '{bin}'/$tool
    fi
  done
fi
exit 0"#,
            bin = self.bin().display()
        );
        self.tool("apt-get", &body);
    }

    /// python3 whose pip remembers installed distributions
    pub fn python3(&self) {
        let body = format!(
            r#"state='{state}'
if [ "$1" = "-m" ] && [ "$2" = "pip" ]; then
  case "$3" in
    show)
      [ -f "$state/$5" ]
      exit $?
      ;;
    install)
      shift 3
      for arg in "$@"; do
        case "$arg" in
          -*|http*) ;;
          *) touch "$state/${{arg%%[<>=]*}}" ;;
        esac
      done
      exit 0
      ;;
  esac
fi
exit 0"#,
            state = self.root().join("pip-state").display()
        );
        self.tool("python3", &body);
    }

    /// Everything recorded so far, one command per line
    pub fn calls(&self) -> Vec<String> {
        fs::read_to_string(self.log_path())
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// Logged commands that install something
    pub fn installs(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.contains(" install ") || c.starts_with("apt-get update"))
            .collect()
    }

    pub fn clear_log(&self) {
        fs::write(self.log_path(), "").unwrap();
    }

    /// envboot confined to this host's tools, config and os-release
    pub fn envboot(&self) -> Command {
        let mut cmd = Command::cargo_bin("envboot").unwrap();
        cmd.current_dir(self.root())
            .env_remove("ENVBOOT_CONFIG")
            .env("ENVBOOT_SEARCH_PATH", self.bin())
            .env("ENVBOOT_OS_RELEASE", self.root().join("os-release"))
            .env("ENVBOOT_SMOKE_TEST", "0")
            .env("ENVBOOT_SUDO", "auto")
            .arg("--config")
            .arg(self.root().join("envboot.toml"));
        cmd
    }
}
