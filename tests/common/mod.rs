//! Shared test utilities for integration and E2E tests.
//!
//! ## Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! #[cfg_attr(not(feature = "integration-tests"), ignore)]
//! fn test_example() {
//!     let fixture = TestFixture::new().with_config(configs::SINGLE);
//!     fixture.command().arg("validate").assert().success();
//! }
//! ```

use assert_fs::prelude::*;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    pub use assert_fs::prelude::*;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::configs;
    #[allow(unused_imports)]
    pub use super::{git_available, LocalRemote};
    pub use super::TestFixture;
}

/// Common configuration YAML snippets for testing.
#[allow(dead_code)]
pub mod configs {
    /// A single package.
    pub const SINGLE: &str = "packages:\n  - owner/alpha\n";

    /// Two packages, one requiring the other.
    pub const CHAIN: &str = r#"
packages:
  - id: owner/app
    requires: [owner/lib]
"#;

    /// A two-node cycle.
    pub const CYCLE: &str = r#"
packages:
  - id: owner/a
    requires:
      - id: owner/b
        requires: [owner/a]
"#;

    /// Invalid YAML for error testing.
    pub const INVALID_YAML: &str = "packages: [unclosed";

    /// Empty configuration.
    pub const EMPTY: &str = "# nothing declared yet\npackages: []\n";
}

/// Whether a usable `git` binary is on the PATH.
#[allow(dead_code)]
pub fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn git(dir: &Path, args: &[&str]) {
    let status = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(args)
        .env("GIT_TERMINAL_PROMPT", "0")
        .status()
        .expect("Failed to run git");
    assert!(status.success(), "git {:?} failed in {}", args, dir.display());
}

/// A git repository on local disk that sync can clone from.
#[allow(dead_code)]
pub struct LocalRemote {
    dir: PathBuf,
}

#[allow(dead_code)]
impl LocalRemote {
    /// Create a repository with one commit under `parent/name`.
    pub fn new(parent: &Path, name: &str) -> Self {
        let dir = parent.join(name);
        std::fs::create_dir_all(&dir).expect("Failed to create remote dir");
        git(&dir, &["init", "-q", "-b", "main"]);
        git(&dir, &["config", "user.email", "test@example.com"]);
        git(&dir, &["config", "user.name", "Test"]);
        git(&dir, &["config", "uploadpack.allowReachableSHA1InWant", "true"]);
        let remote = Self { dir };
        remote.commit("README.md", "initial");
        remote
    }

    /// Commit `content` to `file`.
    pub fn commit(&self, file: &str, content: &str) {
        std::fs::write(self.dir.join(file), content).expect("Failed to write file");
        git(&self.dir, &["add", "."]);
        git(&self.dir, &["commit", "-q", "-m", content]);
    }

    /// `file://` URL for cloning.
    pub fn url(&self) -> String {
        format!("file://{}", self.dir.display())
    }
}

/// A temporary directory holding a `packsync.yaml` and a base directory.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

#[allow(dead_code)]
impl TestFixture {
    /// Create a new test fixture with an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Write `packsync.yaml` with the given content.
    pub fn with_config(self, content: &str) -> Self {
        self.temp_dir
            .child("packsync.yaml")
            .write_str(content)
            .expect("Failed to write config file");
        self
    }

    /// Create a directory under the base directory.
    pub fn with_clone_dir(self, name: &str) -> Self {
        self.temp_dir
            .child("packages")
            .child(name)
            .create_dir_all()
            .expect("Failed to create clone dir");
        self
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn config_path(&self) -> PathBuf {
        self.temp_dir.path().join("packsync.yaml")
    }

    /// Where package clones go.
    pub fn base_dir(&self) -> PathBuf {
        self.temp_dir.path().join("packages")
    }

    /// A `packsync` command running in this fixture with its config and
    /// base directory.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("packsync");
        cmd.current_dir(self.path())
            .env("PACKSYNC_CONFIG", self.config_path())
            .env("PACKSYNC_HOME", self.base_dir())
            .env_remove("RUST_LOG")
            .arg("--color")
            .arg("never");
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_with_config() {
        let fixture = TestFixture::new().with_config(configs::SINGLE);
        assert!(fixture.config_path().exists());
    }

    #[test]
    fn test_fixture_with_clone_dir() {
        let fixture = TestFixture::new().with_clone_dir("alpha");
        assert!(fixture.base_dir().join("alpha").is_dir());
    }
}
