//! # Git Operations
//!
//! The sync engine talks to version control through the [`GitOperations`]
//! trait so tests can swap in a fake. [`DefaultGitOperations`] shells out to
//! the system `git`, which picks up SSH keys, credential helpers, and any
//! other authentication configured in `~/.gitconfig`.
//!
//! Every invocation runs with `GIT_TERMINAL_PROMPT=0` so a private or missing
//! repository fails fast instead of waiting for a password on a terminal
//! nobody is watching. Output is captured as combined stdout+stderr.
//!
//! Commands run inside a clone set `GIT_CEILING_DIRECTORIES` to the clone's
//! parent. A package directory that is not a repository then fails instead
//! of resolving to whatever repository encloses the base directory.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::{Error, Result};

/// Version-control operations used by the sync engine.
#[async_trait]
pub trait GitOperations: Send + Sync {
    /// Resolve `r#ref` in the clone at `dir` to a short revision.
    async fn revision(&self, dir: &Path, r#ref: &str) -> Result<String>;

    /// Shallow-clone `url` (with submodules) into `target`, at `branch` if given.
    async fn clone_shallow(&self, url: &str, branch: Option<&str>, target: &Path) -> Result<()>;

    /// Shallow-fetch `r#ref` (with submodules) from `origin` into the clone at `dir`.
    async fn fetch(&self, dir: &Path, r#ref: &str) -> Result<()>;

    /// Hard-reset the working tree at `dir`, submodules included, to `revision`.
    async fn reset_hard(&self, dir: &Path, revision: &str) -> Result<()>;
}

/// Combined result of one git invocation.
#[derive(Debug, Clone)]
pub struct GitOutput {
    pub success: bool,
    pub output: String,
}

/// Run `git` with `args`, optionally inside `dir`.
pub async fn run_git(dir: Option<&Path>, args: &[&str]) -> Result<GitOutput> {
    let mut cmd = Command::new("git");
    if let Some(dir) = dir {
        cmd.arg("-C").arg(dir);
        if let Some(parent) = dir.parent().filter(|p| !p.as_os_str().is_empty()) {
            let ceiling = std::path::absolute(parent).unwrap_or_else(|_| parent.to_path_buf());
            cmd.env("GIT_CEILING_DIRECTORIES", ceiling);
        }
    }
    cmd.args(args)
        .env("GIT_TERMINAL_PROMPT", "0")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = cmd.output().await.map_err(|e| Error::GitCommand {
        command: format!("git {}", args.join(" ")),
        dir: dir.map(|d| d.display().to_string()).unwrap_or_default(),
        output: e.to_string(),
    })?;

    let mut text = String::from_utf8_lossy(&output.stdout).to_string();
    text.push_str(&String::from_utf8_lossy(&output.stderr));

    Ok(GitOutput {
        success: output.status.success(),
        output: text,
    })
}

/// Like [`run_git`], but a non-zero exit becomes [`Error::GitCommand`].
async fn run_git_checked(dir: &Path, args: &[&str]) -> Result<String> {
    let result = run_git(Some(dir), args).await?;
    if result.success {
        Ok(result.output)
    } else {
        Err(Error::GitCommand {
            command: format!("git {}", args.join(" ")),
            dir: dir.display().to_string(),
            output: result.output.trim().to_string(),
        })
    }
}

/// Turn raw clone output into a message, with guidance for auth failures.
fn clone_failure_message(output: &str) -> String {
    if output.contains("Authentication failed")
        || output.contains("Permission denied")
        || output.contains("could not read Username")
        || output.contains("Could not read from remote repository")
    {
        format!(
            "Authentication failed. Make sure you have access to the repository.\n\
            For private repos, ensure you have:\n\
            - SSH key added to ssh-agent\n\
            - Git credentials configured\n\
            Error: {}",
            output.trim()
        )
    } else {
        output.trim().to_string()
    }
}

/// Remove whatever a failed or interrupted clone left at `target`.
pub async fn remove_partial_clone(target: &Path) {
    match tokio::fs::remove_dir_all(target).await {
        Ok(()) => log::debug!("Removed partial clone at {}", target.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => log::warn!(
            "Failed to remove partial clone at {}: {}",
            target.display(),
            e
        ),
    }
}

/// The default implementation of `GitOperations`, backed by the `git` binary.
#[derive(Debug, Default, Clone)]
pub struct DefaultGitOperations;

#[async_trait]
impl GitOperations for DefaultGitOperations {
    async fn revision(&self, dir: &Path, r#ref: &str) -> Result<String> {
        let out = run_git_checked(dir, &["rev-parse", "--short", r#ref]).await?;
        Ok(out.trim().to_string())
    }

    async fn clone_shallow(&self, url: &str, branch: Option<&str>, target: &Path) -> Result<()> {
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let target_str = target.to_string_lossy();
        let mut args = vec![
            "clone",
            "--depth",
            "1",
            "--recurse-submodules",
            "--shallow-submodules",
        ];
        if let Some(branch) = branch {
            args.push("--branch");
            args.push(branch);
        }
        args.push(url);
        args.push(&target_str);

        let result = run_git(None, &args).await?;
        if result.success {
            Ok(())
        } else {
            remove_partial_clone(target).await;
            Err(Error::GitClone {
                url: url.to_string(),
                branch: branch.map(str::to_string),
                message: clone_failure_message(&result.output),
            })
        }
    }

    async fn fetch(&self, dir: &Path, r#ref: &str) -> Result<()> {
        run_git_checked(
            dir,
            &["fetch", "--depth", "1", "--recurse-submodules", "origin", r#ref],
        )
        .await
        .map(|_| ())
    }

    async fn reset_hard(&self, dir: &Path, revision: &str) -> Result<()> {
        run_git_checked(dir, &["reset", "--hard", "--recurse-submodules", revision])
            .await
            .map(|_| ())
    }
}
