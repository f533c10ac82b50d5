//! # Lifecycle Hooks
//!
//! Every package carries three ordered hook lists, one per [`HookStage`].
//! Hooks are opaque to the engine: either a shell command taken from the
//! configuration file or a closure registered by library users. Both kinds
//! are invoked through [`Hook::run`], so the scheduler never has to care
//! which one it is holding.
//!
//! [`run_hooks`] executes a list in order with the working directory switched
//! to the package clone and stops at the first failure. The previous working
//! directory is restored by a drop guard, so it comes back even when a hook
//! returns an error or panics.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{Error, Result};

/// Signature of a programmatic hook.
pub type HookFn = dyn Fn() -> anyhow::Result<()>;

/// The lifecycle stage a hook belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookStage {
    /// Runs right before the package's configure hooks.
    Setup,
    /// Runs once the package and all its dependencies are installed.
    Configure,
    /// Runs once the package and all its dependencies are configured and loaded.
    Load,
}

impl HookStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            HookStage::Setup => "setup",
            HookStage::Configure => "configure",
            HookStage::Load => "load",
        }
    }
}

impl fmt::Display for HookStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single user-supplied callback.
pub enum Hook {
    /// A shell command run with `sh -c`.
    Command(String),
    /// A closure registered through the library API.
    Callback(Box<HookFn>),
}

impl Hook {
    pub fn command(cmd: impl Into<String>) -> Self {
        Hook::Command(cmd.into())
    }

    pub fn callback<F>(f: F) -> Self
    where
        F: Fn() -> anyhow::Result<()> + 'static,
    {
        Hook::Callback(Box::new(f))
    }

    /// Invoke the hook in the current working directory.
    ///
    /// Panics raised by callbacks are caught and turned into errors.
    pub fn run(&self) -> std::result::Result<(), String> {
        match self {
            Hook::Command(cmd) => {
                let output = Command::new("sh")
                    .arg("-c")
                    .arg(cmd)
                    .output()
                    .map_err(|e| format!("failed to spawn '{}': {}", cmd, e))?;
                if output.status.success() {
                    Ok(())
                } else {
                    let mut text = String::from_utf8_lossy(&output.stdout).to_string();
                    text.push_str(&String::from_utf8_lossy(&output.stderr));
                    Err(format!("'{}' exited with {}: {}", cmd, output.status, text.trim()))
                }
            }
            Hook::Callback(f) => match catch_unwind(AssertUnwindSafe(|| f())) {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(format!("{:#}", e)),
                Err(panic) => Err(panic_message(panic.as_ref())),
            },
        }
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Hook::Command(cmd) => f.debug_tuple("Command").field(cmd).finish(),
            Hook::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("hook panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("hook panicked: {}", s)
    } else {
        "hook panicked".to_string()
    }
}

/// The three ordered hook lists of a package.
#[derive(Debug, Default)]
pub struct Hooks {
    pub setup: Vec<Hook>,
    pub configure: Vec<Hook>,
    pub load: Vec<Hook>,
}

impl Hooks {
    pub fn stage(&self, stage: HookStage) -> &[Hook] {
        match stage {
            HookStage::Setup => &self.setup,
            HookStage::Configure => &self.configure,
            HookStage::Load => &self.load,
        }
    }

    pub fn stage_mut(&mut self, stage: HookStage) -> &mut Vec<Hook> {
        match stage {
            HookStage::Setup => &mut self.setup,
            HookStage::Configure => &mut self.configure,
            HookStage::Load => &mut self.load,
        }
    }

    /// Append `other`'s hooks after ours, stage by stage.
    pub fn extend(&mut self, other: Hooks) {
        self.setup.extend(other.setup);
        self.configure.extend(other.configure);
        self.load.extend(other.load);
    }

    pub fn is_empty(&self) -> bool {
        self.setup.is_empty() && self.configure.is_empty() && self.load.is_empty()
    }

    pub fn len(&self) -> usize {
        self.setup.len() + self.configure.len() + self.load.len()
    }
}

/// Restores the working directory it captured when dropped.
struct CwdGuard {
    previous: PathBuf,
}

impl CwdGuard {
    fn enter(dir: &Path) -> std::io::Result<Self> {
        let previous = std::env::current_dir()?;
        std::env::set_current_dir(dir)?;
        Ok(Self { previous })
    }
}

impl Drop for CwdGuard {
    fn drop(&mut self) {
        if let Err(e) = std::env::set_current_dir(&self.previous) {
            log::error!(
                "Failed to restore working directory {}: {}",
                self.previous.display(),
                e
            );
        }
    }
}

/// Run `hooks` in order inside `dir`, stopping at the first failure.
pub fn run_hooks(package: &str, stage: HookStage, dir: &Path, hooks: &[Hook]) -> Result<()> {
    if hooks.is_empty() {
        return Ok(());
    }

    let _guard = CwdGuard::enter(dir).map_err(|e| Error::Hook {
        package: package.to_string(),
        stage: stage.to_string(),
        message: format!("cannot enter {}: {}", dir.display(), e),
    })?;

    for (idx, hook) in hooks.iter().enumerate() {
        log::debug!("Running {} hook #{} for {}", stage, idx, package);
        hook.run().map_err(|message| Error::Hook {
            package: package.to_string(),
            stage: stage.to_string(),
            message,
        })?;
    }

    Ok(())
}
