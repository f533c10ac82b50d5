//! Bringing packages into the runtime environment.
//!
//! Activation is the one-time step performed right before a package's first
//! hooks run. What it means depends on the host; the engine only needs the
//! [`Activator`] seam. The default [`RuntimePath`] records activated clone
//! directories in activation order, which is what the `path` command prints.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Makes an installed package available to its host.
pub trait Activator {
    /// Activate `package` whose clone lives in `dir`.
    fn activate(&mut self, package: &str, dir: &Path) -> Result<()>;

    /// Directories activated so far, in activation order.
    fn entries(&self) -> &[PathBuf];
}

/// Ordered list of activated package directories.
#[derive(Debug, Default, Clone)]
pub struct RuntimePath {
    entries: Vec<PathBuf>,
}

impl RuntimePath {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Activator for RuntimePath {
    fn activate(&mut self, package: &str, dir: &Path) -> Result<()> {
        if !dir.is_dir() {
            return Err(Error::Activation {
                package: package.to_string(),
                message: format!("{} is not a directory", dir.display()),
            });
        }
        if !self.entries.iter().any(|e| e == dir) {
            self.entries.push(dir.to_path_buf());
        }
        Ok(())
    }

    fn entries(&self) -> &[PathBuf] {
        &self.entries
    }
}
