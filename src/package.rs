//! The package node stored in the graph arena.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::hooks::Hooks;

/// Index of a node in the graph arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// One of the two propagation sweeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Configure,
    Load,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Configure => f.write_str("configure"),
            Phase::Load => f.write_str("load"),
        }
    }
}

/// Elapsed-time samples, for reporting only.
#[derive(Debug, Clone, Default)]
pub struct Timings {
    pub configure: Option<Duration>,
    pub load: Option<Duration>,
    pub sync: Option<Duration>,
}

/// A package in the dependency graph.
#[derive(Debug)]
pub struct Package {
    /// Unique identity (`namespace/name`).
    pub id: String,
    /// Name derived from the identity; used unless overridden.
    derived_name: String,
    /// Last non-empty name override.
    pub name_override: Option<String>,
    pub url: Option<String>,
    pub branch: Option<String>,
    pub enabled: bool,
    pub pin: bool,
    pub exists: bool,
    pub configured: bool,
    pub loaded: bool,
    pub subtree_configured: bool,
    pub subtree_loaded: bool,
    /// Set once the package has been brought into the runtime environment.
    pub activated: bool,
    /// Sticky failure flag; cleared only by invalidation.
    pub error: bool,
    /// Set when a declaration of this package listed the package itself.
    pub self_declared: bool,
    /// Short revision of the local clone, when known.
    pub revision: Option<String>,
    pub hooks: Hooks,
    pub dependencies: Vec<NodeId>,
    pub dependents: Vec<NodeId>,
    pub timings: Timings,
}

impl Package {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        let derived_name = id.rsplit('/').next().unwrap_or(&id).to_string();
        Self {
            id,
            derived_name,
            name_override: None,
            url: None,
            branch: None,
            enabled: true,
            pin: false,
            exists: false,
            configured: false,
            loaded: false,
            subtree_configured: false,
            subtree_loaded: false,
            activated: false,
            error: false,
            self_declared: false,
            revision: None,
            hooks: Hooks::default(),
            dependencies: Vec::new(),
            dependents: Vec::new(),
            timings: Timings::default(),
        }
    }

    /// The on-disk directory name; the override wins over the derived name.
    pub fn name(&self) -> &str {
        self.name_override.as_deref().unwrap_or(&self.derived_name)
    }

    /// Where the clone of this package lives under `base_dir`.
    pub fn dir(&self, base_dir: &Path) -> PathBuf {
        base_dir.join(self.name())
    }

    /// Missing or disabled packages never complete a phase; they do not
    /// count against their parents' subtree flags.
    pub fn is_inert(&self) -> bool {
        !self.exists || !self.enabled
    }

    pub fn completed(&self, phase: Phase) -> bool {
        match phase {
            Phase::Configure => self.configured,
            Phase::Load => self.loaded,
        }
    }

    pub fn set_completed(&mut self, phase: Phase, value: bool) {
        match phase {
            Phase::Configure => self.configured = value,
            Phase::Load => self.loaded = value,
        }
    }

    pub fn subtree_completed(&self, phase: Phase) -> bool {
        match phase {
            Phase::Configure => self.subtree_configured,
            Phase::Load => self.subtree_loaded,
        }
    }

    pub fn set_subtree_completed(&mut self, phase: Phase, value: bool) {
        match phase {
            Phase::Configure => self.subtree_configured = value,
            Phase::Load => self.subtree_loaded = value,
        }
    }

    /// Reset both phases back to pending.
    pub fn invalidate(&mut self) {
        self.configured = false;
        self.loaded = false;
        self.subtree_configured = false;
        self.subtree_loaded = false;
        self.error = false;
    }

    pub fn record_timing(&mut self, phase: Phase, elapsed: Duration) {
        match phase {
            Phase::Configure => self.timings.configure = Some(elapsed),
            Phase::Load => self.timings.load = Some(elapsed),
        }
    }
}
