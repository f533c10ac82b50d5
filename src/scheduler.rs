//! # Propagation Scheduler
//!
//! Drives the two top-down sweeps over the graph, starting at the root:
//!
//! 1. **configure**: activate the package, then run its setup and configure
//!    hooks.
//! 2. **load**: activate the package if needed, then run its load hooks.
//!
//! Each sweep is a recursive walk with the same per-node policy:
//!
//! - a missing, disabled, or failed package does not complete;
//! - a node whose subtree already completed the phase is skipped outright,
//!   so a diamond is visited once per sweep;
//! - a node runs only after every dependency completed the same phase.
//!   Otherwise it is left alone and picked up when the walk reaches it again
//!   through its last dependency;
//! - a hook or activation failure marks only that node as failed. Its
//!   dependents stay blocked by the dependency check above while siblings
//!   carry on.
//!
//! Walks are idempotent and may be re-run after any state change; only
//! invalidated parts of the graph do any work.

use std::path::Path;
use std::time::Instant;

use crate::activate::Activator;
use crate::error::Result;
use crate::graph::Graph;
use crate::hooks::{run_hooks, HookStage};
use crate::package::{NodeId, Phase};

/// One propagation pass over a graph.
pub struct Propagator<'a> {
    graph: &'a mut Graph,
    base_dir: &'a Path,
    activator: &'a mut dyn Activator,
}

impl<'a> Propagator<'a> {
    pub fn new(graph: &'a mut Graph, base_dir: &'a Path, activator: &'a mut dyn Activator) -> Self {
        Self {
            graph,
            base_dir,
            activator,
        }
    }

    /// Configure everything reachable from the root.
    ///
    /// Returns whether every package that is installed and enabled ended up
    /// configured.
    pub fn configure(&mut self) -> bool {
        self.sweep(Phase::Configure)
    }

    /// Load everything reachable from the root.
    ///
    /// Returns whether every package that is installed and enabled ended up
    /// loaded.
    pub fn load(&mut self) -> bool {
        self.sweep(Phase::Load)
    }

    fn sweep(&mut self, phase: Phase) -> bool {
        let root = self.graph.root();
        self.walk(root, phase);
        self.settled(phase)
    }

    /// Whether every live package reachable from the root completed `phase`.
    ///
    /// The subtree flags can lag behind on a diamond, where a dependent is
    /// first reached before its last dependency, so they only drive
    /// memoization and this answers from the nodes themselves.
    fn settled(&self, phase: Phase) -> bool {
        let root = self.graph.root();
        self.graph
            .dependent_closure(&[root])
            .into_iter()
            .map(|n| self.graph.node(n))
            .filter(|p| !p.is_inert())
            .all(|p| p.completed(phase))
    }

    /// Walk `node` and its dependents for `phase`.
    ///
    /// Returns whether `node` and its whole dependent subtree completed.
    pub fn walk(&mut self, node: NodeId, phase: Phase) -> bool {
        {
            let pkg = self.graph.node(node);
            if pkg.is_inert() || pkg.error {
                return false;
            }
            if pkg.subtree_completed(phase) {
                return true;
            }
            if phase == Phase::Load && !pkg.configured {
                return false;
            }
            let blocked_by = pkg
                .dependencies
                .iter()
                .filter(|d| **d != node)
                .find(|d| !self.graph.node(**d).completed(phase));
            if let Some(dep) = blocked_by {
                log::trace!(
                    "{} waits for {} to {}",
                    pkg.id,
                    self.graph.node(*dep).id,
                    phase
                );
                return false;
            }
        }

        if !self.graph.node(node).completed(phase) {
            if let Err(e) = self.run_phase(node, phase) {
                log::error!("{}", e);
                self.graph.node_mut(node).error = true;
                return false;
            }
            self.graph.node_mut(node).set_completed(phase, true);
        }

        let mut subtree = true;
        for dependent in self.graph.ordered_dependents(node) {
            let done = self.walk(dependent, phase);
            subtree = subtree && (done || self.graph.node(dependent).is_inert());
        }
        self.graph.node_mut(node).set_subtree_completed(phase, subtree);
        subtree
    }

    fn run_phase(&mut self, node: NodeId, phase: Phase) -> Result<()> {
        let started = Instant::now();
        let dir = self.graph.node(node).dir(self.base_dir);

        if !self.graph.node(node).activated {
            let id = self.graph.node(node).id.clone();
            self.activator.activate(&id, &dir)?;
            self.graph.node_mut(node).activated = true;
        }

        {
            let pkg = self.graph.node(node);
            match phase {
                Phase::Configure => {
                    run_hooks(&pkg.id, HookStage::Setup, &dir, &pkg.hooks.setup)?;
                    run_hooks(&pkg.id, HookStage::Configure, &dir, &pkg.hooks.configure)?;
                }
                Phase::Load => {
                    run_hooks(&pkg.id, HookStage::Load, &dir, &pkg.hooks.load)?;
                }
            }
        }

        let pkg = self.graph.node_mut(node);
        pkg.record_timing(phase, started.elapsed());
        log::debug!("{}: {} complete", pkg.id, phase);
        Ok(())
    }
}
