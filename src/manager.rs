//! # Manager
//!
//! [`Manager`] is the explicit context that owns one package graph together
//! with its settings and collaborators. Every engine operation goes through
//! it, so several independent managers can coexist (tests build one each).
//!
//! ## Lifecycle
//!
//! 1. [`Manager::build`] merges all declarations, rejects cycles, and
//!    finalizes the graph. Spec and cycle errors are fatal here.
//! 2. [`Manager::refresh_exists`] records which clones are on disk.
//! 3. [`Manager::sync`] launches one sync job per package, applies each
//!    outcome as it arrives, and once the last job is done runs cleanup
//!    followed by a configure and load sweep.
//!
//! Graph mutation only happens on the task driving these futures; jobs hold
//! snapshots, never the graph.

use std::path::Path;
use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};

use crate::activate::{Activator, RuntimePath};
use crate::clean::{self, CleanReport};
use crate::config::{Config, Settings};
use crate::cycle;
use crate::error::Result;
use crate::filesystem::{DefaultFileOperations, FileOperations};
use crate::git::{DefaultGitOperations, GitOperations};
use crate::graph::Graph;
use crate::package::NodeId;
use crate::report::{self, PackageReport};
use crate::scheduler::Propagator;
use crate::spec::{Entry, Scope, Spec};
use crate::sync::{self, SyncJob, SyncMode, SyncResult};

/// Summary of one [`Manager::sync`] call.
#[derive(Debug, Default)]
pub struct SyncReport {
    /// Finished jobs, in completion order.
    pub results: Vec<SyncResult>,
    /// Cleanup outcome; `None` when the base directory could not be listed.
    pub clean: Option<CleanReport>,
    pub configured: bool,
    pub loaded: bool,
}

impl SyncReport {
    /// True if any job failed or cleanup could not finish.
    pub fn failed(&self) -> bool {
        self.results.iter().any(|r| r.outcome.is_failure())
            || self.clean.as_ref().map_or(true, |c| !c.is_clean())
    }

    /// Number of results with the given outcome label.
    pub fn count(&self, label: &str) -> usize {
        self.results
            .iter()
            .filter(|r| r.outcome.label() == label)
            .count()
    }
}

/// Owns a package graph and everything needed to sync and propagate it.
pub struct Manager {
    graph: Graph,
    settings: Settings,
    git: Arc<dyn GitOperations>,
    fs: Arc<dyn FileOperations>,
    activator: Box<dyn Activator>,
}

impl Manager {
    /// Build a manager from a parsed configuration file.
    pub fn from_config(config: Config) -> Result<Self> {
        Self::build(config.settings, config.entries)
    }

    /// Build a manager from plain package specs.
    pub fn from_specs(settings: Settings, specs: Vec<Spec>) -> Result<Self> {
        Self::build(settings, specs.into_iter().map(Entry::from).collect())
    }

    /// Merge `entries`, reject cycles, and finalize the graph.
    pub fn build(settings: Settings, entries: Vec<Entry>) -> Result<Self> {
        let mut graph = Graph::with_url_format(settings.url_format.clone());
        for entry in entries {
            graph.add(entry)?;
        }
        cycle::check(&graph)?;
        graph.finalize();

        Ok(Self {
            graph,
            settings,
            git: Arc::new(DefaultGitOperations),
            fs: Arc::new(DefaultFileOperations),
            activator: Box::new(RuntimePath::new()),
        })
    }

    /// Replace the git and filesystem collaborators.
    pub fn with_operations(
        mut self,
        git: Arc<dyn GitOperations>,
        fs: Arc<dyn FileOperations>,
    ) -> Self {
        self.git = git;
        self.fs = fs;
        self
    }

    pub fn with_activator(mut self, activator: Box<dyn Activator>) -> Self {
        self.activator = activator;
        self
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn base_dir(&self) -> &Path {
        &self.settings.base_dir
    }

    pub fn activator(&self) -> &dyn Activator {
        self.activator.as_ref()
    }

    /// Declare one more package after construction.
    ///
    /// The graph is re-checked for cycles and re-finalized.
    pub fn add(&mut self, entry: Entry) -> Result<()> {
        self.graph.add(entry)?;
        cycle::check(&self.graph)?;
        self.graph.finalize();
        Ok(())
    }

    /// Merge a declaration without linking it to the root.
    pub fn merge(&mut self, spec: Spec) -> Result<NodeId> {
        let node = self.graph.merge(spec, Scope::default())?;
        cycle::check(&self.graph)?;
        self.graph.finalize();
        Ok(node)
    }

    /// Record which packages have a clone on disk.
    pub async fn refresh_exists(&mut self) {
        let nodes: Vec<(NodeId, std::path::PathBuf)> = self
            .graph
            .packages()
            .map(|(n, p)| (n, p.dir(&self.settings.base_dir)))
            .collect();
        for (node, dir) in nodes {
            let exists = self.fs.is_dir(&dir).await;
            self.graph.node_mut(node).exists = exists;
        }
    }

    /// Read the checked-out revision of every installed package.
    ///
    /// Failures leave the recorded revision unset.
    pub async fn refresh_revisions(&mut self) {
        let nodes: Vec<(NodeId, std::path::PathBuf)> = self
            .graph
            .packages()
            .filter(|(_, p)| p.exists)
            .map(|(n, p)| (n, p.dir(&self.settings.base_dir)))
            .collect();
        for (node, dir) in nodes {
            let revision = match self.git.revision(&dir, "HEAD").await {
                Ok(rev) => Some(rev),
                Err(e) => {
                    log::debug!("{}: {}", self.graph.node(node).id, e);
                    None
                }
            };
            self.graph.node_mut(node).revision = revision;
        }
    }

    /// Run the configure sweep from the root.
    pub fn configure(&mut self) -> bool {
        Propagator::new(
            &mut self.graph,
            &self.settings.base_dir,
            self.activator.as_mut(),
        )
        .configure()
    }

    /// Run the load sweep from the root.
    pub fn load(&mut self) -> bool {
        Propagator::new(
            &mut self.graph,
            &self.settings.base_dir,
            self.activator.as_mut(),
        )
        .load()
    }

    /// Sync every package, then clean and propagate.
    pub async fn sync(&mut self, mode: SyncMode) -> SyncReport {
        let jobs: Vec<SyncJob> = self
            .graph
            .packages()
            .filter_map(|(n, _)| SyncJob::new(&self.graph, n, &self.settings.base_dir))
            .collect();

        log::debug!("Launching {} sync jobs", jobs.len());
        let mut pending: FuturesUnordered<_> = jobs
            .into_iter()
            .map(|job| {
                sync::run_job(
                    Arc::clone(&self.git),
                    job,
                    mode,
                    self.settings.sync_timeout,
                )
            })
            .collect();

        let mut report = SyncReport::default();
        while let Some(result) = pending.next().await {
            sync::apply(&mut self.graph, &result);
            report.results.push(result);
        }

        // Every job is terminal past this point.
        report.clean = self.clean().await;
        report.configured = self.configure();
        report.loaded = self.load();

        if report.failed() {
            log::error!(
                "Sync finished with errors: {} failed, {} installed, {} updated",
                report.count("failed"),
                report.count("installed"),
                report.count("updated"),
            );
        } else {
            log::info!(
                "Sync finished: {} installed, {} updated, {} up to date",
                report.count("installed"),
                report.count("updated"),
                report.count("skipped"),
            );
        }
        report
    }

    /// Remove stale entries from the base directory.
    ///
    /// Returns `None` if the base directory could not be listed.
    pub async fn clean(&self) -> Option<CleanReport> {
        let known = clean::known_names(&self.graph);
        match clean::clean(&self.settings.base_dir, &known, self.fs.as_ref()).await {
            Ok(report) => Some(report),
            Err(e) => {
                log::error!("Cleanup failed: {}", e);
                None
            }
        }
    }

    /// Per-package state for reporting.
    pub fn report(&self) -> Vec<PackageReport> {
        report::package_reports(&self.graph, &self.settings.base_dir)
    }
}
