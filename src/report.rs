//! Read-only views of the graph for status output.
//!
//! [`PackageReport`] carries everything a status screen needs without going
//! back to the graph. [`dependency_tree`] lays the dependents relation out as
//! a tree rooted at the manager; packages reachable along several paths are
//! expanded once and marked on later appearances.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;

use crate::graph::Graph;
use crate::package::{NodeId, Package};

/// Elapsed times in milliseconds.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct TimingReport {
    pub sync_ms: Option<u64>,
    pub configure_ms: Option<u64>,
    pub load_ms: Option<u64>,
}

fn millis(d: Option<Duration>) -> Option<u64> {
    d.map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

/// State of one package.
#[derive(Debug, Clone, Serialize)]
pub struct PackageReport {
    pub id: String,
    pub name: String,
    pub dir: PathBuf,
    pub url: Option<String>,
    pub branch: Option<String>,
    pub enabled: bool,
    pub pin: bool,
    pub exists: bool,
    pub configured: bool,
    pub loaded: bool,
    pub error: bool,
    pub revision: Option<String>,
    pub dependencies: Vec<String>,
    pub dependents: Vec<String>,
    pub timings: TimingReport,
}

impl PackageReport {
    fn new(graph: &Graph, node: NodeId, pkg: &Package, base_dir: &Path) -> Self {
        Self {
            id: pkg.id.clone(),
            name: pkg.name().to_string(),
            dir: pkg.dir(base_dir),
            url: graph.source_url(node),
            branch: pkg.branch.clone(),
            enabled: pkg.enabled,
            pin: pkg.pin,
            exists: pkg.exists,
            configured: pkg.configured,
            loaded: pkg.loaded,
            error: pkg.error,
            revision: pkg.revision.clone(),
            dependencies: graph.ids(&pkg.dependencies),
            dependents: graph.ids(&pkg.dependents),
            timings: TimingReport {
                sync_ms: millis(pkg.timings.sync),
                configure_ms: millis(pkg.timings.configure),
                load_ms: millis(pkg.timings.load),
            },
        }
    }

    /// One-word state, most significant first.
    pub fn state(&self) -> &'static str {
        if !self.enabled {
            "disabled"
        } else if !self.exists {
            "missing"
        } else if self.error {
            "error"
        } else if self.loaded {
            "loaded"
        } else if self.configured {
            "configured"
        } else {
            "installed"
        }
    }
}

/// Reports for every declared package, in declaration order.
pub fn package_reports(graph: &Graph, base_dir: &Path) -> Vec<PackageReport> {
    graph
        .packages()
        .map(|(node, pkg)| PackageReport::new(graph, node, pkg, base_dir))
        .collect()
}

/// A node of the dependency tree view.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TreeNode {
    pub label: String,
    pub children: Vec<TreeNode>,
}

/// The dependents relation as a tree, at most `max_depth` levels below the
/// root.
pub fn dependency_tree(graph: &Graph, max_depth: usize) -> TreeNode {
    let mut seen = HashSet::new();
    tree_node(graph, graph.root(), max_depth, 0, &mut seen)
}

fn tree_node(
    graph: &Graph,
    node: NodeId,
    max_depth: usize,
    depth: usize,
    seen: &mut HashSet<NodeId>,
) -> TreeNode {
    let pkg = graph.node(node);
    let mut label = pkg.id.clone();
    if let Some(branch) = &pkg.branch {
        label.push_str(&format!(" @ {}", branch));
    }
    if !graph.is_root(node) && !pkg.enabled {
        label.push_str(" (disabled)");
    }

    let first_visit = seen.insert(node);
    let dependents = graph.ordered_dependents(node);
    if !first_visit && !dependents.is_empty() {
        label.push_str(" (*)");
    }
    if !first_visit || depth >= max_depth {
        return TreeNode {
            label,
            children: Vec::new(),
        };
    }

    let children = dependents
        .into_iter()
        .map(|d| tree_node(graph, d, max_depth, depth + 1, seen))
        .collect();
    TreeNode { label, children }
}
