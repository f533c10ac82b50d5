//! # Package Graph
//!
//! The graph is an arena: packages live in a `Vec`, an identity map gives
//! O(1) lookup, and both adjacency lists store [`NodeId`] indices. Nodes never
//! own each other, so the bidirectional edges form no ownership cycles.
//!
//! ## Building
//!
//! [`Graph::merge`] folds one [`Spec`] into the node table:
//!
//! - the identity is validated and the node is created on first reference;
//! - scalar overrides are last-non-nil-wins, hooks are appended, `enabled`
//!   is AND-combined and `pin` is OR-combined (scope flags included);
//! - nested `requires`/`wants` specs are merged recursively and linked in
//!   both directions before the outer merge returns.
//!
//! [`Graph::add`] is the top-level entry point: it merges an [`Entry`] and
//! links the synthetic root as a dependency of each top-level package.
//! [`Graph::finalize`] runs once after all merges to guarantee reachability
//! from the root and to push disablement down to dependents.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Error, Result};
use crate::package::{NodeId, Package};
use crate::spec::{Entry, Scope, Spec};

/// Identity of the synthetic root node representing the manager itself.
///
/// It deliberately lacks a namespace so no declaration can collide with it.
pub const ROOT_ID: &str = "packsync";

/// Default remote for identities without an explicit URL.
pub const DEFAULT_URL_FORMAT: &str = "https://github.com/{}.git";

fn identity_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9_.-]+/[A-Za-z0-9_.-]+$").expect("identity pattern is valid")
    })
}

/// Check that `identity` has the `namespace/name` shape.
pub fn validate_identity(identity: &str) -> Result<()> {
    let dotted = identity.split('/').any(|s| s == "." || s == "..");
    if identity_pattern().is_match(identity) && !dotted {
        return Ok(());
    }

    let hint = if dotted {
        "Neither part of an identity may be '.' or '..'".to_string()
    } else if identity.is_empty() {
        "Every package needs an identity such as 'owner/repo'".to_string()
    } else if !identity.contains('/') {
        format!("Add a namespace, e.g. 'owner/{}'", identity)
    } else if identity.contains("://") {
        "Use the 'url' field for full URLs and keep the identity as 'owner/repo'".to_string()
    } else {
        "Identities have exactly one '/' and no spaces".to_string()
    };

    Err(Error::InvalidIdentity {
        identity: identity.to_string(),
        hint: Some(hint),
    })
}

/// Check that a directory name override stays a single entry under the base
/// directory.
pub fn validate_dir_name(identity: &str, name: &str) -> Result<()> {
    let message = if name == "." || name == ".." {
        Some(format!("cannot be '{}'", name))
    } else if name.contains('/') || name.contains('\\') {
        Some(format!("must be a plain directory name, got '{}'", name))
    } else {
        None
    };

    match message {
        Some(message) => Err(Error::SpecValidation {
            spec: identity.to_string(),
            field: "as".to_string(),
            message,
        }),
        None => Ok(()),
    }
}

/// The package dependency graph.
#[derive(Debug)]
pub struct Graph {
    nodes: Vec<Package>,
    index: HashMap<String, NodeId>,
    root: NodeId,
    url_format: String,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    pub fn new() -> Self {
        Self::with_url_format(DEFAULT_URL_FORMAT)
    }

    /// Create a graph whose packages default to `url_format` with `{}`
    /// replaced by the identity.
    pub fn with_url_format(url_format: impl Into<String>) -> Self {
        let mut root = Package::new(ROOT_ID);
        root.exists = true;
        root.activated = true;

        let mut index = HashMap::new();
        index.insert(ROOT_ID.to_string(), NodeId(0));

        Self {
            nodes: vec![root],
            index,
            root: NodeId(0),
            url_format: url_format.into(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn is_root(&self, node: NodeId) -> bool {
        node == self.root
    }

    pub fn get(&self, id: &str) -> Option<NodeId> {
        self.index.get(id).copied()
    }

    pub fn node(&self, node: NodeId) -> &Package {
        &self.nodes[node.0]
    }

    pub fn node_mut(&mut self, node: NodeId) -> &mut Package {
        &mut self.nodes[node.0]
    }

    /// Look up a package by identity.
    pub fn package(&self, id: &str) -> Option<&Package> {
        self.get(id).map(|n| self.node(n))
    }

    /// Number of nodes, the root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when nothing but the root has been declared.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// All nodes in declaration order, the root first.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Package)> {
        self.nodes.iter().enumerate().map(|(i, p)| (NodeId(i), p))
    }

    /// All declared packages in declaration order, without the root.
    pub fn packages(&self) -> impl Iterator<Item = (NodeId, &Package)> {
        let root = self.root;
        self.iter().filter(move |(n, _)| *n != root)
    }

    /// The remote a package is cloned from.
    pub fn source_url(&self, node: NodeId) -> Option<String> {
        if self.is_root(node) {
            return None;
        }
        let pkg = self.node(node);
        Some(
            pkg.url
                .clone()
                .unwrap_or_else(|| self.url_format.replace("{}", &pkg.id)),
        )
    }

    fn get_or_create(&mut self, id: &str) -> NodeId {
        if let Some(node) = self.index.get(id) {
            return *node;
        }
        let node = NodeId(self.nodes.len());
        self.nodes.push(Package::new(id));
        self.index.insert(id.to_string(), node);
        node
    }

    /// Link `dependency` before `dependent`. Returns false if already linked.
    pub fn link(&mut self, dependency: NodeId, dependent: NodeId) -> bool {
        if self.nodes[dependency.0].dependents.contains(&dependent) {
            return false;
        }
        self.nodes[dependency.0].dependents.push(dependent);
        self.nodes[dependent.0].dependencies.push(dependency);
        true
    }

    /// Add a top-level entry and link its packages to the root.
    pub fn add(&mut self, entry: Entry) -> Result<()> {
        self.add_scoped(entry, Scope::default())
    }

    fn add_scoped(&mut self, entry: Entry, scope: Scope) -> Result<()> {
        match entry {
            Entry::Package(spec) => {
                let node = self.merge(spec, scope)?;
                let root = self.root;
                self.link(root, node);
            }
            Entry::Group(group) => {
                let scope = scope.nest(group.pin, group.disable);
                for entry in group.entries {
                    self.add_scoped(entry, scope)?;
                }
            }
        }
        Ok(())
    }

    /// Merge one declaration into the node table.
    pub fn merge(&mut self, spec: Spec, scope: Scope) -> Result<NodeId> {
        validate_identity(&spec.id)?;
        if let Some(name) = &spec.name {
            validate_dir_name(&spec.id, name)?;
        }

        let Spec {
            id,
            name,
            url,
            branch,
            pin,
            disable,
            requires,
            wants,
            hooks,
        } = spec;

        let node = self.get_or_create(&id);
        {
            let pkg = &mut self.nodes[node.0];
            if let Some(name) = name.filter(|n| !n.is_empty()) {
                pkg.name_override = Some(name);
            }
            if url.is_some() {
                pkg.url = url;
            }
            if branch.is_some() {
                pkg.branch = branch;
            }
            pkg.pin = pkg.pin || pin.unwrap_or(false) || scope.pin;
            pkg.enabled = pkg.enabled && !disable.unwrap_or(false) && !scope.disable;
            pkg.hooks.extend(hooks);
        }

        for dependency in requires {
            if dependency.id == id {
                self.nodes[node.0].self_declared = true;
            }
            let dep = self.merge(dependency, scope)?;
            self.link(dep, node);
        }

        for dependent in wants {
            if dependent.id == id {
                self.nodes[node.0].self_declared = true;
            }
            let dpt = self.merge(dependent, scope)?;
            self.link(node, dpt);
        }

        Ok(node)
    }

    /// Post-merge pass: make every node reachable from the root and disable
    /// everything downstream of a disabled node.
    pub fn finalize(&mut self) {
        let root = self.root;
        for i in 0..self.nodes.len() {
            let node = NodeId(i);
            if node == root {
                continue;
            }
            let has_dependency = self.nodes[i].dependencies.iter().any(|d| *d != node);
            if !has_dependency {
                self.link(root, node);
            }
        }

        let disabled: Vec<NodeId> = self
            .iter()
            .filter(|(_, p)| !p.enabled)
            .map(|(n, _)| n)
            .collect();
        for node in self.dependent_closure(&disabled) {
            if node != root && self.nodes[node.0].enabled {
                log::debug!(
                    "Disabling {} because one of its dependencies is disabled",
                    self.nodes[node.0].id
                );
                self.nodes[node.0].enabled = false;
            }
        }
    }

    /// Every node reachable from `start` through dependents, `start` included.
    pub fn dependent_closure(&self, start: &[NodeId]) -> Vec<NodeId> {
        self.closure(start, |p| &p.dependents)
    }

    /// Every node reachable from `start` through dependencies, `start` included.
    pub fn dependency_closure(&self, start: &[NodeId]) -> Vec<NodeId> {
        self.closure(start, |p| &p.dependencies)
    }

    fn closure<F>(&self, start: &[NodeId], edges: F) -> Vec<NodeId>
    where
        F: Fn(&Package) -> &Vec<NodeId>,
    {
        let mut seen: HashSet<NodeId> = start.iter().copied().collect();
        let mut queue: VecDeque<NodeId> = start.iter().copied().collect();
        let mut out = Vec::new();

        while let Some(node) = queue.pop_front() {
            out.push(node);
            for next in edges(&self.nodes[node.0]) {
                if seen.insert(*next) {
                    queue.push_back(*next);
                }
            }
        }

        out
    }

    /// Reset `node`, everything it depends on, and everything that depends on
    /// it back to pending for both phases.
    pub fn invalidate(&mut self, node: NodeId) {
        let mut affected = self.dependency_closure(&[node]);
        affected.extend(self.dependent_closure(&[node]));
        for n in affected {
            self.nodes[n.0].invalidate();
        }
    }

    /// Dependents of `node` in walk order: ascending dependency count, then
    /// identity. Self-loops are left out.
    pub fn ordered_dependents(&self, node: NodeId) -> Vec<NodeId> {
        let mut dependents: Vec<NodeId> = self.nodes[node.0]
            .dependents
            .iter()
            .copied()
            .filter(|d| *d != node)
            .collect();
        dependents.sort_by(|a, b| {
            let (pa, pb) = (&self.nodes[a.0], &self.nodes[b.0]);
            pa.dependencies
                .len()
                .cmp(&pb.dependencies.len())
                .then_with(|| pa.id.cmp(&pb.id))
        });
        dependents
    }

    /// Identities of a list of nodes.
    pub fn ids(&self, nodes: &[NodeId]) -> Vec<String> {
        nodes.iter().map(|n| self.nodes[n.0].id.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::HookStage;
    use crate::spec::Group;
    use std::path::Path;

    fn deps(graph: &Graph, id: &str) -> Vec<String> {
        let node = graph.get(id).unwrap();
        graph.ids(&graph.node(node).dependencies)
    }

    fn dependents(graph: &Graph, id: &str) -> Vec<String> {
        let node = graph.get(id).unwrap();
        graph.ids(&graph.node(node).dependents)
    }

    #[test]
    fn test_validate_identity() {
        assert!(validate_identity("owner/repo").is_ok());
        assert!(validate_identity("my.org/repo-name_2").is_ok());
        assert!(validate_identity("repo").is_err());
        assert!(validate_identity("").is_err());
        assert!(validate_identity("a/b/c").is_err());
        assert!(validate_identity("owner/ repo").is_err());
    }

    #[test]
    fn test_validate_identity_rejects_dot_segments() {
        for identity in ["owner/..", "owner/.", "../repo", "./repo"] {
            let err = validate_identity(identity).unwrap_err();
            assert!(
                matches!(err, Error::InvalidIdentity { .. }),
                "{} should be rejected",
                identity
            );
        }
        assert!(validate_identity("owner/.dotfiles").is_ok());
        assert!(validate_identity("owner/repo..old").is_ok());
    }

    #[test]
    fn test_merge_rejects_name_override_outside_base_dir() {
        for name in ["..", ".", "../x", "/abs", "a/b", "a\\b"] {
            let mut graph = Graph::new();
            let err = graph
                .merge(Spec::new("owner/repo").name(name), Scope::default())
                .unwrap_err();
            match err {
                Error::SpecValidation { spec, field, .. } => {
                    assert_eq!(spec, "owner/repo");
                    assert_eq!(field, "as");
                }
                other => panic!("unexpected error for {:?}: {}", name, other),
            }
        }

        let mut graph = Graph::new();
        let node = graph
            .merge(Spec::new("owner/repo").name("repo-local"), Scope::default())
            .unwrap();
        assert_eq!(
            graph.node(node).dir(Path::new("/base")),
            Path::new("/base/repo-local")
        );
    }

    #[test]
    fn test_validate_identity_hint_for_missing_namespace() {
        let err = validate_identity("telescope").unwrap_err();
        assert!(err.to_string().contains("owner/telescope"));
    }

    #[test]
    fn test_merge_rejects_malformed_identity() {
        let mut graph = Graph::new();
        let err = graph.merge(Spec::new("bad"), Scope::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidIdentity { .. }));
    }

    #[test]
    fn test_merge_rejects_malformed_nested_identity() {
        let mut graph = Graph::new();
        let spec = Spec::new("a/a").requires(Spec::new("nope"));
        assert!(graph.merge(spec, Scope::default()).is_err());
    }

    #[test]
    fn test_merge_creates_single_node_per_identity() {
        let mut graph = Graph::new();
        let a1 = graph.merge(Spec::new("a/a"), Scope::default()).unwrap();
        let a2 = graph.merge(Spec::new("a/a"), Scope::default()).unwrap();
        assert_eq!(a1, a2);
        assert_eq!(graph.len(), 2); // root + a/a
    }

    #[test]
    fn test_merge_scalar_overrides_last_non_nil_wins() {
        let mut graph = Graph::new();
        graph
            .merge(Spec::new("a/a").branch("main").name("first"), Scope::default())
            .unwrap();
        graph
            .merge(Spec::new("a/a").branch("dev"), Scope::default())
            .unwrap();

        let pkg = graph.package("a/a").unwrap();
        assert_eq!(pkg.branch.as_deref(), Some("dev"));
        assert_eq!(pkg.name(), "first");
    }

    #[test]
    fn test_merge_enabled_and_pin_combination() {
        let mut graph = Graph::new();
        graph
            .merge(Spec::new("a/a").disable(true).pin(false), Scope::default())
            .unwrap();
        graph
            .merge(Spec::new("a/a").disable(false).pin(true), Scope::default())
            .unwrap();

        let pkg = graph.package("a/a").unwrap();
        assert!(!pkg.enabled, "disable is AND-combined into enabled");
        assert!(pkg.pin, "pin is OR-combined");
    }

    #[test]
    fn test_merge_appends_hooks_in_declaration_order() {
        let mut graph = Graph::new();
        graph
            .merge(
                Spec::new("a/a").hook(HookStage::Configure, crate::hooks::Hook::command("one")),
                Scope::default(),
            )
            .unwrap();
        graph
            .merge(
                Spec::new("a/a").hook(HookStage::Configure, crate::hooks::Hook::command("two")),
                Scope::default(),
            )
            .unwrap();

        let hooks = &graph.package("a/a").unwrap().hooks.configure;
        let cmds: Vec<String> = hooks
            .iter()
            .map(|h| match h {
                crate::hooks::Hook::Command(c) => c.clone(),
                _ => String::new(),
            })
            .collect();
        assert_eq!(cmds, vec!["one", "two"]);
    }

    #[test]
    fn test_merge_links_edges_symmetrically() {
        let mut graph = Graph::new();
        graph
            .add(Spec::new("a/a").requires(Spec::new("b/b")).into())
            .unwrap();

        assert_eq!(deps(&graph, "a/a"), vec!["b/b", ROOT_ID]);
        assert_eq!(dependents(&graph, "b/b"), vec!["a/a"]);
        assert_eq!(dependents(&graph, ROOT_ID), vec!["a/a"]);
    }

    #[test]
    fn test_merge_wants_links_other_direction() {
        let mut graph = Graph::new();
        graph
            .add(Spec::new("a/a").wants(Spec::new("c/c")).into())
            .unwrap();

        assert_eq!(dependents(&graph, "a/a"), vec!["c/c"]);
        assert_eq!(deps(&graph, "c/c"), vec!["a/a"]);
    }

    #[test]
    fn test_link_deduplicates() {
        let mut graph = Graph::new();
        graph
            .add(Spec::new("a/a").requires(Spec::new("b/b")).into())
            .unwrap();
        graph
            .add(Spec::new("a/a").requires(Spec::new("b/b")).into())
            .unwrap();

        assert_eq!(dependents(&graph, "b/b"), vec!["a/a"]);
        assert_eq!(deps(&graph, "a/a"), vec!["b/b", ROOT_ID]);
    }

    #[test]
    fn test_group_scope_applies_to_nested_specs() {
        let mut graph = Graph::new();
        graph
            .add(Entry::Group(Group {
                pin: Some(true),
                disable: None,
                entries: vec![Spec::new("a/a").requires(Spec::new("b/b")).into()],
            }))
            .unwrap();

        assert!(graph.package("a/a").unwrap().pin);
        assert!(graph.package("b/b").unwrap().pin);
    }

    #[test]
    fn test_finalize_links_orphans_to_root() {
        let mut graph = Graph::new();
        graph
            .add(Spec::new("a/a").requires(Spec::new("b/b")).into())
            .unwrap();
        graph.finalize();

        assert_eq!(deps(&graph, "b/b"), vec![ROOT_ID]);
    }

    #[test]
    fn test_finalize_propagates_disable_to_dependents() {
        let mut graph = Graph::new();
        graph
            .add(
                Spec::new("c/c")
                    .requires(Spec::new("b/b").requires(Spec::new("a/a").disable(true)))
                    .into(),
            )
            .unwrap();
        graph.add(Spec::new("x/x").into()).unwrap();
        graph.finalize();

        assert!(!graph.package("a/a").unwrap().enabled);
        assert!(!graph.package("b/b").unwrap().enabled);
        assert!(!graph.package("c/c").unwrap().enabled);
        assert!(graph.package("x/x").unwrap().enabled);
        assert!(graph.node(graph.root()).enabled);
    }

    #[test]
    fn test_self_declaration_is_recorded() {
        let mut graph = Graph::new();
        graph
            .add(Spec::new("a/a").requires(Spec::new("a/a")).into())
            .unwrap();

        let pkg = graph.package("a/a").unwrap();
        assert!(pkg.self_declared);
        assert!(pkg.dependents.contains(&graph.get("a/a").unwrap()));
    }

    #[test]
    fn test_ordered_dependents_by_dependency_count_then_identity() {
        let mut graph = Graph::new();
        graph.add(Spec::new("z/z").into()).unwrap();
        graph.add(Spec::new("m/m").into()).unwrap();
        graph
            .add(Spec::new("b/b").requires(Spec::new("m/m")).into())
            .unwrap();

        let order = graph.ids(&graph.ordered_dependents(graph.root()));
        assert_eq!(order, vec!["m/m", "z/z", "b/b"]);
    }

    #[test]
    fn test_invalidate_clears_closures_only() {
        let mut graph = Graph::new();
        graph
            .add(Spec::new("c/c").requires(Spec::new("b/b").requires(Spec::new("a/a"))).into())
            .unwrap();
        graph.add(Spec::new("x/x").into()).unwrap();
        graph.finalize();
        for i in 0..graph.len() {
            let pkg = graph.node_mut(NodeId(i));
            pkg.configured = true;
            pkg.subtree_configured = true;
        }

        let b = graph.get("b/b").unwrap();
        graph.invalidate(b);

        for id in ["a/a", "b/b", "c/c", ROOT_ID] {
            assert!(!graph.package(id).unwrap().configured, "{} reset", id);
        }
        assert!(graph.package("x/x").unwrap().configured);
        assert!(graph.package("x/x").unwrap().subtree_configured);
    }

    #[test]
    fn test_source_url_defaults_to_format() {
        let mut graph = Graph::with_url_format("https://git.example.com/{}");
        let a = graph.merge(Spec::new("a/a"), Scope::default()).unwrap();
        let b = graph
            .merge(Spec::new("b/b").url("file:///srv/b"), Scope::default())
            .unwrap();

        assert_eq!(
            graph.source_url(a).as_deref(),
            Some("https://git.example.com/a/a")
        );
        assert_eq!(graph.source_url(b).as_deref(), Some("file:///srv/b"));
        assert_eq!(graph.source_url(graph.root()), None);
    }
}
