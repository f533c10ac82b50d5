//! Cycle detection over the dependents relation.
//!
//! Tarjan's strongly-connected-components algorithm runs over every node in
//! declaration order. A component with more than one node is a cycle. A
//! single node is a cycle only if it has an edge to itself that was not
//! self-declared; a package that explicitly lists itself is accepted as a
//! no-op loop.
//!
//! When several cycles exist, the one containing the earliest-declared node
//! is reported, as a closed path starting and ending at that node.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::error::{Error, Result};
use crate::graph::Graph;
use crate::package::NodeId;

struct Tarjan<'g> {
    graph: &'g Graph,
    next_index: usize,
    index: Vec<Option<usize>>,
    low_link: Vec<usize>,
    on_stack: Vec<bool>,
    stack: Vec<NodeId>,
    components: Vec<Vec<NodeId>>,
}

impl<'g> Tarjan<'g> {
    fn new(graph: &'g Graph) -> Self {
        let n = graph.len();
        Self {
            graph,
            next_index: 0,
            index: vec![None; n],
            low_link: vec![0; n],
            on_stack: vec![false; n],
            stack: Vec::new(),
            components: Vec::new(),
        }
    }

    fn strong_connect(&mut self, v: NodeId) {
        let vi = v.index();
        self.index[vi] = Some(self.next_index);
        self.low_link[vi] = self.next_index;
        self.next_index += 1;
        self.stack.push(v);
        self.on_stack[vi] = true;

        let graph = self.graph;
        for &w in &graph.node(v).dependents {
            let wi = w.index();
            match self.index[wi] {
                None => {
                    self.strong_connect(w);
                    self.low_link[vi] = self.low_link[vi].min(self.low_link[wi]);
                }
                Some(w_index) if self.on_stack[wi] => {
                    self.low_link[vi] = self.low_link[vi].min(w_index);
                }
                Some(_) => {}
            }
        }

        if Some(self.low_link[vi]) == self.index[vi] {
            let mut component = Vec::new();
            while let Some(w) = self.stack.pop() {
                self.on_stack[w.index()] = false;
                component.push(w);
                if w == v {
                    break;
                }
            }
            self.components.push(component);
        }
    }
}

fn is_cycle(graph: &Graph, component: &[NodeId]) -> bool {
    match component {
        [single] => {
            let pkg = graph.node(*single);
            pkg.dependents.contains(single) && !pkg.self_declared
        }
        _ => true,
    }
}

/// Shortest closed walk from `start` back to itself inside `component`.
fn cycle_path(graph: &Graph, start: NodeId, component: &[NodeId]) -> Vec<NodeId> {
    let members: HashSet<NodeId> = component.iter().copied().collect();
    let mut parent: HashMap<NodeId, NodeId> = HashMap::new();
    let mut queue = VecDeque::from([start]);

    while let Some(node) = queue.pop_front() {
        for &next in &graph.node(node).dependents {
            if !members.contains(&next) {
                continue;
            }
            if next == start {
                let mut middle = Vec::new();
                let mut cur = node;
                while cur != start {
                    middle.push(cur);
                    cur = parent[&cur];
                }
                middle.reverse();

                let mut path = vec![start];
                path.extend(middle);
                path.push(start);
                return path;
            }
            if next != node && !parent.contains_key(&next) {
                parent.insert(next, node);
                queue.push_back(next);
            }
        }
    }

    vec![start, start]
}

/// Find a cycle in the dependents relation, as a closed path of identities.
pub fn find_cycle(graph: &Graph) -> Option<Vec<String>> {
    let mut tarjan = Tarjan::new(graph);
    for (node, _) in graph.iter() {
        if tarjan.index[node.index()].is_none() {
            tarjan.strong_connect(node);
        }
    }

    let (start, component) = tarjan
        .components
        .iter()
        .filter(|c| is_cycle(graph, c))
        .filter_map(|c| c.iter().min().map(|start| (*start, c)))
        .min_by_key(|(start, _)| *start)?;

    let path = cycle_path(graph, start, component);
    Some(graph.ids(&path))
}

/// Fail with [`Error::CycleDetected`] if the graph has a cycle.
pub fn check(graph: &Graph) -> Result<()> {
    match find_cycle(graph) {
        Some(path) => Err(Error::CycleDetected {
            cycle: path.join(" -> "),
        }),
        None => Ok(()),
    }
}
