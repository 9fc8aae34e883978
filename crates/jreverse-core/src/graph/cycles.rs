//! Cycle detection over the dependency-injection graph.
//!
//! Iterative depth-first search with an explicit stack, O(V+E). Each
//! cycle is canonicalized by rotating to its lexicographically smallest
//! class name, so the same loop reported from different entry points
//! deduplicates to one finding.

use std::collections::{BTreeSet, HashSet};

use petgraph::graph::NodeIndex;
use petgraph::Direction;
use serde::{Deserialize, Serialize};

use super::dependency::DependencyGraph;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cycle {
    /// Class names in cycle order, starting from the smallest.
    pub nodes: Vec<String>,
    /// True when any edge along the cycle is a lazy injection.
    pub lazy: bool,
}

impl Cycle {
    /// `A -> B -> A` rendering for reports.
    pub fn describe(&self) -> String {
        let mut path = self.nodes.join(" -> ");
        if let Some(first) = self.nodes.first() {
            path.push_str(" -> ");
            path.push_str(first);
        }
        path
    }
}

pub fn find_cycles(graph: &DependencyGraph) -> Vec<Cycle> {
    let g = &graph.graph;
    let mut seen: BTreeSet<Vec<String>> = BTreeSet::new();
    let mut cycles = Vec::new();
    let mut visited: HashSet<NodeIndex> = HashSet::new();

    // Deterministic roots: sorted by class name.
    let mut roots: Vec<NodeIndex> = g.node_indices().collect();
    roots.sort_by(|a, b| g[*a].class.cmp(&g[*b].class));

    for root in roots {
        if visited.contains(&root) {
            continue;
        }
        // (node, iterator position over sorted successors)
        let mut stack: Vec<(NodeIndex, Vec<NodeIndex>, usize)> = Vec::new();
        let mut on_stack: HashSet<NodeIndex> = HashSet::new();

        stack.push((root, sorted_successors(graph, root), 0));
        on_stack.insert(root);
        visited.insert(root);

        while let Some((node, successors, pos)) = stack.last_mut() {
            if *pos >= successors.len() {
                on_stack.remove(node);
                stack.pop();
                continue;
            }
            let next = successors[*pos];
            *pos += 1;

            if on_stack.contains(&next) {
                // back edge: the cycle is the stack slice from `next` down.
                let start = stack
                    .iter()
                    .position(|(n, _, _)| *n == next)
                    .unwrap_or(0);
                let members: Vec<NodeIndex> = stack[start..].iter().map(|(n, _, _)| *n).collect();
                let canonical = canonicalize(graph, &members);
                if seen.insert(canonical.clone()) {
                    let lazy = cycle_has_lazy_edge(graph, &members);
                    cycles.push(Cycle {
                        nodes: canonical,
                        lazy,
                    });
                }
            } else if !visited.contains(&next) {
                visited.insert(next);
                on_stack.insert(next);
                stack.push((next, sorted_successors(graph, next), 0));
            }
        }
    }
    cycles
}

fn sorted_successors(graph: &DependencyGraph, node: NodeIndex) -> Vec<NodeIndex> {
    let mut succ: Vec<NodeIndex> = graph
        .graph
        .neighbors_directed(node, Direction::Outgoing)
        .collect();
    succ.sort_by(|a, b| graph.graph[*a].class.cmp(&graph.graph[*b].class));
    succ.dedup();
    succ
}

/// Rotate so the lexicographically smallest class name comes first.
fn canonicalize(graph: &DependencyGraph, members: &[NodeIndex]) -> Vec<String> {
    let names: Vec<&str> = members.iter().map(|n| graph.graph[*n].class.as_str()).collect();
    let smallest = names
        .iter()
        .enumerate()
        .min_by_key(|(_, name)| **name)
        .map(|(i, _)| i)
        .unwrap_or(0);
    names
        .iter()
        .cycle()
        .skip(smallest)
        .take(names.len())
        .map(|s| s.to_string())
        .collect()
}

/// Any parallel edge between consecutive members being lazy makes the
/// whole cycle breakable at runtime.
fn cycle_has_lazy_edge(graph: &DependencyGraph, members: &[NodeIndex]) -> bool {
    members.iter().enumerate().any(|(i, &from)| {
        let to = members[(i + 1) % members.len()];
        graph
            .graph
            .edges_connecting(from, to)
            .any(|e| e.weight().lazy)
    })
}
