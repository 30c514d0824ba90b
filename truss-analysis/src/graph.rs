//! The transient, per-analyzer-run include graph.
//!
//! A simple directed graph of `(index -> node)` with adjacency lists —
//! `petgraph` is used purely as a container here, the way this codebase
//! uses it elsewhere as an internal data structure rather than a public
//! type. No compile-time graph flavour matters at runtime: every edge is
//! "u textually includes v", full stop.

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use truss_core::FxHashMap;

use crate::includes::extract_includes;
use crate::resolve::resolve_include;
use crate::scanner::ScannedFile;

#[derive(Debug, Clone)]
pub struct Node {
    pub path: PathBuf,
    pub last_write_time: SystemTime,
    pub stale: bool,
}

pub struct IncludeGraph {
    graph: DiGraph<Node, ()>,
    index: FxHashMap<PathBuf, NodeIndex>,
}

impl IncludeGraph {
    /// Builds the graph: gathers nodes, extracts and resolves includes,
    /// couples cpp/hpp stem pairs, then propagates staleness.
    ///
    /// `externals` accumulates every include target that could not be
    /// resolved against a known root, for the prune database's
    /// external-dependencies cache.
    pub fn build(
        files: &[ScannedFile],
        prune_stamp: SystemTime,
        roots: &[&Path],
        project_root: &Path,
        include_cutoff: &str,
        externals: &mut BTreeSet<String>,
    ) -> std::io::Result<Self> {
        let mut graph = DiGraph::new();
        let mut index = FxHashMap::default();

        for file in files {
            let stale = file.last_write_time > prune_stamp;
            let idx = graph.add_node(Node {
                path: file.path.clone(),
                last_write_time: file.last_write_time,
                stale,
            });
            index.insert(file.path.clone(), idx);
        }

        for file in files {
            let text = std::fs::read_to_string(&file.path).unwrap_or_default();
            let from = index[&file.path];
            for include in extract_includes(&text, include_cutoff) {
                match resolve_include(&file.path, &include.target, roots, project_root) {
                    Some(resolved) => {
                        if let Some(&to) = index.get(&resolved) {
                            if from != to {
                                graph.add_edge(from, to, ());
                            }
                        }
                    }
                    None => {
                        externals.insert(include.target);
                    }
                }
            }
        }

        couple_stem_pairs(&mut graph, &index);

        let mut result = Self { graph, index };
        result.propagate_staleness();
        Ok(result)
    }

    pub fn node(&self, path: &Path) -> Option<&Node> {
        self.index.get(path).map(|&i| &self.graph[i])
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.graph.node_weights()
    }

    /// Depth-first traversal over every node's "includes" edges; a node
    /// inherits the max timestamp and the logical-or of staleness across
    /// everything it transitively includes. Cycles are broken with a
    /// per-traversal visited set; results are memoized across traversals
    /// since the underlying graph never changes once built.
    fn propagate_staleness(&mut self) {
        let mut resolved: FxHashMap<NodeIndex, (SystemTime, bool)> = FxHashMap::default();
        let node_indices: Vec<NodeIndex> = self.graph.node_indices().collect();

        for start in node_indices {
            if resolved.contains_key(&start) {
                continue;
            }
            let value = Self::visit(&self.graph, start, &mut resolved, &mut HashSet::new());
            resolved.insert(start, value);
        }

        for (idx, (time, stale)) in resolved {
            let node = &mut self.graph[idx];
            node.last_write_time = time;
            node.stale = stale;
        }
    }

    fn visit(
        graph: &DiGraph<Node, ()>,
        node: NodeIndex,
        resolved: &mut FxHashMap<NodeIndex, (SystemTime, bool)>,
        visiting: &mut HashSet<NodeIndex>,
    ) -> (SystemTime, bool) {
        if let Some(&value) = resolved.get(&node) {
            return value;
        }
        if !visiting.insert(node) {
            // Cycle: contribute this node's own value without recursing further.
            let n = &graph[node];
            return (n.last_write_time, n.stale);
        }

        let own = &graph[node];
        let mut time = own.last_write_time;
        let mut stale = own.stale;

        for succ in graph.neighbors_directed(node, Direction::Outgoing) {
            let (t, s) = Self::visit(graph, succ, resolved, visiting);
            if t > time {
                time = t;
            }
            stale = stale || s;
        }

        visiting.remove(&node);
        resolved.insert(node, (time, stale));
        (time, stale)
    }
}

/// If a cpp file and an hpp file share the same stem and directory,
/// staleness propagates both ways (taking the max timestamp) and every
/// edge the cpp has gained is also attached to the sibling header, so a
/// test cpp's staleness always reflects its own header.
fn couple_stem_pairs(graph: &mut DiGraph<Node, ()>, index: &FxHashMap<PathBuf, NodeIndex>) {
    let mut pairs = Vec::new();
    for (path, &idx) in index {
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            if matches!(ext, "cpp" | "cc" | "cxx") {
                for hpp_ext in ["hpp", "h", "hxx"] {
                    let sibling = path.with_extension(hpp_ext);
                    if let Some(&hidx) = index.get(&sibling) {
                        pairs.push((idx, hidx));
                    }
                }
            }
        }
    }

    for (cpp, hpp) in pairs {
        graph.add_edge(cpp, hpp, ());
        graph.add_edge(hpp, cpp, ());

        let cpp_targets: Vec<NodeIndex> = graph
            .neighbors_directed(cpp, Direction::Outgoing)
            .collect();
        for target in cpp_targets {
            if target != hpp {
                graph.add_edge(hpp, target, ());
            }
        }
    }
}
