// src/loader/graph.rs

use std::collections::{BTreeSet, HashMap};

use petgraph::graphmap::DiGraphMap;
use petgraph::visit::Dfs;
use petgraph::Direction;

type NodeId = u32;

/// Directed graph of "is referenced by" edges between module names.
///
/// Edge direction: dependency -> dependent. If `app.Main` imports
/// `app.Base` we store `app.Base -> app.Main`, so everything reachable from
/// a changed module is exactly what has to be invalidated. Cycles (mutual
/// references) are allowed.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    graph: DiGraphMap<NodeId, ()>,
    ids: HashMap<String, NodeId>,
    names: Vec<String>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn intern(&mut self, name: &str) -> NodeId {
        if let Some(id) = self.ids.get(name) {
            return *id;
        }
        let id = self.names.len() as NodeId;
        self.names.push(name.to_string());
        self.ids.insert(name.to_string(), id);
        self.graph.add_node(id);
        id
    }

    /// Replace the recorded dependencies of `module`.
    pub fn set_dependencies<'a>(&mut self, module: &str, deps: impl IntoIterator<Item = &'a String>) {
        let id = self.intern(module);
        self.clear_dependencies_of(id);
        for dep in deps {
            let dep_id = self.intern(dep);
            self.graph.add_edge(dep_id, id, ());
        }
    }

    /// Forget what `module` depends on. Edges from modules that depend on
    /// `module` are kept.
    pub fn remove_dependencies(&mut self, module: &str) {
        if let Some(id) = self.ids.get(module).copied() {
            self.clear_dependencies_of(id);
        }
    }

    fn clear_dependencies_of(&mut self, id: NodeId) {
        let deps: Vec<NodeId> = self
            .graph
            .neighbors_directed(id, Direction::Incoming)
            .collect();
        for dep in deps {
            self.graph.remove_edge(dep, id);
        }
    }

    /// Direct dependents of `module`.
    pub fn dependents_of(&self, module: &str) -> BTreeSet<String> {
        self.ids
            .get(module)
            .map(|id| {
                self.graph
                    .neighbors_directed(*id, Direction::Outgoing)
                    .map(|n| self.names[n as usize].clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every module reachable from `roots`, the roots included.
    ///
    /// One depth-first search shares its visited set across all roots, so
    /// cycles terminate and each module is reported once.
    pub fn closure<'a>(&self, roots: impl IntoIterator<Item = &'a str>) -> BTreeSet<String> {
        let mut reached = BTreeSet::new();
        let mut dfs: Option<Dfs<NodeId, _>> = None;

        for root in roots {
            reached.insert(root.to_string());
            let Some(&start) = self.ids.get(root) else {
                continue;
            };
            let dfs = dfs.get_or_insert_with(|| Dfs::new(&self.graph, start));
            dfs.move_to(start);
            while let Some(node) = dfs.next(&self.graph) {
                reached.insert(self.names[node as usize].clone());
            }
        }

        reached
    }
}
