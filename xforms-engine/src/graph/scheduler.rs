//! Dependency Graph Scheduler
//!
//! The scheduler owns the dependency graph and decides which nodes are
//! affected by a change, and in which order effects should run.
//!
//! # Algorithm
//!
//! Propagation is push-pull:
//!
//! 1. When a source node changes, its direct dependents become `Dirty`.
//! 2. Everything reachable beyond them becomes `MaybeDirty`.
//! 3. Reached effects are returned in topological order so the runtime can
//!    schedule them.
//! 4. Memos are not recomputed here. They are pulled on the next read, and a
//!    memo whose value really changed marks its own direct dependents `Dirty`
//!    (see [`DependencyGraph::mark_dependents_dirty`]).

use std::collections::{HashMap, HashSet, VecDeque};

use super::node::{DirtyState, GraphNode, NodeKind, ReactiveId};

/// The dependency graph shared by every reactive value on a thread.
pub struct DependencyGraph {
    nodes: HashMap<ReactiveId, GraphNode>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
        }
    }

    /// Add a node to the graph.
    pub fn add_node(&mut self, node: GraphNode) -> ReactiveId {
        let id = node.id();
        self.nodes.insert(id, node);
        id
    }

    /// Remove a node from the graph, along with every edge involving it.
    pub fn remove_node(&mut self, node_id: ReactiveId) {
        if let Some(node) = self.nodes.remove(&node_id) {
            for dep_id in node.dependencies() {
                if let Some(dep) = self.nodes.get_mut(dep_id) {
                    dep.remove_dependent(node_id);
                }
            }

            for dependent_id in node.dependents() {
                if let Some(dependent) = self.nodes.get_mut(dependent_id) {
                    dependent.remove_dependency(node_id);
                }
            }
        }
    }

    pub fn contains(&self, node_id: ReactiveId) -> bool {
        self.nodes.contains_key(&node_id)
    }

    pub fn get_node(&self, node_id: ReactiveId) -> Option<&GraphNode> {
        self.nodes.get(&node_id)
    }

    pub fn get_node_mut(&mut self, node_id: ReactiveId) -> Option<&mut GraphNode> {
        self.nodes.get_mut(&node_id)
    }

    pub fn dirty_state(&self, node_id: ReactiveId) -> Option<DirtyState> {
        self.nodes.get(&node_id).map(GraphNode::dirty_state)
    }

    pub fn kind(&self, node_id: ReactiveId) -> Option<NodeKind> {
        self.nodes.get(&node_id).map(GraphNode::kind)
    }

    pub fn dependencies_of(&self, node_id: ReactiveId) -> Vec<ReactiveId> {
        self.nodes
            .get(&node_id)
            .map(|node| node.dependencies().iter().copied().collect())
            .unwrap_or_default()
    }

    /// Add a dependency edge: `dependent` depends on `dependency`.
    pub fn add_edge(&mut self, dependency: ReactiveId, dependent: ReactiveId) {
        if !self.nodes.contains_key(&dependency) || !self.nodes.contains_key(&dependent) {
            return;
        }
        if let Some(dep_node) = self.nodes.get_mut(&dependency) {
            dep_node.add_dependent(dependent);
        }
        if let Some(dependent_node) = self.nodes.get_mut(&dependent) {
            dependent_node.add_dependency(dependency);
        }
    }

    pub fn remove_edge(&mut self, dependency: ReactiveId, dependent: ReactiveId) {
        if let Some(dep_node) = self.nodes.get_mut(&dependency) {
            dep_node.remove_dependent(dependent);
        }
        if let Some(dependent_node) = self.nodes.get_mut(&dependent) {
            dependent_node.remove_dependency(dependency);
        }
    }

    /// Replace every incoming edge of `dependent` with `dependencies`.
    ///
    /// Called after a memo or effect re-runs, with the sources it read.
    pub fn replace_dependencies<I>(&mut self, dependent: ReactiveId, dependencies: I)
    where
        I: IntoIterator<Item = ReactiveId>,
    {
        let old = match self.nodes.get_mut(&dependent) {
            Some(node) => node.take_dependencies(),
            None => return,
        };
        for dep_id in old {
            if let Some(dep) = self.nodes.get_mut(&dep_id) {
                dep.remove_dependent(dependent);
            }
        }
        for dep_id in dependencies {
            if dep_id != dependent {
                self.add_edge(dep_id, dependent);
            }
        }
    }

    /// Mark a source node as changed and propagate dirty flags.
    ///
    /// Returns the effects reached by the change, dependencies first.
    pub fn mark_changed(&mut self, source_id: ReactiveId) -> Vec<ReactiveId> {
        let mut reached = Vec::new();
        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();

        if let Some(source) = self.nodes.get(&source_id) {
            for dependent_id in source.dependents().clone() {
                if let Some(node) = self.nodes.get_mut(&dependent_id) {
                    node.mark_dirty();
                }
                queue.push_back(dependent_id);
            }
        }

        // BFS to propagate maybe-dirty status
        while let Some(node_id) = queue.pop_front() {
            if !visited.insert(node_id) {
                continue;
            }

            if let Some(node) = self.nodes.get_mut(&node_id) {
                node.mark_maybe_dirty();
                reached.push(node_id);

                for dependent_id in node.dependents().clone() {
                    queue.push_back(dependent_id);
                }
            }
        }

        let effects: Vec<_> = self
            .topological_sort(reached)
            .into_iter()
            .filter(|id| self.kind(*id) == Some(NodeKind::Effect))
            .collect();
        effects
    }

    /// Mark the direct dependents of a recomputed memo as dirty.
    pub fn mark_dependents_dirty(&mut self, node_id: ReactiveId) {
        let dependents = match self.nodes.get(&node_id) {
            Some(node) => node.dependents().clone(),
            None => return,
        };
        for dependent_id in dependents {
            if let Some(dependent) = self.nodes.get_mut(&dependent_id) {
                dependent.mark_dirty();
            }
        }
    }

    pub fn mark_clean(&mut self, node_id: ReactiveId) {
        if let Some(node) = self.nodes.get_mut(&node_id) {
            node.mark_clean();
        }
    }

    pub fn mark_dirty(&mut self, node_id: ReactiveId) {
        if let Some(node) = self.nodes.get_mut(&node_id) {
            node.mark_dirty();
        }
    }

    /// Perform a topological sort of the given nodes.
    ///
    /// Returns nodes in order such that dependencies come before dependents.
    /// Nodes caught in a cycle are appended in their original order.
    fn topological_sort(&self, nodes: Vec<ReactiveId>) -> Vec<ReactiveId> {
        let node_set: HashSet<_> = nodes.iter().copied().collect();
        let mut in_degree: HashMap<ReactiveId, usize> = HashMap::new();
        let mut result = Vec::new();
        let mut queue = VecDeque::new();

        // Calculate in-degrees (only counting edges within the node set)
        for &node_id in &nodes {
            if let Some(node) = self.nodes.get(&node_id) {
                let degree = node
                    .dependencies()
                    .iter()
                    .filter(|d| node_set.contains(d))
                    .count();
                in_degree.insert(node_id, degree);
                if degree == 0 {
                    queue.push_back(node_id);
                }
            }
        }

        // Kahn's algorithm
        while let Some(node_id) = queue.pop_front() {
            result.push(node_id);

            if let Some(node) = self.nodes.get(&node_id) {
                for &dependent_id in node.dependents() {
                    if let Some(degree) = in_degree.get_mut(&dependent_id) {
                        *degree = degree.saturating_sub(1);
                        if *degree == 0 {
                            queue.push_back(dependent_id);
                        }
                    }
                }
            }
        }

        if result.len() < in_degree.len() {
            let sorted: HashSet<_> = result.iter().copied().collect();
            result.extend(
                nodes
                    .into_iter()
                    .filter(|id| in_degree.contains_key(id) && !sorted.contains(id)),
            );
        }

        result
    }

    /// Get the total number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}
