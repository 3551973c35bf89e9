//! Graph Nodes
//!
//! Bookkeeping for one reactive primitive: its kind, whether it must
//! recompute, and its edges. Values live in the signal and memo handles.

use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexSet;

/// Identity of a signal, memo or effect in the dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReactiveId(u64);

impl ReactiveId {
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ReactiveId {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Signal: only dependents.
    Source,
    /// Memo: cached, with dependencies and dependents.
    Derived,
    /// Effect: only dependencies.
    Effect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirtyState {
    Clean,
    /// An upstream memo changed; the direct inputs still have to be checked.
    MaybeDirty,
    /// A direct input changed.
    Dirty,
}

#[derive(Debug)]
pub struct GraphNode {
    id: ReactiveId,
    kind: NodeKind,
    dirty: DirtyState,
    /// Read during the last run, in read order.
    dependencies: IndexSet<ReactiveId>,
    dependents: IndexSet<ReactiveId>,
}

impl GraphNode {
    fn new(id: ReactiveId, kind: NodeKind) -> Self {
        // Computations have never run, so they start dirty.
        let dirty = match kind {
            NodeKind::Source => DirtyState::Clean,
            NodeKind::Derived | NodeKind::Effect => DirtyState::Dirty,
        };
        Self {
            id,
            kind,
            dirty,
            dependencies: IndexSet::new(),
            dependents: IndexSet::new(),
        }
    }

    pub fn source(id: ReactiveId) -> Self {
        Self::new(id, NodeKind::Source)
    }

    pub fn derived(id: ReactiveId) -> Self {
        Self::new(id, NodeKind::Derived)
    }

    pub fn effect(id: ReactiveId) -> Self {
        Self::new(id, NodeKind::Effect)
    }

    pub fn id(&self) -> ReactiveId {
        self.id
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn dirty_state(&self) -> DirtyState {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = DirtyState::Clean;
    }

    /// Mark the node as maybe dirty. Never downgrades a dirty node.
    pub fn mark_maybe_dirty(&mut self) {
        if self.dirty == DirtyState::Clean {
            self.dirty = DirtyState::MaybeDirty;
        }
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = DirtyState::Dirty;
    }

    pub fn add_dependency(&mut self, node_id: ReactiveId) {
        self.dependencies.insert(node_id);
    }

    pub fn remove_dependency(&mut self, node_id: ReactiveId) {
        self.dependencies.shift_remove(&node_id);
    }

    pub fn dependencies(&self) -> &IndexSet<ReactiveId> {
        &self.dependencies
    }

    pub fn add_dependent(&mut self, node_id: ReactiveId) {
        self.dependents.insert(node_id);
    }

    pub fn remove_dependent(&mut self, node_id: ReactiveId) {
        self.dependents.shift_remove(&node_id);
    }

    pub fn dependents(&self) -> &IndexSet<ReactiveId> {
        &self.dependents
    }

    /// Clear the dependencies, returning them.
    pub fn take_dependencies(&mut self) -> IndexSet<ReactiveId> {
        std::mem::take(&mut self.dependencies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sources_start_clean() {
        let node = GraphNode::source(ReactiveId::new());
        assert_eq!(node.kind(), NodeKind::Source);
        assert_eq!(node.dirty_state(), DirtyState::Clean);
    }

    #[test]
    fn derived_and_effect_nodes_start_dirty() {
        assert_eq!(
            GraphNode::derived(ReactiveId::new()).dirty_state(),
            DirtyState::Dirty
        );
        assert_eq!(
            GraphNode::effect(ReactiveId::new()).dirty_state(),
            DirtyState::Dirty
        );
    }

    #[test]
    fn dependencies_keep_read_order() {
        let mut node = GraphNode::derived(ReactiveId::new());
        let dep1 = ReactiveId::new();
        let dep2 = ReactiveId::new();

        node.add_dependency(dep2);
        node.add_dependency(dep1);
        node.add_dependency(dep2);

        let order: Vec<_> = node.dependencies().iter().copied().collect();
        assert_eq!(order, vec![dep2, dep1]);

        node.remove_dependency(dep2);
        assert_eq!(node.dependencies().len(), 1);
    }

    #[test]
    fn maybe_dirty_never_downgrades_dirty() {
        let mut node = GraphNode::derived(ReactiveId::new());
        node.mark_maybe_dirty();
        assert_eq!(node.dirty_state(), DirtyState::Dirty);

        node.mark_clean();
        node.mark_maybe_dirty();
        assert_eq!(node.dirty_state(), DirtyState::MaybeDirty);
    }
}
