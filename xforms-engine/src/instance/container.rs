use std::cell::RefCell;

use super::{Node, NodeId};
use crate::reactive::Signal;

/// Ordered children of a parent node.
///
/// The id list is the reactive part; reading it subscribes to structural
/// changes. The node list is only replaced together with it.
pub(crate) struct ChildrenStore {
    ids: Signal<Vec<NodeId>>,
    nodes: RefCell<Vec<Node>>,
}

impl ChildrenStore {
    pub(crate) fn new() -> Self {
        Self {
            ids: Signal::new(Vec::new()),
            nodes: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn ids(&self) -> Vec<NodeId> {
        self.ids.get()
    }

    pub(crate) fn nodes(&self) -> Vec<Node> {
        self.ids.with(|_| ());
        self.nodes.borrow().clone()
    }

    pub(crate) fn nodes_untracked(&self) -> Vec<Node> {
        self.nodes.borrow().clone()
    }

    pub(crate) fn len_untracked(&self) -> usize {
        self.nodes.borrow().len()
    }

    pub(crate) fn find(&self, id: NodeId) -> Option<Node> {
        self.nodes
            .borrow()
            .iter()
            .find(|node| node.node_id() == id)
            .cloned()
    }

    /// Replace the children and notify dependents once.
    pub(crate) fn commit(&self, nodes: Vec<Node>) {
        let ids = nodes.iter().map(|node| node.node_id()).collect();
        self.nodes.replace(nodes);
        self.ids.set(ids);
    }
}
