//! Context node handles.
//!
//! A [`ContextNode`] is what the evaluator sees of the form: an element of
//! the primary instance it can navigate (name, parent, child elements,
//! string value, root). Repeat ranges have no element of their own; their
//! instances appear as children of the range's parent.
//!
//! Navigation reads reactive state. It is tracked while dependencies are
//! being resolved, so structural changes (a repeat instance added or
//! removed) invalidate the computations that walked past them.

use std::fmt;

use crate::instance::{Node, NodeId};

/// A node the evaluator can use as context or return as a result.
#[derive(Clone)]
pub enum ContextNode {
    /// An element of the primary instance.
    Instance(Node),

    /// Stand-in for a repeat range with no instances, positioned where its
    /// first instance would be.
    RepeatAnchor(Node),

    /// A node owned by the evaluator (secondary instances), by opaque id.
    Foreign(u64),
}

impl ContextNode {
    /// The engine node behind an instance handle.
    pub fn node(&self) -> Option<&Node> {
        match self {
            Self::Instance(node) => Some(node),
            Self::RepeatAnchor(_) | Self::Foreign(_) => None,
        }
    }

    pub fn node_id(&self) -> Option<NodeId> {
        match self {
            Self::Instance(node) | Self::RepeatAnchor(node) => Some(node.node_id()),
            Self::Foreign(_) => None,
        }
    }

    pub fn is_foreign(&self) -> bool {
        matches!(self, Self::Foreign(_))
    }

    /// Element name; `None` for foreign nodes.
    pub fn node_name(&self) -> Option<&str> {
        match self {
            Self::Instance(node) | Self::RepeatAnchor(node) => Some(node.node_name()),
            Self::Foreign(_) => None,
        }
    }

    /// Absolute location path of the node.
    pub fn reference(&self) -> Option<String> {
        match self {
            Self::Instance(node) | Self::RepeatAnchor(node) => Some(node.reference()),
            Self::Foreign(_) => None,
        }
    }

    /// Parent element, skipping repeat ranges.
    pub fn parent(&self) -> Option<ContextNode> {
        match self {
            Self::Instance(node) | Self::RepeatAnchor(node) => {
                node.xml_parent().map(ContextNode::Instance)
            }
            Self::Foreign(_) => None,
        }
    }

    /// Child elements in document order. Repeat ranges contribute their
    /// instances.
    pub fn child_elements(&self) -> Vec<ContextNode> {
        match self {
            Self::Instance(node) => node
                .xml_children()
                .into_iter()
                .map(ContextNode::Instance)
                .collect(),
            Self::RepeatAnchor(_) | Self::Foreign(_) => Vec::new(),
        }
    }

    /// XPath string value: a leaf's value, or the concatenated values of an
    /// element's descendant leaves.
    pub fn string_value(&self) -> String {
        match self {
            Self::Instance(node) => {
                let mut value = String::new();
                collect_text(node, &mut value);
                value
            }
            Self::RepeatAnchor(_) | Self::Foreign(_) => String::new(),
        }
    }

    /// The primary instance root element.
    pub fn root(&self) -> Option<ContextNode> {
        match self {
            Self::Instance(node) | Self::RepeatAnchor(node) => {
                Some(ContextNode::Instance(node.root_node()))
            }
            Self::Foreign(_) => None,
        }
    }
}

fn collect_text(node: &Node, out: &mut String) {
    if node.is_value_node() {
        out.push_str(&node.instance_value());
        return;
    }
    for child in node.xml_children() {
        collect_text(&child, out);
    }
}

impl PartialEq for ContextNode {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Instance(a), Self::Instance(b)) => a.node_id() == b.node_id(),
            (Self::RepeatAnchor(a), Self::RepeatAnchor(b)) => a.node_id() == b.node_id(),
            (Self::Foreign(a), Self::Foreign(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for ContextNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Instance(node) => f.debug_tuple("Instance").field(&node.node_id()).finish(),
            Self::RepeatAnchor(node) => f.debug_tuple("RepeatAnchor").field(&node.node_id()).finish(),
            Self::Foreign(id) => f.debug_tuple("Foreign").field(id).finish(),
        }
    }
}
