//! Current state: the read-only view of a node handed to hosts.

use std::fmt;

use super::StateValue;
use crate::codec::RuntimeValue;
use crate::error::EngineError;
use crate::instance::{Node, NodeType, SelectItem};
use crate::reactive::untrack;
use crate::text::TextRange;

/// Read-only facade over a node's client state. Every getter is reactive.
#[derive(Clone)]
pub struct CurrentState {
    node: Node,
}

impl CurrentState {
    pub(crate) fn new(node: Node) -> Self {
        Self { node }
    }

    /// Any property by key.
    pub fn get(&self, key: &str) -> Option<StateValue> {
        self.node.client_property(key)
    }

    fn flag(&self, key: &str) -> bool {
        self.get(key).and_then(|value| value.as_bool()).unwrap_or(false)
    }

    fn text(&self, key: &str) -> Option<TextRange> {
        self.get(key).and_then(|value| value.as_text().cloned())
    }

    pub fn reference(&self) -> String {
        self.get("reference")
            .and_then(|value| value.as_str().map(str::to_string))
            .unwrap_or_default()
    }

    pub fn node_type(&self) -> NodeType {
        self.node.node_type()
    }

    pub fn relevant(&self) -> bool {
        self.flag("relevant")
    }

    pub fn readonly(&self) -> bool {
        self.flag("readonly")
    }

    pub fn required(&self) -> bool {
        self.flag("required")
    }

    pub fn label(&self) -> Option<TextRange> {
        self.text("label")
    }

    pub fn hint(&self) -> Option<TextRange> {
        self.text("hint")
    }

    /// Decoded value of a value node.
    pub fn value(&self) -> Option<RuntimeValue> {
        self.get("value")
            .and_then(|value| value.as_runtime_value().cloned())
    }

    pub fn value_options(&self) -> Vec<SelectItem> {
        self.get("value_options")
            .and_then(|value| value.as_options().map(<[SelectItem]>::to_vec))
            .unwrap_or_default()
    }

    /// The form's active language. Only the root carries it.
    pub fn active_language(&self) -> Option<String> {
        self.get("active_language")
            .and_then(|value| value.as_str().map(str::to_string))
    }

    /// Children materialized from the recorded child ids. Ids with no
    /// matching node are reported per the form's consistency policy and
    /// skipped.
    pub fn children(&self) -> Vec<Node> {
        let Some(ids) = self.get("children") else {
            return Vec::new();
        };
        let Some(ids) = ids.as_node_ids() else {
            return Vec::new();
        };
        let Some(store) = self.node.children_store() else {
            return Vec::new();
        };

        let mut children = Vec::with_capacity(ids.len());
        for &id in ids {
            match store.find(id) {
                Some(child) => children.push(child),
                None => {
                    let reference = untrack(|| self.node.reference());
                    self.node
                        .document()
                        .config
                        .consistency_checks
                        .report(EngineError::Consistency {
                            reference,
                            detail: format!("child {id} is recorded but not present"),
                        });
                }
            }
        }
        children
    }
}

impl fmt::Debug for CurrentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CurrentState")
            .field("node", &self.node)
            .finish_non_exhaustive()
    }
}
