//! Validation state.
//!
//! A value node is in exactly one of three states: constraint violated,
//! required violated, or valid. Validation is always derived from current
//! values and never stored.

use std::rc::Weak;

use serde::Serialize;

use super::lineage::bind_expression;
use super::{InstanceNode, Node, NodeId};
use crate::definition::BindDefinition;
use crate::reactive::Memo;
use crate::text::{create_text_range, TextRange, TextRole};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationCondition {
    Constraint,
    Required,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    pub condition: ValidationCondition,
    pub message: Option<TextRange>,
}

/// A violation found below a container.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DescendantViolation {
    pub node_id: NodeId,
    pub reference: String,
    pub violation: Violation,
}

pub(crate) struct LeafValidation {
    violation: Memo<Option<Violation>>,
}

impl LeafValidation {
    pub(super) fn new(this: &Weak<InstanceNode>, bind: &BindDefinition) -> Self {
        let constraint = bind
            .constraint
            .as_ref()
            .map(|expression| bind_expression(this, Some(expression), true));
        let constraint_msg = bind
            .constraint_msg
            .clone()
            .map(|text| create_text_range(this.clone(), TextRole::ConstraintMsg, text));
        let required_msg = bind
            .required_msg
            .clone()
            .map(|text| create_text_range(this.clone(), TextRole::RequiredMsg, text));

        let this = this.clone();
        let violation = Memo::with_fallback(None, move || {
            let node = this.upgrade()?;
            if !node.is_attached() || !node.is_relevant() {
                return None;
            }

            let message = |text: &Option<Memo<Option<TextRange>>>| text.as_ref().and_then(Memo::get);

            if node.instance_value().is_empty() {
                return node.is_required().then(|| Violation {
                    condition: ValidationCondition::Required,
                    message: message(&required_msg),
                });
            }

            match &constraint {
                Some(constraint) if !constraint.get() => Some(Violation {
                    condition: ValidationCondition::Constraint,
                    message: message(&constraint_msg),
                }),
                _ => None,
            }
        });

        Self { violation }
    }

    fn violation(&self) -> Option<Violation> {
        self.violation.get()
    }
}

/// Validation view of a node.
#[derive(Debug, Clone)]
pub struct ValidationState {
    node: Node,
}

impl ValidationState {
    pub(crate) fn new(node: Node) -> Self {
        Self { node }
    }

    /// The node's own violation; always `None` for containers.
    pub fn violation(&self) -> Option<Violation> {
        self.node
            .value_state()
            .and_then(|state| state.validation.violation())
    }

    pub fn constraint_valid(&self) -> bool {
        !matches!(
            self.violation(),
            Some(Violation {
                condition: ValidationCondition::Constraint,
                ..
            })
        )
    }

    pub fn required_valid(&self) -> bool {
        !matches!(
            self.violation(),
            Some(Violation {
                condition: ValidationCondition::Required,
                ..
            })
        )
    }

    /// Every violation in this subtree, depth-first in document order.
    pub fn violations(&self) -> Vec<DescendantViolation> {
        let mut found = Vec::new();
        self.node.walk(&mut |node| {
            if let Some(violation) = node.validation_state().violation() {
                found.push(DescendantViolation {
                    node_id: node.node_id(),
                    reference: node.reference(),
                    violation,
                });
            }
        });
        found
    }

    pub fn is_valid(&self) -> bool {
        self.violations().is_empty()
    }
}
