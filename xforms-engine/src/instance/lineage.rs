//! Reference and inherited state (relevance, readonly) of a node.

use std::rc::Weak;

use super::{repeat, InstanceNode, NodeType};
use crate::definition::NodeDefinitionRef;
use crate::reactive::Memo;
use crate::xpath::{create_computed_expression, ComputedExpressionOptions};

/// A value that is either fixed or computed.
pub(crate) enum Derived<T: Clone + PartialEq + 'static> {
    Static(T),
    Computed(Memo<T>),
}

impl<T: Clone + PartialEq + 'static> Derived<T> {
    pub(crate) fn get(&self) -> T {
        match self {
            Self::Static(value) => value.clone(),
            Self::Computed(memo) => memo.get(),
        }
    }
}

/// Build a boolean bind expression, or a constant when absent.
pub(super) fn bind_expression(
    this: &Weak<InstanceNode>,
    expression: Option<&String>,
    absent: bool,
) -> Derived<bool> {
    match expression {
        Some(expression) => Derived::Computed(create_computed_expression(
            this.clone(),
            expression.clone(),
            ComputedExpressionOptions::new(absent),
        )),
        None => Derived::Static(absent),
    }
}

pub(crate) struct Lineage {
    reference: Memo<String>,
    self_relevant: Derived<bool>,
    self_readonly: Derived<bool>,
    required: Derived<bool>,
    relevant: Memo<bool>,
    readonly: Memo<bool>,
}

impl Lineage {
    pub(super) fn new(
        this: &Weak<InstanceNode>,
        node_type: NodeType,
        definition: &NodeDefinitionRef,
    ) -> Self {
        let bind = definition.bind();

        let self_relevant = if node_type.is_repeat_range() {
            Derived::Computed(repeat::range_self_relevance(this, bind.relevant.clone()))
        } else {
            bind_expression(this, bind.relevant.as_ref(), true)
        };

        let self_readonly = match (&bind.readonly, &bind.calculate) {
            _ if node_type.is_repeat_range() => Derived::Static(false),
            (Some(expression), _) => bind_expression(this, Some(expression), false),
            (None, calculate) => Derived::Static(calculate.is_some()),
        };

        let required = if node_type.is_value_node() {
            bind_expression(this, bind.required.as_ref(), false)
        } else {
            Derived::Static(false)
        };

        Self {
            reference: reference(this),
            self_relevant,
            self_readonly,
            required,
            relevant: inherited(this, true, |node| {
                !node.has_non_relevant_ancestor() && node.is_self_relevant()
            }),
            readonly: inherited(this, false, |node| {
                node.has_readonly_ancestor() || node.is_self_readonly()
            }),
        }
    }

    pub(crate) fn reference(&self) -> String {
        self.reference.get()
    }

    pub(crate) fn is_self_relevant(&self) -> bool {
        self.self_relevant.get()
    }

    pub(crate) fn is_relevant(&self) -> bool {
        self.relevant.get()
    }

    pub(crate) fn is_self_readonly(&self) -> bool {
        self.self_readonly.get()
    }

    pub(crate) fn is_readonly(&self) -> bool {
        self.readonly.get()
    }

    pub(crate) fn is_required(&self) -> bool {
        self.required.get()
    }
}

/// `/name` for the root, `parent[n]` for repeat instances, `parent/name`
/// otherwise.
fn reference(this: &Weak<InstanceNode>) -> Memo<String> {
    let this = this.clone();
    Memo::with_fallback(String::new(), move || {
        let Some(node) = this.upgrade() else {
            return String::new();
        };
        match (node.parent(), node.repeat_index()) {
            (None, _) => format!("/{}", node.node_name()),
            (Some(parent), Some(index)) => format!("{}[{}]", parent.reference(), index + 1),
            (Some(parent), None) => format!("{}/{}", parent.reference(), node.node_name()),
        }
    })
}

fn inherited(
    this: &Weak<InstanceNode>,
    fallback: bool,
    compute: impl Fn(&InstanceNode) -> bool + 'static,
) -> Memo<bool> {
    let this = this.clone();
    Memo::with_fallback(fallback, move || {
        this.upgrade().is_some_and(|node| compute(&node))
    })
}
