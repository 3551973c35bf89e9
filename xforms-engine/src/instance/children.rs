//! Children construction: maps definitions to node kinds and builds
//! subtrees.

use std::rc::Rc;

use super::{FormDocument, InstanceNode, Node, NodeType};
use crate::codec::{SharedValueCodec, ValueType};
use crate::definition::{BodyElement, NodeDefinition, NodeDefinitionKind, NodeDefinitionRef};
use crate::error::{EngineError, Result};

/// What kind of node a definition produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Blueprint {
    Container(NodeType),
    Range { controlled: bool },
    Instance,
    Value {
        node_type: NodeType,
        codec: SharedValueCodec,
    },
}

impl Blueprint {
    pub(crate) fn node_type(&self) -> NodeType {
        match *self {
            Self::Container(node_type) | Self::Value { node_type, .. } => node_type,
            Self::Range { controlled: true } => NodeType::RepeatRangeControlled,
            Self::Range { controlled: false } => NodeType::RepeatRangeUncontrolled,
            Self::Instance => NodeType::RepeatInstance,
        }
    }
}

pub(crate) fn classify(definition: &NodeDefinition) -> Result<Blueprint> {
    let unreachable = |reason: String| EngineError::UnreachableDefinition {
        node_name: definition.node_name.clone(),
        reason,
    };

    match (&definition.kind, &definition.body) {
        (NodeDefinitionKind::Subtree { .. }, None) => Ok(Blueprint::Container(NodeType::Subtree)),
        (NodeDefinitionKind::Subtree { .. }, Some(BodyElement::Group { .. })) => {
            Ok(Blueprint::Container(NodeType::Group))
        }
        (NodeDefinitionKind::Repeat { .. }, None) => Ok(Blueprint::Range { controlled: false }),
        (
            NodeDefinitionKind::Repeat { .. },
            Some(BodyElement::Repeat {
                count,
                no_add_remove,
                ..
            }),
        ) => Ok(Blueprint::Range {
            controlled: count.is_some() || *no_add_remove,
        }),
        (NodeDefinitionKind::Leaf { .. }, body) => classify_leaf(definition, body.as_ref()),
        (kind, Some(body)) => Err(unreachable(format!(
            "a {} body cannot present a {} node",
            body.type_name(),
            match kind {
                NodeDefinitionKind::Subtree { .. } => "subtree",
                NodeDefinitionKind::Repeat { .. } => "repeat",
                NodeDefinitionKind::Leaf { .. } => "leaf",
            }
        ))),
    }
}

fn classify_leaf(definition: &NodeDefinition, body: Option<&BodyElement>) -> Result<Blueprint> {
    let value_type = definition.bind.data_type;
    let unsupported = |control: NodeType| EngineError::UnsupportedValueType {
        control,
        value_type,
    };

    let (node_type, codec) = match body {
        None => (NodeType::ModelValue, scalar(value_type)?),
        Some(BodyElement::Input(_)) => {
            let node_type = if definition.bind.is_constant_readonly() {
                NodeType::Note
            } else {
                NodeType::Input
            };
            if value_type == ValueType::Binary {
                return Err(unsupported(node_type));
            }
            (node_type, scalar(value_type)?)
        }
        Some(BodyElement::Select1(_) | BodyElement::Select(_)) => {
            if value_type != ValueType::String {
                return Err(unsupported(NodeType::Select));
            }
            (NodeType::Select, SharedValueCodec::set())
        }
        Some(BodyElement::Rank(_)) => {
            if value_type != ValueType::String {
                return Err(unsupported(NodeType::Rank));
            }
            (NodeType::Rank, SharedValueCodec::array())
        }
        Some(BodyElement::Range(_)) => {
            if !value_type.is_numeric() {
                return Err(unsupported(NodeType::Range));
            }
            (NodeType::Range, scalar(value_type)?)
        }
        Some(BodyElement::Trigger(_)) => {
            if value_type != ValueType::String {
                return Err(unsupported(NodeType::Trigger));
            }
            (NodeType::Trigger, scalar(value_type)?)
        }
        Some(BodyElement::Upload(_)) => {
            if value_type != ValueType::Binary {
                return Err(unsupported(NodeType::Upload));
            }
            (NodeType::Upload, scalar(value_type)?)
        }
        Some(body @ (BodyElement::Group { .. } | BodyElement::Repeat { .. })) => {
            return Err(EngineError::UnreachableDefinition {
                node_name: definition.node_name.clone(),
                reason: format!("a {} body cannot present a leaf node", body.type_name()),
            });
        }
        Some(BodyElement::Unrecognized) => {
            return Err(EngineError::UnreachableDefinition {
                node_name: definition.node_name.clone(),
                reason: "unrecognized control".to_string(),
            });
        }
    };

    Ok(Blueprint::Value { node_type, codec })
}

fn scalar(value_type: ValueType) -> Result<SharedValueCodec> {
    SharedValueCodec::scalar(value_type).ok_or_else(|| EngineError::Pending {
        feature: format!("{value_type} values"),
    })
}

/// Build the root node and everything below it.
pub(crate) fn build_root(document: &Rc<FormDocument>) -> Result<Node> {
    let node = InstanceNode::create(
        document,
        None,
        NodeDefinitionRef::Root(Rc::clone(&document.definition)),
        Blueprint::Container(NodeType::Root),
        None,
    );
    finish(node)
}

/// Build a child of `parent` from `definition`.
pub(crate) fn build_node(parent: &Node, definition: &Rc<NodeDefinition>) -> Result<Node> {
    let blueprint = classify(definition)?;
    let node = InstanceNode::create(
        &parent.document,
        Some(parent),
        NodeDefinitionRef::Node(Rc::clone(definition)),
        blueprint,
        None,
    );
    finish(node)
}

/// Build an instance of `range` shaped by `instance`, at `index`.
pub(crate) fn build_repeat_instance(
    range: &Node,
    range_definition: &Rc<NodeDefinition>,
    instance: Rc<NodeDefinition>,
    index: usize,
) -> Result<Node> {
    let node = InstanceNode::create(
        &range.document,
        Some(range),
        NodeDefinitionRef::RepeatInstance {
            range: Rc::clone(range_definition),
            instance,
        },
        Blueprint::Instance,
        Some(index),
    );
    finish(node)
}

fn finish(node: Node) -> Result<Node> {
    if let Err(err) = populate(&node) {
        node.detach();
        // Nothing else holds the scope yet.
        let _ = node.scope.dispose();
        return Err(err);
    }
    Ok(node)
}

fn populate(node: &Node) -> Result<()> {
    if let Some(store) = node.children_store() {
        store.commit(build_children(node)?);
    }
    node.install_effects();
    node.init_client_state();
    Ok(())
}

fn build_children(parent: &Node) -> Result<Vec<Node>> {
    if parent.node_type.is_repeat_range() {
        let definition = parent.range_definition()?;
        let NodeDefinitionKind::Repeat { instances, .. } = &definition.kind else {
            return Ok(Vec::new());
        };
        return instances
            .iter()
            .enumerate()
            .map(|(index, instance)| {
                build_repeat_instance(parent, &definition, Rc::clone(instance), index)
            })
            .collect();
    }

    parent
        .definition
        .children()
        .iter()
        .map(|definition| build_node(parent, definition))
        .collect()
}

impl InstanceNode {
    /// Effects that keep a node consistent after construction.
    fn install_effects(&self) {
        let node = self.handle();
        match node.node_type {
            NodeType::RepeatRangeControlled | NodeType::RepeatRangeUncontrolled => {
                repeat_effects(&node);
            }
            node_type if node_type.is_value_node() => super::value_node::install_calculation(&node),
            _ => {}
        }
    }
}

fn repeat_effects(range: &Node) {
    super::repeat::install_renumbering(range);
    if range.node_type == NodeType::RepeatRangeControlled {
        super::repeat::install_count(range);
    }
}
