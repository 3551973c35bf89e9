use std::rc::Rc;

use serde::{Deserialize, Serialize};

use super::{BindDefinition, BodyElement};

/// One element of the primary instance model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDefinition {
    pub node_name: String,
    #[serde(default)]
    pub bind: BindDefinition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<BodyElement>,
    #[serde(flatten)]
    pub kind: NodeDefinitionKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum NodeDefinitionKind {
    /// An element with element children.
    Subtree {
        #[serde(default)]
        children: Vec<Rc<NodeDefinition>>,
    },

    /// A repeated element. `template` shapes new instances; `instances`
    /// are the ones present in the form as authored.
    Repeat {
        template: Rc<NodeDefinition>,
        #[serde(default)]
        instances: Vec<Rc<NodeDefinition>>,
    },

    /// An element holding a value.
    Leaf {
        #[serde(default)]
        default_value: String,
    },
}

impl NodeDefinition {
    pub fn leaf(node_name: impl Into<String>) -> Self {
        Self {
            node_name: node_name.into(),
            bind: BindDefinition::default(),
            body: None,
            kind: NodeDefinitionKind::Leaf {
                default_value: String::new(),
            },
        }
    }

    pub fn subtree(node_name: impl Into<String>, children: Vec<NodeDefinition>) -> Self {
        Self {
            node_name: node_name.into(),
            bind: BindDefinition::default(),
            body: None,
            kind: NodeDefinitionKind::Subtree {
                children: children.into_iter().map(Rc::new).collect(),
            },
        }
    }

    /// A repeat whose instances have `children`, with no authored instances.
    pub fn repeat(node_name: impl Into<String>, children: Vec<NodeDefinition>) -> Self {
        let node_name = node_name.into();
        let template = NodeDefinition::subtree(node_name.clone(), children);
        Self {
            node_name,
            bind: BindDefinition::default(),
            body: None,
            kind: NodeDefinitionKind::Repeat {
                template: Rc::new(template),
                instances: Vec::new(),
            },
        }
    }

    pub fn with_bind(mut self, bind: BindDefinition) -> Self {
        self.bind = bind;
        self
    }

    pub fn with_body(mut self, body: BodyElement) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        if let NodeDefinitionKind::Leaf { default_value } = &mut self.kind {
            *default_value = value.into();
        }
        self
    }

    /// Add `count` authored instances built from the template.
    pub fn with_initial_instances(mut self, count: usize) -> Self {
        if let NodeDefinitionKind::Repeat {
            template,
            instances,
        } = &mut self.kind
        {
            instances.extend(std::iter::repeat_with(|| Rc::clone(template)).take(count));
        }
        self
    }

    /// Element children; empty for leaves and repeats.
    pub fn children(&self) -> &[Rc<NodeDefinition>] {
        match &self.kind {
            NodeDefinitionKind::Subtree { children } => children,
            NodeDefinitionKind::Repeat { .. } | NodeDefinitionKind::Leaf { .. } => &[],
        }
    }
}
