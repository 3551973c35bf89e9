//! Form definition model
//!
//! The immutable description of a form that the engine instantiates. It is
//! produced by an XForm parser outside this crate and usually arrives as
//! JSON ([`FormDefinition::from_json`]).

mod bind;
mod body;
mod node;

use std::rc::Rc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub use bind::BindDefinition;
pub use body::{
    BodyElement, ControlText, ItemDefinition, ItemsetDefinition, RangeDefinition,
    SelectDefinition, UploadDefinition,
};
pub use node::{NodeDefinition, NodeDefinitionKind};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionMethod {
    #[default]
    Post,
    Put,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmissionDefinition {
    pub action: Option<String>,
    pub method: SubmissionMethod,
}

/// The primary instance root element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootDefinition {
    pub node_name: String,
    /// Namespace declarations by prefix; the empty prefix is the default
    /// namespace.
    #[serde(default)]
    pub namespaces: IndexMap<String, String>,
    #[serde(default)]
    pub attributes: IndexMap<String, String>,
    #[serde(default)]
    pub bind: BindDefinition,
    #[serde(default)]
    pub children: Vec<Rc<NodeDefinition>>,
}

impl RootDefinition {
    pub fn new(node_name: impl Into<String>, children: Vec<NodeDefinition>) -> Self {
        Self {
            node_name: node_name.into(),
            namespaces: IndexMap::new(),
            attributes: IndexMap::new(),
            bind: BindDefinition::default(),
            children: children.into_iter().map(Rc::new).collect(),
        }
    }

    pub fn with_namespace(mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        self.namespaces.insert(prefix.into(), uri.into());
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormDefinition {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub submission: SubmissionDefinition,
    pub root: RootDefinition,
}

impl FormDefinition {
    pub fn new(title: impl Into<String>, root: RootDefinition) -> Self {
        Self {
            title: title.into(),
            submission: SubmissionDefinition::default(),
            root,
        }
    }

    /// Deserialize a definition from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// The definition a node was built from.
#[derive(Debug, Clone)]
pub enum NodeDefinitionRef {
    Root(Rc<FormDefinition>),
    Node(Rc<NodeDefinition>),
    /// An instance of `range`, shaped by `instance`.
    RepeatInstance {
        range: Rc<NodeDefinition>,
        instance: Rc<NodeDefinition>,
    },
}

impl NodeDefinitionRef {
    pub fn node_name(&self) -> &str {
        match self {
            Self::Root(form) => &form.root.node_name,
            Self::Node(node) => &node.node_name,
            Self::RepeatInstance { range, .. } => &range.node_name,
        }
    }

    /// Repeat instances share the bind of their range.
    pub fn bind(&self) -> &BindDefinition {
        match self {
            Self::Root(form) => &form.root.bind,
            Self::Node(node) => &node.bind,
            Self::RepeatInstance { range, .. } => &range.bind,
        }
    }

    pub fn body(&self) -> Option<&BodyElement> {
        match self {
            Self::Node(node) => node.body.as_ref(),
            Self::Root(_) | Self::RepeatInstance { .. } => None,
        }
    }

    pub fn children(&self) -> &[Rc<NodeDefinition>] {
        match self {
            Self::Root(form) => &form.root.children,
            Self::Node(node) => node.children(),
            Self::RepeatInstance { instance, .. } => instance.children(),
        }
    }
}
