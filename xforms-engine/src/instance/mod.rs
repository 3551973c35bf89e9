//! Instance Tree
//!
//! The live form: one [`InstanceNode`] per element of the primary instance,
//! plus runtime-only repeat ranges. Nodes are handed out as [`Node`] handles.
//!
//! # Structure
//!
//! A node owns its children and its [`ReactiveScope`]. It refers to its
//! parent weakly and to the shared form document strongly. Every computation
//! a node creates (relevance, labels, calculations, validation) lives in the
//! node's scope, which is nested in the parent's, so detaching a subtree is
//! a single scope disposal.
//!
//! # State
//!
//! Each node has three views of its state:
//!
//! - engine state: the [`SpecifiedState`](crate::state::SpecifiedState)
//!   record the engine reads and writes
//! - client state: what the host observes, produced by the host's
//!   [`ReactiveObjectFactory`](crate::state::ReactiveObjectFactory)
//! - current state: the read-only facade returned by
//!   [`InstanceNode::current_state`]
//!
//! All writes go through node methods ([`InstanceNode::set_value`],
//! [`InstanceNode::add_instances`], [`Root::set_language`], ...).

mod children;
mod container;
mod lineage;
mod properties;
mod repeat;
mod root;
mod select;
mod submission;
mod validation;
mod value_node;
mod xml;

use std::cell::{Cell, OnceCell};
use std::fmt;
use std::ops::Deref;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tracing::debug;

use crate::definition::NodeDefinitionRef;
use crate::reactive::{Memo, ReactiveScope};
use crate::state::{ClientState, CurrentState, EngineState, StateValue};
use crate::text::{create_text_range, TextRange, TextRole};
use crate::xpath::{ContextNode, EvaluationContext, SubscribableDependency, XPathEvaluator};

use children::Blueprint;
use container::ChildrenStore;
use lineage::Lineage;
use repeat::{RepeatInstanceState, RepeatRangeState};
use value_node::ValueState;

pub(crate) use root::FormDocument;
pub use root::{initialize_form, Root};
pub use select::SelectItem;
pub use submission::{
    SubmissionAttachment, SubmissionData, SubmissionOptions, SubmissionResult, SubmissionState,
    SubmissionStatus,
};
pub use validation::{DescendantViolation, ValidationCondition, ValidationState, Violation};

/// Process-unique node identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(u64);

impl NodeId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeType {
    Root,
    Group,
    Subtree,
    RepeatRangeControlled,
    RepeatRangeUncontrolled,
    RepeatInstance,
    Input,
    Note,
    Select,
    Rank,
    Range,
    Trigger,
    Upload,
    ModelValue,
}

impl NodeType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Group => "group",
            Self::Subtree => "subtree",
            Self::RepeatRangeControlled => "repeat-range-controlled",
            Self::RepeatRangeUncontrolled => "repeat-range-uncontrolled",
            Self::RepeatInstance => "repeat-instance",
            Self::Input => "input",
            Self::Note => "note",
            Self::Select => "select",
            Self::Rank => "rank",
            Self::Range => "range",
            Self::Trigger => "trigger",
            Self::Upload => "upload",
            Self::ModelValue => "model-value",
        }
    }

    pub fn is_repeat_range(self) -> bool {
        matches!(self, Self::RepeatRangeControlled | Self::RepeatRangeUncontrolled)
    }

    /// Check if nodes of this type hold a value.
    pub fn is_value_node(self) -> bool {
        matches!(
            self,
            Self::Input
                | Self::Note
                | Self::Select
                | Self::Rank
                | Self::Range
                | Self::Trigger
                | Self::Upload
                | Self::ModelValue
        )
    }

    /// Check if nodes of this type have children.
    pub fn is_parent(self) -> bool {
        !self.is_value_node()
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind-specific node data.
pub(crate) enum NodePayload {
    Container(ChildrenStore),
    RepeatRange(RepeatRangeState),
    RepeatInstance(RepeatInstanceState),
    Value(ValueState),
}

/// A node of the instance tree.
pub struct InstanceNode {
    id: NodeId,
    node_type: NodeType,
    definition: NodeDefinitionRef,
    document: Rc<FormDocument>,
    parent: Weak<InstanceNode>,
    this: Weak<InstanceNode>,
    scope: ReactiveScope,
    attached: Cell<bool>,
    lineage: Lineage,
    label: Option<Memo<Option<TextRange>>>,
    hint: Option<Memo<Option<TextRange>>>,
    payload: NodePayload,
    engine_state: EngineState,
    client_state: OnceCell<ClientState>,
}

/// Shared handle to an [`InstanceNode`].
#[derive(Clone)]
pub struct Node(Rc<InstanceNode>);

impl Deref for Node {
    type Target = InstanceNode;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Node {}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("node_type", &self.node_type)
            .field("node_name", &self.node_name())
            .finish()
    }
}

impl InstanceNode {
    /// Allocate a node. Children, effects and client state are added by
    /// the builder once the node exists.
    fn create(
        document: &Rc<FormDocument>,
        parent: Option<&Node>,
        definition: NodeDefinitionRef,
        blueprint: Blueprint,
        index: Option<usize>,
    ) -> Node {
        let id = NodeId::next();
        let node_type = blueprint.node_type();
        let scope = match parent {
            Some(parent) => parent.scope.child(),
            None => ReactiveScope::root(),
        };

        let node = Rc::new_cyclic(|this: &Weak<InstanceNode>| {
            scope.run_task(|| {
                let body = definition.body();
                let label = body
                    .and_then(|body| body.label())
                    .map(|text| create_text_range(this.clone(), TextRole::Label, text.clone()));
                let hint = body
                    .and_then(|body| body.hint())
                    .map(|text| create_text_range(this.clone(), TextRole::Hint, text.clone()));

                let payload = match blueprint {
                    Blueprint::Container(_) => NodePayload::Container(ChildrenStore::new()),
                    Blueprint::Range { controlled } => NodePayload::RepeatRange(
                        RepeatRangeState::new(this, &definition, controlled),
                    ),
                    Blueprint::Instance => NodePayload::RepeatInstance(RepeatInstanceState::new(
                        index.unwrap_or_default(),
                    )),
                    Blueprint::Value { node_type, codec } => NodePayload::Value(ValueState::new(
                        this,
                        &definition,
                        node_type,
                        codec,
                    )),
                };

                InstanceNode {
                    id,
                    node_type,
                    lineage: Lineage::new(this, node_type, &definition),
                    engine_state: properties::engine_state(this, id, node_type),
                    definition,
                    document: Rc::clone(document),
                    parent: parent.map(|parent| Rc::downgrade(&parent.0)).unwrap_or_default(),
                    this: this.clone(),
                    scope: scope.clone(),
                    attached: Cell::new(true),
                    label,
                    hint,
                    payload,
                    client_state: OnceCell::new(),
                }
            })
        });

        debug!(node = %id, node_type = %node_type, name = node.node_name(), "created node");
        Node(node)
    }

    /// Handle to this node.
    fn handle(&self) -> Node {
        Node(self.this.upgrade().expect("node is alive while borrowed"))
    }

    pub fn node_id(&self) -> NodeId {
        self.id
    }

    pub fn node_type(&self) -> NodeType {
        self.node_type
    }

    pub fn definition(&self) -> &NodeDefinitionRef {
        &self.definition
    }

    pub fn node_name(&self) -> &str {
        self.definition.node_name()
    }

    /// The parent node; `None` for the root. Repeat instances have their
    /// range as parent.
    pub fn parent(&self) -> Option<Node> {
        self.parent.upgrade().map(Node)
    }

    /// The root of the tree this node belongs to.
    pub fn root(&self) -> Root {
        Root::from_node(self.root_node())
    }

    pub fn current_state(&self) -> CurrentState {
        CurrentState::new(self.handle())
    }

    pub fn validation_state(&self) -> ValidationState {
        ValidationState::new(self.handle())
    }

    pub fn submission_state(&self) -> SubmissionState {
        SubmissionState::new(self.handle())
    }

    pub(crate) fn document(&self) -> &FormDocument {
        &self.document
    }

    pub(crate) fn scope(&self) -> &ReactiveScope {
        &self.scope
    }

    pub(crate) fn engine_state(&self) -> &EngineState {
        &self.engine_state
    }

    /// Read a client state property, falling back to engine state while
    /// the node is still being built.
    pub(crate) fn client_property(&self, key: &str) -> Option<StateValue> {
        match self.client_state.get() {
            Some(client) => client.get(key),
            None => self.engine_state.get(key),
        }
    }

    fn init_client_state(&self) {
        let client = ClientState::new(
            &self.engine_state,
            &*self.document.state_factory,
            &self.scope,
        );
        // Set once, right after construction.
        let _ = self.client_state.set(client);
    }

    /// Absolute location path. Reactive.
    pub(crate) fn reference(&self) -> String {
        self.lineage.reference()
    }

    /// Relevance from the node's own bind, ignoring ancestors. Reactive.
    pub fn is_self_relevant(&self) -> bool {
        self.lineage.is_self_relevant()
    }

    pub(crate) fn has_non_relevant_ancestor(&self) -> bool {
        self.parent().is_some_and(|parent| !parent.is_relevant())
    }

    pub(crate) fn is_relevant(&self) -> bool {
        self.lineage.is_relevant()
    }

    pub(crate) fn is_self_readonly(&self) -> bool {
        self.lineage.is_self_readonly()
    }

    pub(crate) fn has_readonly_ancestor(&self) -> bool {
        self.parent().is_some_and(|parent| parent.is_readonly())
    }

    pub(crate) fn is_readonly(&self) -> bool {
        self.lineage.is_readonly()
    }

    pub(crate) fn is_required(&self) -> bool {
        self.lineage.is_required()
    }

    pub(crate) fn label(&self) -> Option<TextRange> {
        self.label.as_ref().and_then(Memo::get)
    }

    pub(crate) fn hint(&self) -> Option<TextRange> {
        self.hint.as_ref().and_then(Memo::get)
    }

    pub fn is_value_node(&self) -> bool {
        self.node_type.is_value_node()
    }

    pub(crate) fn children_store(&self) -> Option<&ChildrenStore> {
        match &self.payload {
            NodePayload::Container(children) => Some(children),
            NodePayload::RepeatRange(range) => Some(&range.children),
            NodePayload::RepeatInstance(instance) => Some(&instance.children),
            NodePayload::Value(_) => None,
        }
    }

    /// Children in order; empty for value nodes. Reactive.
    pub(crate) fn child_nodes(&self) -> Vec<Node> {
        self.children_store()
            .map(ChildrenStore::nodes)
            .unwrap_or_default()
    }

    pub(crate) fn child_nodes_untracked(&self) -> Vec<Node> {
        self.children_store()
            .map(ChildrenStore::nodes_untracked)
            .unwrap_or_default()
    }

    pub(crate) fn child_ids(&self) -> Vec<NodeId> {
        self.children_store()
            .map(ChildrenStore::ids)
            .unwrap_or_default()
    }

    /// Parent element in the instance document. Repeat ranges are skipped.
    pub(crate) fn xml_parent(&self) -> Option<Node> {
        let parent = self.parent()?;
        if parent.node_type.is_repeat_range() {
            parent.parent()
        } else {
            Some(parent)
        }
    }

    /// Child elements in the instance document: repeat ranges are replaced
    /// by their instances. Reactive.
    pub(crate) fn xml_children(&self) -> Vec<Node> {
        let mut elements = Vec::new();
        for child in self.child_nodes() {
            if child.node_type.is_repeat_range() {
                elements.extend(child.child_nodes());
            } else {
                elements.push(child);
            }
        }
        elements
    }

    pub(crate) fn root_node(&self) -> Node {
        let mut node = self.handle();
        while let Some(parent) = node.parent() {
            node = parent;
        }
        node
    }

    pub(crate) fn is_attached(&self) -> bool {
        self.attached.get()
    }

    /// Mark this subtree detached. Its scope is disposed by the caller.
    pub(crate) fn detach(&self) {
        for child in self.child_nodes_untracked() {
            child.detach();
        }
        self.attached.set(false);
    }

    /// Visit this node and its descendants depth-first, in document order.
    pub(crate) fn walk(&self, visit: &mut dyn FnMut(&Node)) {
        let node = self.handle();
        visit(&node);
        for child in node.child_nodes() {
            child.walk(visit);
        }
    }
}

impl EvaluationContext for InstanceNode {
    fn context_node(&self) -> ContextNode {
        if self.node_type.is_repeat_range() {
            ContextNode::RepeatAnchor(self.handle())
        } else {
            ContextNode::Instance(self.handle())
        }
    }

    fn context_reference(&self) -> String {
        self.reference()
    }

    fn evaluator(&self) -> Rc<dyn XPathEvaluator> {
        Rc::clone(&self.document.evaluator)
    }

    fn is_attached(&self) -> bool {
        self.attached.get()
    }

    fn active_language(&self) -> Option<String> {
        self.document.active_language.get()
    }
}

impl SubscribableDependency for InstanceNode {
    fn subscribe(&self) {
        match &self.payload {
            NodePayload::Value(state) => {
                state.subscribe();
            }
            NodePayload::RepeatRange(range) => {
                range.children.ids();
                self.is_relevant();
            }
            NodePayload::Container(_) | NodePayload::RepeatInstance(_) => {
                self.is_relevant();
            }
        }
    }
}
