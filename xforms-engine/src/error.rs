//! Engine errors.
//!
//! Every error returns synchronously from the operation that detected it.
//! Validation failures are not errors: they are reported as node state.

use crate::codec::ValueType;
use crate::instance::NodeType;
use crate::reactive::DisposedScopeError;
use crate::state::PropertyClassification;
use crate::xpath::XPathError;

/// Errors raised by form construction and node operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The definition pairs a control with a value type it cannot hold.
    #[error("{control} controls do not support value type {value_type}")]
    UnsupportedValueType {
        control: NodeType,
        value_type: ValueType,
    },

    /// The definition has a shape no node kind can be built from.
    #[error("cannot build node {node_name:?}: {reason}")]
    UnreachableDefinition { node_name: String, reason: String },

    /// Write to a computed or static state property.
    #[error("cannot write {classification} state property {key:?}")]
    StateWrite {
        key: String,
        classification: PropertyClassification,
    },

    /// Write to a state property the node does not have.
    #[error("no state property {key:?}")]
    UnknownProperty { key: String },

    /// Write to a value node that is currently readonly.
    #[error("node {reference} is readonly")]
    ReadonlyWrite { reference: String },

    /// The node kind has no semantics for the requested operation.
    #[error("{operation} is not supported by {node_type} nodes")]
    UnsupportedOperation {
        operation: &'static str,
        node_type: NodeType,
    },

    /// The value input cannot be represented by the node's value type.
    #[error("invalid value for {reference}: {detail}")]
    InvalidValueInput { reference: String, detail: String },

    /// A range control was given a value outside its bounds.
    #[error("value {value} is outside the bounds of {reference}")]
    ValueOutOfRange { reference: String, value: String },

    /// Recorded and materialized state disagree.
    #[error("inconsistent state at {reference}: {detail}")]
    Consistency { reference: String, detail: String },

    /// A repeat instance index past the current bounds.
    #[error("repeat instance index {index} is out of bounds (length {len})")]
    RepeatIndexOutOfBounds { index: usize, len: usize },

    /// A repeat edit would take the range past its instance cap.
    #[error("repeat {reference} cannot hold {requested} instances (max {max})")]
    RepeatLimitExceeded {
        reference: String,
        requested: usize,
        max: usize,
    },

    /// A known but not yet supported feature.
    #[error("not yet supported: {feature}")]
    Pending { feature: String },

    #[error("unknown language {language:?}")]
    UnknownLanguage { language: String },

    #[error(transparent)]
    DisposedScope(#[from] DisposedScopeError),

    #[error("evaluation failed: {0}")]
    Evaluation(#[from] XPathError),

    #[error("invalid form definition: {0}")]
    Definition(#[from] serde_json::Error),
}

impl EngineError {
    /// Check if this is a design-pending error rather than misuse.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;
