//! Value nodes: leaves holding an instance value.
//!
//! The value is stored as its instance string. Host input passes through
//! the node's codec before it is stored, so the instance string is always
//! in normal form.

use std::rc::{Rc, Weak};

use tracing::{debug, warn};

use super::select::SelectState;
use super::validation::LeafValidation;
use super::{InstanceNode, Node, NodePayload, NodeType, Root};
use crate::codec::{InstanceAttachment, RuntimeValue, SharedValueCodec, ValueInput};
use crate::definition::{BodyElement, NodeDefinitionKind, NodeDefinitionRef, RangeDefinition};
use crate::error::{EngineError, Result};
use crate::reactive::{untrack, Effect, Memo, Runtime, Signal};
use crate::state::StateValue;
use crate::xpath::{create_computed_expression, ComputedExpressionOptions};

/// Control-specific value behavior.
pub(crate) enum ValueControl {
    Plain,
    Select(SelectState),
    Range(RangeDefinition),
    Trigger,
    Upload(Signal<Option<InstanceAttachment>>),
}

pub(crate) struct ValueState {
    pub(crate) codec: SharedValueCodec,
    value: Signal<String>,
    pub(crate) control: ValueControl,
    calculate: Option<Memo<String>>,
    pub(crate) validation: LeafValidation,
}

impl ValueState {
    pub(super) fn new(
        this: &Weak<InstanceNode>,
        definition: &NodeDefinitionRef,
        node_type: NodeType,
        codec: SharedValueCodec,
    ) -> Self {
        let initial = default_value(definition);
        let initial = codec
            .encode(&codec.decode(initial))
            .unwrap_or_else(|| initial.to_string());

        let control = match (node_type, definition.body()) {
            (NodeType::Select, Some(BodyElement::Select1(select))) => {
                ValueControl::Select(SelectState::new(this, select, false))
            }
            (NodeType::Select, Some(BodyElement::Select(select)))
            | (NodeType::Rank, Some(BodyElement::Rank(select))) => {
                ValueControl::Select(SelectState::new(this, select, true))
            }
            (NodeType::Range, Some(BodyElement::Range(range))) => {
                ValueControl::Range(range.clone())
            }
            (NodeType::Trigger, _) => ValueControl::Trigger,
            (NodeType::Upload, _) => ValueControl::Upload(Signal::new(None)),
            _ => ValueControl::Plain,
        };

        let bind = definition.bind();
        let calculate = bind.calculate.as_ref().map(|expression| {
            create_computed_expression(
                this.clone(),
                expression.clone(),
                ComputedExpressionOptions::new(String::new()),
            )
        });

        Self {
            codec,
            value: Signal::new(initial),
            control,
            calculate,
            validation: LeafValidation::new(this, bind),
        }
    }

    /// Read the value within the current tracking context.
    pub(super) fn subscribe(&self) {
        self.value.with(|_| ());
    }
}

fn default_value(definition: &NodeDefinitionRef) -> &str {
    match definition {
        NodeDefinitionRef::Node(node) => match &node.kind {
            NodeDefinitionKind::Leaf { default_value } => default_value,
            _ => "",
        },
        _ => "",
    }
}

/// Write calculated values while the node is relevant. A non-relevant
/// calculated node keeps its last value.
pub(super) fn install_calculation(node: &Node) {
    let Some(state) = node.value_state() else {
        return;
    };
    if state.calculate.is_none() {
        return;
    }

    let this = Rc::downgrade(&node.0);
    node.scope.run_task(|| {
        Effect::new(move || {
            let Some(node) = this.upgrade() else {
                return;
            };
            let Some(ValueState {
                calculate: Some(calculate),
                codec,
                value,
                ..
            }) = node.value_state()
            else {
                return;
            };
            if !node.is_relevant() {
                return;
            }

            let computed = calculate.get();
            match codec.normalize(ValueInput::String(computed)) {
                Ok(encoded) => {
                    untrack(|| value.set(encoded));
                }
                Err(detail) => {
                    let reference = untrack(|| node.reference());
                    warn!(%reference, %detail, "calculated value does not fit its type");
                }
            }
        });
    });
}

impl InstanceNode {
    pub(crate) fn value_state(&self) -> Option<&ValueState> {
        match &self.payload {
            NodePayload::Value(state) => Some(state),
            _ => None,
        }
    }

    /// The instance string of a value node; empty for other nodes. Reactive.
    pub(crate) fn instance_value(&self) -> String {
        self.value_state()
            .map(|state| state.value.get())
            .unwrap_or_default()
    }

    /// The decoded value of a value node. Reactive.
    pub fn value(&self) -> Option<RuntimeValue> {
        self.value_state()
            .map(|state| state.value.with(|value| state.codec.decode(value)))
    }

    /// The file attached to an upload node.
    pub fn attachment(&self) -> Option<InstanceAttachment> {
        match self.value_state().map(|state| &state.control) {
            Some(ValueControl::Upload(attachment)) => attachment.get(),
            _ => None,
        }
    }

    /// Set the value of a value node.
    ///
    /// Fails for non-value nodes, readonly nodes, input the node's type
    /// cannot hold and, for range controls, values outside the bounds.
    pub fn set_value(&self, input: impl Into<ValueInput>) -> Result<Root> {
        let state = self
            .value_state()
            .ok_or(EngineError::UnsupportedOperation {
                operation: "set_value",
                node_type: self.node_type,
            })?;

        let reference = untrack(|| self.reference());
        if untrack(|| self.is_readonly()) {
            return Err(EngineError::ReadonlyWrite { reference });
        }

        let input = input.into();
        let invalid = |detail: String| EngineError::InvalidValueInput {
            reference: reference.clone(),
            detail,
        };

        let mut attachment = None;
        let encoded = match &state.control {
            ValueControl::Trigger => trigger_value(input).map_err(invalid)?,
            ValueControl::Upload(_) => {
                let file = match input {
                    ValueInput::Attachment(file) => Some(file),
                    ValueInput::Null => None,
                    other => return Err(invalid(format!("{other:?} is not an attachment"))),
                };
                let encoded = match &file {
                    Some(file) => state
                        .codec
                        .normalize(ValueInput::Attachment(file.clone()))
                        .map_err(invalid)?,
                    None => String::new(),
                };
                attachment = Some(file);
                encoded
            }
            ValueControl::Range(range) => {
                let encoded = state.codec.normalize(input).map_err(invalid)?;
                if !check_bounds(range, &state.codec.decode(&encoded)) {
                    return Err(EngineError::ValueOutOfRange {
                        reference,
                        value: encoded,
                    });
                }
                encoded
            }
            ValueControl::Select(select) => {
                let encoded = state.codec.normalize(input).map_err(invalid)?;
                let count = encoded.split_whitespace().count();
                if !select.accepts(count) {
                    return Err(invalid(format!("{count} values given to a single select")));
                }
                encoded
            }
            ValueControl::Plain => state.codec.normalize(input).map_err(invalid)?,
        };

        Runtime::batch(|| {
            if let (Some(file), ValueControl::Upload(signal)) = (attachment, &state.control) {
                signal.set(file);
            }
            self.engine_state.set("value", StateValue::String(encoded))
        })?;

        debug!(%reference, "set value");
        Ok(self.root())
    }

    /// Store an instance string. Used by the `value` state property.
    pub(crate) fn write_instance_value(&self, value: StateValue) -> Result<()> {
        let Some(state) = self.value_state() else {
            return Err(EngineError::UnsupportedOperation {
                operation: "set_value",
                node_type: self.node_type,
            });
        };
        match value {
            StateValue::String(value) => {
                state.value.set(value);
                Ok(())
            }
            StateValue::Null => {
                state.value.set(String::new());
                Ok(())
            }
            other => Err(EngineError::InvalidValueInput {
                reference: untrack(|| self.reference()),
                detail: format!("{other:?} is not an instance value"),
            }),
        }
    }
}

/// Triggers hold `OK` once acknowledged, blank otherwise.
fn trigger_value(input: ValueInput) -> std::result::Result<String, String> {
    match input {
        ValueInput::Null | ValueInput::Boolean(false) => Ok(String::new()),
        ValueInput::Boolean(true) => Ok("OK".to_string()),
        ValueInput::String(value) if value.is_empty() || value == "OK" => Ok(value),
        other => Err(format!("{other:?} is not a trigger acknowledgement")),
    }
}

fn check_bounds(range: &RangeDefinition, value: &RuntimeValue) -> bool {
    let number = match value {
        RuntimeValue::Int(Some(value)) => *value as f64,
        RuntimeValue::Decimal(Some(value)) => *value,
        _ => return true,
    };
    let (low, high) = if range.start <= range.end {
        (range.start, range.end)
    } else {
        (range.end, range.start)
    };
    (low..=high).contains(&number)
}
