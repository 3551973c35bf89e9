//! Select and rank controls.

use std::rc::Weak;

use serde::Serialize;
use tracing::error;

use super::value_node::ValueControl;
use super::{InstanceNode, Root};
use crate::codec::{RuntimeValue, ValueInput};
use crate::definition::{ItemsetDefinition, SelectDefinition};
use crate::error::{EngineError, Result};
use crate::reactive::Memo;
use crate::text::{evaluate_text, TextChunk, TextRange, TextRole, TextSource};
use crate::xpath::{evaluate_in_context, is_translated, ContextNode, EvaluationContext};

/// One choice of a select or rank control.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectItem {
    pub value: String,
    pub label: Option<TextRange>,
}

pub(crate) struct SelectState {
    /// `false` for `select1`.
    multiple: bool,
    options: Memo<Vec<SelectItem>>,
}

impl SelectState {
    /// Check if a selection of `count` values fits this control.
    pub(super) fn accepts(&self, count: usize) -> bool {
        self.multiple || count <= 1
    }

    pub(super) fn new(this: &Weak<InstanceNode>, definition: &SelectDefinition, multiple: bool) -> Self {
        let this = this.clone();
        let definition = definition.clone();

        let options = Memo::with_fallback(Vec::new(), move || {
            let Some(node) = this.upgrade() else {
                return Vec::new();
            };
            if !node.is_attached() {
                return Vec::new();
            }
            node.reference();

            let context = node.context_node();
            let mut items: Vec<SelectItem> = definition
                .items
                .iter()
                .map(|item| SelectItem {
                    value: item.value.clone(),
                    label: Some(evaluate_text(&*node, &context, TextRole::ItemLabel, &item.label)),
                })
                .collect();

            if let Some(itemset) = &definition.itemset {
                items.extend(itemset_items(&node, &context, itemset));
            }
            items
        });

        Self { multiple, options }
    }
}

fn itemset_items(
    node: &InstanceNode,
    context: &ContextNode,
    itemset: &ItemsetDefinition,
) -> Vec<SelectItem> {
    let report = |expression: &str, err: &dyn std::fmt::Display| {
        error!(reference = %node.reference(), expression, error = %err, "itemset evaluation failed");
    };

    let item_nodes =
        match evaluate_in_context::<Vec<ContextNode>, InstanceNode>(node, context, &itemset.nodes) {
            Ok(nodes) => nodes,
            Err(err) => {
                report(&itemset.nodes, &err);
                return Vec::new();
            }
        };

    let label_source = if is_translated(&itemset.label) {
        TextSource::Translation
    } else {
        TextSource::Output
    };

    item_nodes
        .iter()
        .map(|item| {
            let value = evaluate_in_context::<String, InstanceNode>(node, item, &itemset.value)
                .unwrap_or_else(|err| {
                    report(&itemset.value, &err);
                    String::new()
                });
            let label = evaluate_in_context::<String, InstanceNode>(node, item, &itemset.label)
                .unwrap_or_else(|err| {
                    report(&itemset.label, &err);
                    String::new()
                });
            SelectItem {
                value,
                label: Some(TextRange::new(
                    TextRole::ItemLabel,
                    vec![TextChunk {
                        source: label_source,
                        text: label,
                    }],
                )),
            }
        })
        .collect()
}

impl InstanceNode {
    fn select_state(&self, operation: &'static str) -> Result<&SelectState> {
        match self.value_state().map(|state| &state.control) {
            Some(ValueControl::Select(select)) => Ok(select),
            _ => Err(EngineError::UnsupportedOperation {
                operation,
                node_type: self.node_type,
            }),
        }
    }

    /// Available choices of a select or rank control. Reactive.
    pub fn value_options(&self) -> Vec<SelectItem> {
        self.select_state("value_options")
            .map(|select| select.options.get())
            .unwrap_or_default()
    }

    /// Selected values, in stored order. Reactive.
    pub fn selected_values(&self) -> Vec<String> {
        match self.value() {
            Some(RuntimeValue::Values(values)) => values,
            _ => Vec::new(),
        }
    }

    /// Select a single value, or clear the selection with `None`.
    pub fn select_value(&self, value: Option<&str>) -> Result<Root> {
        self.select_state("select_value")?;
        let values = value.map(|value| vec![value.to_string()]).unwrap_or_default();
        self.set_value(ValueInput::Values(values))
    }

    /// Replace the selection. `select1` controls accept at most one value.
    pub fn select_values<I, S>(&self, values: I) -> Result<Root>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select_state("select_values")?;
        let values: Vec<String> = values.into_iter().map(Into::into).collect();
        self.set_value(ValueInput::Values(values))
    }

    pub fn is_selected(&self, value: &str) -> bool {
        self.selected_values().iter().any(|selected| selected == value)
    }

    /// The option carrying `value`, if any.
    pub fn get_value_option(&self, value: &str) -> Option<SelectItem> {
        self.value_options()
            .into_iter()
            .find(|option| option.value == value)
    }
}
