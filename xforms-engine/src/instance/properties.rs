//! Engine state records for instance nodes.

use std::rc::Weak;

use tracing::debug;

use super::{InstanceNode, NodeId, NodeType};
use crate::error::{EngineError, Result};
use crate::state::{EngineState, PropertySpec, SpecifiedState, StateValue};

/// A computed property reading from a live node. Reads `Null` once the
/// node is gone.
fn computed(
    this: &Weak<InstanceNode>,
    read: impl Fn(&InstanceNode) -> StateValue + 'static,
) -> PropertySpec {
    let this = this.clone();
    PropertySpec::computed(move || match this.upgrade() {
        Some(node) => read(&node),
        None => StateValue::Null,
    })
}

pub(super) fn engine_state(this: &Weak<InstanceNode>, id: NodeId, node_type: NodeType) -> EngineState {
    let mut state = SpecifiedState::new()
        .with("node_id", PropertySpec::Static(StateValue::String(id.to_string())))
        .with("node_type", PropertySpec::Static(node_type.as_str().into()))
        .with("reference", computed(this, |node| node.reference().into()))
        .with("relevant", computed(this, |node| node.is_relevant().into()))
        .with("readonly", computed(this, |node| node.is_readonly().into()))
        .with("required", computed(this, |node| node.is_required().into()))
        .with("label", computed(this, |node| node.label().into()))
        .with("hint", computed(this, |node| node.hint().into()));

    if node_type.is_parent() {
        state = state.with("children", computed(this, |node| node.child_ids().into()));
    }

    if node_type.is_value_node() {
        let read = this.clone();
        let write = this.clone();
        state = state.with(
            "value",
            PropertySpec::mutable(
                move || {
                    read.upgrade()
                        .and_then(|node| node.value())
                        .into()
                },
                move |value| match write.upgrade() {
                    Some(node) => node.write_instance_value(value),
                    None => Ok(()),
                },
            ),
        );
    }

    if matches!(node_type, NodeType::Select | NodeType::Rank) {
        state = state.with(
            "value_options",
            computed(this, |node| node.value_options().into()),
        );
    }

    if node_type == NodeType::Root {
        let read = this.clone();
        let write = this.clone();
        state = state.with(
            "active_language",
            PropertySpec::mutable(
                move || {
                    read.upgrade()
                        .and_then(|node| node.document.active_language.get())
                        .into()
                },
                move |value| match write.upgrade() {
                    Some(node) => set_active_language(&node, value),
                    None => Ok(()),
                },
            ),
        );
    }

    EngineState::new(state)
}

fn set_active_language(root: &InstanceNode, value: StateValue) -> Result<()> {
    let document = &root.document;
    let language = match value {
        StateValue::String(language) => language,
        other => {
            return Err(EngineError::InvalidValueInput {
                reference: "active_language".to_string(),
                detail: format!("{other:?} is not a language"),
            })
        }
    };

    if !document.evaluator.languages().contains(&language) {
        return Err(EngineError::UnknownLanguage { language });
    }

    document.evaluator.set_active_language(&language);
    document.active_language.set(Some(language.clone()));
    debug!(%language, "active language changed");
    Ok(())
}
