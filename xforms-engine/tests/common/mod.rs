//! Shared test helpers: form builders and the test evaluator.

#![allow(dead_code)]

pub mod xpath;

use std::rc::Rc;

use xforms_engine::definition::{BindDefinition, ControlText, NodeDefinition, RootDefinition};
use xforms_engine::text::TextDefinition;
use xforms_engine::{initialize_form, FormDefinition, InitializeFormOptions, Node, Root};

pub use xpath::TestEvaluator;

/// Build a form rooted at `<data>` with the default evaluator.
pub fn form(children: Vec<NodeDefinition>) -> Root {
    form_with(children, TestEvaluator::new(), InitializeFormOptions::default())
}

pub fn form_with(
    children: Vec<NodeDefinition>,
    evaluator: TestEvaluator,
    options: InitializeFormOptions,
) -> Root {
    let definition = FormDefinition::new("Test form", RootDefinition::new("data", children));
    initialize_form(definition, Rc::new(evaluator), options).expect("form initializes")
}

/// An input control holding a string.
pub fn input(name: &str) -> NodeDefinition {
    NodeDefinition::leaf(name).with_body(xforms_engine::definition::BodyElement::Input(
        ControlText::default(),
    ))
}

/// An input control with a label.
pub fn labelled_input(name: &str, label: impl Into<TextDefinition>) -> NodeDefinition {
    NodeDefinition::leaf(name).with_body(xforms_engine::definition::BodyElement::Input(
        ControlText {
            label: Some(label.into()),
            hint: None,
        },
    ))
}

pub fn bind() -> BindDefinition {
    BindDefinition::default()
}

/// The node at `reference`; panics when there is none.
pub fn node(root: &Root, reference: &str) -> Node {
    root.find_node(reference)
        .unwrap_or_else(|| panic!("no node at {reference}"))
}

/// The instance string of a value node.
pub fn value_of(node: &Node) -> String {
    node.current_state()
        .value()
        .map(|value| match value {
            xforms_engine::RuntimeValue::String(value) => value,
            other => format!("{other:?}"),
        })
        .unwrap_or_default()
}
