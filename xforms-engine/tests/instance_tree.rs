//! Integration tests for the instance tree: construction, references,
//! inherited state, languages and host state.

mod common;

use std::rc::Rc;

use common::{bind, form, form_with, input, labelled_input, node, value_of, TestEvaluator};
use xforms_engine::definition::{BodyElement, NodeDefinition, RootDefinition};
use xforms_engine::state::SnapshotFactory;
use xforms_engine::text::TextDefinition;
use xforms_engine::{
    initialize_form, EngineError, FormDefinition, InitializeFormOptions, Node, NodeType,
    RuntimeValue, ValueType, XPathEvaluator,
};

fn assert_references(node: &Node) {
    let state = node.current_state();
    for (position, child) in state.children().iter().enumerate() {
        let expected = match child.node_type() {
            NodeType::RepeatInstance => format!("{}[{}]", state.reference(), position + 1),
            _ => format!("{}/{}", state.reference(), child.node_name()),
        };
        assert_eq!(child.current_state().reference(), expected);
        assert_references(child);
    }
}

#[test]
fn references_follow_the_tree() {
    let root = form(vec![
        input("name"),
        NodeDefinition::subtree("household", vec![input("size"), input("address")]),
        NodeDefinition::repeat("member", vec![input("age")]).with_initial_instances(2),
    ]);

    assert_eq!(root.current_state().reference(), "/data");
    assert_references(root.node());

    let age = node(&root, "/data/member[2]/age");
    assert_eq!(age.node_type(), NodeType::Input);
    assert_eq!(age.parent().unwrap().node_type(), NodeType::RepeatInstance);
}

#[test]
fn node_types_follow_definitions() {
    let root = form(vec![
        NodeDefinition::leaf("hidden"),
        NodeDefinition::subtree("meta", vec![]),
        NodeDefinition::subtree("section", vec![]).with_body(BodyElement::Group { label: None }),
        input("note").with_bind(bind().with_readonly("true()")),
    ]);

    let types: Vec<NodeType> = root
        .current_state()
        .children()
        .iter()
        .map(|child| child.node_type())
        .collect();
    assert_eq!(
        types,
        vec![NodeType::ModelValue, NodeType::Subtree, NodeType::Group, NodeType::Note]
    );
    assert_eq!(root.node_type(), NodeType::Root);
}

#[test]
fn unsupported_value_types_fail_construction() {
    let definition = FormDefinition::new(
        "Broken",
        RootDefinition::new(
            "data",
            vec![input("photo").with_bind(bind().with_type(ValueType::Binary))],
        ),
    );
    let result = initialize_form(
        definition,
        Rc::new(TestEvaluator::new()),
        InitializeFormOptions::default(),
    );
    assert!(matches!(
        result,
        Err(EngineError::UnsupportedValueType {
            control: NodeType::Input,
            value_type: ValueType::Binary,
        })
    ));
}

#[test]
fn relevance_is_inherited() {
    let root = form(vec![
        input("show"),
        NodeDefinition::subtree("details", vec![input("reason")])
            .with_body(BodyElement::Group { label: None })
            .with_bind(bind().with_relevant("/data/show = 'yes'")),
    ]);

    let details = node(&root, "/data/details");
    let reason = node(&root, "/data/details/reason");
    assert!(!details.current_state().relevant());
    assert!(!reason.current_state().relevant());
    assert!(reason.is_self_relevant());

    node(&root, "/data/show").set_value("yes").unwrap();
    assert!(details.current_state().relevant());
    assert!(reason.current_state().relevant());
}

#[test]
fn readonly_is_inherited_and_guards_writes() {
    let root = form(vec![
        input("lock"),
        NodeDefinition::subtree("locked", vec![input("field")])
            .with_bind(bind().with_readonly("/data/lock = '1'")),
    ]);

    let field = node(&root, "/data/locked/field");
    field.set_value("first").unwrap();

    node(&root, "/data/lock").set_value("1").unwrap();
    assert!(field.current_state().readonly());
    assert!(matches!(
        field.set_value("second"),
        Err(EngineError::ReadonlyWrite { reference }) if reference == "/data/locked/field"
    ));
    assert_eq!(value_of(&field), "first");
}

#[test]
fn required_reflects_its_expression() {
    let root = form(vec![
        input("consent"),
        input("signature").with_bind(bind().with_required("/data/consent = 'yes'")),
    ]);

    let signature = node(&root, "/data/signature");
    assert!(!signature.current_state().required());
    node(&root, "/data/consent").set_value("yes").unwrap();
    assert!(signature.current_state().required());
}

#[test]
fn calculations_write_values() {
    let root = form(vec![
        input("count").with_bind(bind().with_type(ValueType::Int)),
        NodeDefinition::leaf("double")
            .with_bind(bind().with_type(ValueType::Int).with_calculate("/data/count * 2")),
    ]);

    let double = node(&root, "/data/double");
    node(&root, "/data/count").set_value(21i64).unwrap();
    assert_eq!(double.current_state().value(), Some(RuntimeValue::Int(Some(42))));

    assert!(double.current_state().readonly());
    assert!(matches!(
        double.set_value(1i64),
        Err(EngineError::ReadonlyWrite { .. })
    ));
}

#[test]
fn non_relevant_calculations_keep_their_last_value() {
    let root = form(vec![
        input("base"),
        input("enabled"),
        NodeDefinition::leaf("copy").with_bind(
            bind()
                .with_calculate("/data/base")
                .with_relevant("/data/enabled = 'yes'"),
        ),
    ]);

    let copy = node(&root, "/data/copy");
    node(&root, "/data/enabled").set_value("yes").unwrap();
    node(&root, "/data/base").set_value("one").unwrap();
    assert_eq!(value_of(&copy), "one");

    node(&root, "/data/enabled").set_value("no").unwrap();
    node(&root, "/data/base").set_value("two").unwrap();
    assert_eq!(value_of(&copy), "one");

    node(&root, "/data/enabled").set_value("yes").unwrap();
    assert_eq!(value_of(&copy), "two");
}

#[test]
fn containers_reject_value_writes() {
    let root = form(vec![NodeDefinition::subtree("group", vec![])]);
    let group = node(&root, "/data/group");
    assert!(matches!(
        group.set_value("x"),
        Err(EngineError::UnsupportedOperation {
            operation: "set_value",
            node_type: NodeType::Subtree,
        })
    ));
}

#[test]
fn defaults_are_normalized() {
    let root = form(vec![
        NodeDefinition::leaf("age")
            .with_bind(bind().with_type(ValueType::Int))
            .with_default("7.5"),
        NodeDefinition::leaf("name").with_default("Ada"),
    ]);

    assert_eq!(
        node(&root, "/data/age").current_state().value(),
        Some(RuntimeValue::Int(Some(7)))
    );
    assert_eq!(value_of(&node(&root, "/data/name")), "Ada");
    assert_eq!(root.instance_xml(), "<data><age>7</age><name>Ada</name></data>");
}

#[test]
fn languages_switch_translated_labels() {
    let evaluator = TestEvaluator::new()
        .with_language("en", &[("q1:label", "Name")])
        .with_language("fr", &[("q1:label", "Nom")]);
    let root = form_with(
        vec![labelled_input("q1", TextDefinition::translation("jr:itext('q1:label')"))],
        evaluator,
        InitializeFormOptions::default(),
    );

    let q1 = node(&root, "/data/q1");
    assert_eq!(root.languages(), vec!["en".to_string(), "fr".to_string()]);
    assert_eq!(root.current_state().active_language().as_deref(), Some("en"));
    assert_eq!(q1.current_state().label().unwrap().to_string(), "Name");

    root.set_language("fr").unwrap();
    assert_eq!(root.active_language().as_deref(), Some("fr"));
    assert_eq!(q1.current_state().label().unwrap().to_string(), "Nom");

    assert!(matches!(
        root.set_language("de"),
        Err(EngineError::UnknownLanguage { language }) if language == "de"
    ));
    assert_eq!(root.active_language().as_deref(), Some("fr"));
}

#[test]
fn static_labels_and_hints() {
    let root = form(vec![labelled_input("q1", "What is your name?")]);
    let state = node(&root, "/data/q1").current_state();
    assert_eq!(state.label().unwrap().to_string(), "What is your name?");
    assert!(state.hint().is_none());
}

#[test]
fn find_node_by_reference() {
    let root = form(vec![NodeDefinition::subtree("a", vec![input("b")])]);
    assert_eq!(node(&root, "/data/a/b").node_name(), "b");
    assert_eq!(root.find_node("/data").unwrap(), *root.node());
    assert!(root.find_node("/data/missing").is_none());
}

#[test]
fn host_state_objects_track_engine_state() {
    let options = InitializeFormOptions {
        state_factory: Rc::new(SnapshotFactory),
        ..InitializeFormOptions::default()
    };
    let root = form_with(
        vec![input("show"), input("q").with_bind(bind().with_relevant("/data/show != ''"))],
        TestEvaluator::new(),
        options,
    );

    let q = node(&root, "/data/q");
    assert!(!q.current_state().relevant());

    node(&root, "/data/show").set_value("1").unwrap();
    assert!(q.current_state().relevant());

    q.set_value("answer").unwrap();
    assert_eq!(value_of(&q), "answer");
    assert_eq!(root.current_state().children().len(), 2);
}

#[test]
fn instance_xml_keeps_namespaces_and_escapes_once() {
    let definition = FormDefinition::new(
        "Namespaced",
        RootDefinition::new("data", vec![input("q")])
            .with_namespace("", "http://www.w3.org/2002/xforms")
            .with_namespace("orx", "http://openrosa.org/xforms")
            .with_attribute("id", "form-1"),
    );
    let root = initialize_form(
        definition,
        Rc::new(TestEvaluator::new()),
        InitializeFormOptions::default(),
    )
    .unwrap();

    node(&root, "/data/q").set_value("a < b & c").unwrap();
    assert_eq!(
        root.instance_xml(),
        concat!(
            r#"<data xmlns="http://www.w3.org/2002/xforms" xmlns:orx="http://openrosa.org/xforms" id="form-1">"#,
            "<q>a &lt; b &amp; c</q></data>"
        )
    );
}

#[test]
fn disposing_the_root_detaches_the_tree() {
    let root = form(vec![labelled_input("q", "Question")]);
    let q = node(&root, "/data/q");

    root.dispose().unwrap();
    assert!(q.current_state().label().is_none());
    assert!(matches!(root.dispose(), Err(EngineError::DisposedScope(_))));
}

#[test]
fn evaluator_reports_paths_as_written() {
    let evaluator = TestEvaluator::new();
    assert_eq!(
        evaluator.dependency_references("/data/a > 3 and count(../rep) = 2"),
        vec!["/data/a".to_string(), "../rep".to_string()]
    );
    assert_eq!(evaluator.dependency_references(". != ''"), vec![".".to_string()]);
    assert!(evaluator.dependency_references("jr:itext('q1:label')").is_empty());
}
