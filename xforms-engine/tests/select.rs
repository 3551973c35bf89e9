//! Integration tests for select, rank, range, trigger and upload controls.

mod common;

use common::{bind, form, input, node, value_of};
use xforms_engine::definition::{
    BodyElement, ControlText, ItemDefinition, ItemsetDefinition, NodeDefinition, RangeDefinition,
    SelectDefinition, UploadDefinition,
};
use xforms_engine::{EngineError, InstanceAttachment, NodeType, RuntimeValue, ValueType};

fn items(values: &[&str]) -> SelectDefinition {
    SelectDefinition {
        items: values
            .iter()
            .map(|value| ItemDefinition::new(*value, value.to_uppercase().as_str()))
            .collect(),
        ..SelectDefinition::default()
    }
}

fn values(list: &[&str]) -> Option<RuntimeValue> {
    Some(RuntimeValue::Values(list.iter().map(|value| value.to_string()).collect()))
}

#[test]
fn select_one_values() {
    let root = form(vec![
        NodeDefinition::leaf("choice").with_body(BodyElement::Select1(items(&["a", "b"]))),
    ]);
    let choice = node(&root, "/data/choice");
    assert_eq!(choice.node_type(), NodeType::Select);

    choice.select_value(Some("a")).unwrap();
    assert_eq!(choice.current_state().value(), values(&["a"]));
    assert!(choice.is_selected("a"));
    assert!(!choice.is_selected("b"));

    choice.select_value(None).unwrap();
    assert_eq!(choice.current_state().value(), values(&[]));

    assert!(matches!(
        choice.select_values(["a", "b"]),
        Err(EngineError::InvalidValueInput { .. })
    ));
}

#[test]
fn single_selects_hold_one_value_through_set_value() {
    let root = form(vec![
        NodeDefinition::leaf("choice").with_body(BodyElement::Select1(items(&["a", "b"]))),
        NodeDefinition::leaf("colors").with_body(BodyElement::Select(items(&["a", "b"]))),
    ]);
    let choice = node(&root, "/data/choice");
    choice.set_value("b").unwrap();

    assert!(matches!(
        choice.set_value("a b"),
        Err(EngineError::InvalidValueInput { .. })
    ));
    assert_eq!(choice.current_state().value(), values(&["b"]));
    assert!(choice.set_value(vec!["a".to_string(), "b".to_string()]).is_err());

    // Duplicates collapse to one value before the check.
    choice.set_value("a a").unwrap();
    assert_eq!(choice.current_state().value(), values(&["a"]));

    node(&root, "/data/colors").set_value("a b").unwrap();
    assert_eq!(node(&root, "/data/colors").current_state().value(), values(&["a", "b"]));
}

#[test]
fn select_many_values() {
    let root = form(vec![
        NodeDefinition::leaf("colors").with_body(BodyElement::Select(items(&["red", "green", "blue"]))),
    ]);
    let colors = node(&root, "/data/colors");

    colors.select_values(["blue", "red", "blue"]).unwrap();
    assert!(colors.is_selected("red") && colors.is_selected("blue"));
    assert!(!colors.is_selected("green"));
    assert_eq!(root.instance_xml().matches("blue").count(), 1);
}

#[test]
fn static_options_have_labels() {
    let root = form(vec![
        NodeDefinition::leaf("choice").with_body(BodyElement::Select1(items(&["a", "b"]))),
    ]);
    let choice = node(&root, "/data/choice");

    let options = choice.current_state().value_options();
    let values: Vec<&str> = options.iter().map(|option| option.value.as_str()).collect();
    assert_eq!(values, vec!["a", "b"]);

    let b = choice.get_value_option("b").unwrap();
    assert_eq!(b.label.unwrap().to_string(), "B");
    assert!(choice.get_value_option("z").is_none());
}

#[test]
fn itemsets_follow_instance_nodes() {
    let root = form(vec![
        NodeDefinition::repeat("fruit", vec![input("name")]).with_initial_instances(2),
        NodeDefinition::leaf("favorite").with_body(BodyElement::Select1(SelectDefinition {
            itemset: Some(ItemsetDefinition {
                nodes: "/data/fruit".into(),
                value: "name".into(),
                label: "concat('Fruit: ', name)".into(),
            }),
            ..SelectDefinition::default()
        })),
    ]);

    node(&root, "/data/fruit[1]/name").set_value("apple").unwrap();
    node(&root, "/data/fruit[2]/name").set_value("pear").unwrap();

    let favorite = node(&root, "/data/favorite");
    let labels: Vec<String> = favorite
        .value_options()
        .into_iter()
        .map(|option| option.label.unwrap().to_string())
        .collect();
    assert_eq!(labels, vec!["Fruit: apple", "Fruit: pear"]);

    node(&root, "/data/fruit").add_instances(Some(1), 1).unwrap();
    node(&root, "/data/fruit[3]/name").set_value("plum").unwrap();
    assert_eq!(favorite.value_options().len(), 3);
    assert!(favorite.get_value_option("plum").is_some());
}

#[test]
fn rank_keeps_order() {
    let root = form(vec![
        NodeDefinition::leaf("order").with_body(BodyElement::Rank(items(&["x", "y", "z"]))),
    ]);
    let order = node(&root, "/data/order");
    assert_eq!(order.node_type(), NodeType::Rank);

    order.select_values(["z", "x", "y"]).unwrap();
    assert_eq!(order.selected_values(), vec!["z", "x", "y"]);
    assert_eq!(root.instance_xml(), "<data><order>z x y</order></data>");
}

#[test]
fn selects_require_string_values() {
    let definition = xforms_engine::FormDefinition::new(
        "Broken",
        xforms_engine::definition::RootDefinition::new(
            "data",
            vec![NodeDefinition::leaf("n")
                .with_bind(bind().with_type(ValueType::Int))
                .with_body(BodyElement::Select1(items(&["1"])))],
        ),
    );
    let result = xforms_engine::initialize_form(
        definition,
        std::rc::Rc::new(common::TestEvaluator::new()),
        Default::default(),
    );
    assert!(matches!(
        result,
        Err(EngineError::UnsupportedValueType {
            control: NodeType::Select,
            value_type: ValueType::Int,
        })
    ));
}

#[test]
fn select_operations_need_a_select() {
    let root = form(vec![input("text")]);
    assert!(matches!(
        node(&root, "/data/text").select_value(Some("a")),
        Err(EngineError::UnsupportedOperation {
            operation: "select_value",
            node_type: NodeType::Input,
        })
    ));
}

#[test]
fn range_controls_enforce_bounds() {
    let root = form(vec![NodeDefinition::leaf("score")
        .with_bind(bind().with_type(ValueType::Int))
        .with_body(BodyElement::Range(RangeDefinition {
            text: ControlText::default(),
            start: 1.0,
            end: 10.0,
            step: 1.0,
        }))]);
    let score = node(&root, "/data/score");
    assert_eq!(score.node_type(), NodeType::Range);

    score.set_value(10i64).unwrap();
    assert!(matches!(
        score.set_value(11i64),
        Err(EngineError::ValueOutOfRange { value, .. }) if value == "11"
    ));
    assert_eq!(score.current_state().value(), Some(RuntimeValue::Int(Some(10))));
}

#[test]
fn triggers_hold_an_acknowledgement() {
    let root = form(vec![
        NodeDefinition::leaf("ack").with_body(BodyElement::Trigger(ControlText::default())),
    ]);
    let ack = node(&root, "/data/ack");
    assert_eq!(ack.node_type(), NodeType::Trigger);

    ack.set_value(true).unwrap();
    assert_eq!(value_of(&ack), "OK");
    assert!(ack.set_value("maybe").is_err());
    ack.set_value(false).unwrap();
    assert_eq!(value_of(&ack), "");
}

#[test]
fn uploads_hold_attachments() {
    let root = form(vec![NodeDefinition::leaf("photo")
        .with_bind(bind().with_type(ValueType::Binary))
        .with_body(BodyElement::Upload(UploadDefinition::default()))]);
    let photo = node(&root, "/data/photo");
    assert_eq!(photo.node_type(), NodeType::Upload);

    let file = InstanceAttachment::new("cat.png", "image/png", vec![1, 2, 3]);
    photo.set_value(file.clone()).unwrap();
    assert_eq!(photo.attachment(), Some(file));
    assert_eq!(
        photo.current_state().value(),
        Some(RuntimeValue::Binary(Some("cat.png".into())))
    );

    assert!(matches!(
        photo.set_value("other.png"),
        Err(EngineError::InvalidValueInput { .. })
    ));

    photo.set_value(None::<InstanceAttachment>).unwrap();
    assert_eq!(photo.attachment(), None);
    assert_eq!(root.instance_xml(), "<data><photo></photo></data>");
}
