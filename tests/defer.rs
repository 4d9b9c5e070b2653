//! End-to-end `@defer` scenarios (spec §8 seeds 1–3).

mod support;

use std::collections::HashMap;

use futures::StreamExt;
use graphql_incremental_core::{
    ast::Document,
    executor::{execute, ExecutionInput},
    value::Value,
};
use pretty_assertions::assert_eq;

#[tokio::test]
async fn deferred_scalar_fragment_arrives_as_a_separate_patch() {
    let (name_fragment_name, name_fragment) = support::fragment("NameFragment", "Character", vec![support::scalar_field("name")]);

    let operation = support::operation(vec![support::nested_field(
        "hero",
        vec![support::scalar_field("id"), support::deferred_spread("NameFragment", "Name")],
    )]);

    let document = Document {
        operations: vec![operation],
        fragments: HashMap::from([(name_fragment_name, name_fragment)]),
    };

    let output = execute(ExecutionInput {
        schema: support::schema(),
        document: std::sync::Arc::new(document),
        operation_name: None,
        root_value: Value::Null,
        context: std::sync::Arc::new(()),
        variables: HashMap::new(),
        enable_deferred_delivery: true,
    })
    .await
    .unwrap();

    assert!(output.errors.is_empty());
    let hero = output.data.unwrap().as_object().unwrap().get("hero").unwrap().clone();
    // `name` has not resolved yet: only `id` is in the initial payload.
    assert!(hero.as_object().unwrap().get("name").is_none());
    assert_eq!(hero.as_object().unwrap().get("id"), Some(&Value::from("2001")));

    let mut patches: Vec<_> = output.patches.expect("a @defer was registered").collect().await;
    assert_eq!(patches.len(), 1);
    let patch = patches.remove(0);
    assert_eq!(patch.label, "Name");
    assert_eq!(patch.path.to_string(), "hero");
    assert_eq!(patch.data.as_object().unwrap().get("name"), Some(&Value::from("R2-D2")));
    assert!(patch.errors.is_none());
}

#[tokio::test]
async fn nested_defer_resolves_child_before_parent() {
    let (inner_name, inner_fragment) =
        support::fragment("InnerFragment", "Character", vec![support::nested_field("friends", vec![support::scalar_field("id")])]);
    let (outer_name, outer_fragment) = support::fragment(
        "OuterFragment",
        "Character",
        vec![support::scalar_field("name"), support::deferred_spread("InnerFragment", "Inner")],
    );

    let operation = support::operation(vec![support::nested_field(
        "hero",
        vec![support::scalar_field("id"), support::deferred_spread("OuterFragment", "Outer")],
    )]);

    let document = Document {
        operations: vec![operation],
        fragments: HashMap::from([(inner_name, inner_fragment), (outer_name, outer_fragment)]),
    };

    let output = execute(ExecutionInput {
        schema: support::schema(),
        document: std::sync::Arc::new(document),
        operation_name: None,
        root_value: Value::Null,
        context: std::sync::Arc::new(()),
        variables: HashMap::new(),
        enable_deferred_delivery: true,
    })
    .await
    .unwrap();

    let patches: Vec<_> = output.patches.expect("nested @defer was registered").collect().await;
    assert_eq!(patches.len(), 2);
    assert_eq!(patches[0].label, "Inner", "the child unit's patch must precede its parent's");
    assert_eq!(patches[1].label, "Outer");
    assert_eq!(
        patches[0].data.as_object().unwrap().get("friends").unwrap().as_list().unwrap().len(),
        3
    );
    assert_eq!(patches[1].data.as_object().unwrap().get("name"), Some(&Value::from("R2-D2")));
}

#[tokio::test]
async fn error_inside_a_deferred_fragment_nulls_the_field_and_carries_the_error() {
    let (fragment_name, fragment) = support::fragment("SecretFragment", "Character", vec![support::scalar_field("secretBackstory")]);

    let operation = support::operation(vec![support::nested_field(
        "hero",
        vec![support::scalar_field("id"), support::deferred_spread("SecretFragment", "Secret")],
    )]);

    let document = Document {
        operations: vec![operation],
        fragments: HashMap::from([(fragment_name, fragment)]),
    };

    let output = execute(ExecutionInput {
        schema: support::schema(),
        document: std::sync::Arc::new(document),
        operation_name: None,
        root_value: Value::Null,
        context: std::sync::Arc::new(()),
        variables: HashMap::new(),
        enable_deferred_delivery: true,
    })
    .await
    .unwrap();

    let mut patches: Vec<_> = output.patches.expect("a @defer was registered").collect().await;
    let patch = patches.remove(0);
    assert_eq!(patch.data.as_object().unwrap().get("secretBackstory"), Some(&Value::Null));
    let errors = patch.errors.expect("the failing field must be reported");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message(), "secretBackstory is secret.");
    assert_eq!(errors[0].path().to_string(), "hero.secretBackstory");
}

#[tokio::test]
async fn disabling_deferred_delivery_inlines_defer_entirely() {
    let (name_fragment_name, name_fragment) = support::fragment("NameFragment", "Character", vec![support::scalar_field("name")]);
    let operation = support::operation(vec![support::nested_field(
        "hero",
        vec![support::scalar_field("id"), support::deferred_spread("NameFragment", "Name")],
    )]);
    let document = Document {
        operations: vec![operation],
        fragments: HashMap::from([(name_fragment_name, name_fragment)]),
    };

    let output = execute(ExecutionInput {
        schema: support::schema(),
        document: std::sync::Arc::new(document),
        operation_name: None,
        root_value: Value::Null,
        context: std::sync::Arc::new(()),
        variables: HashMap::new(),
        enable_deferred_delivery: false,
    })
    .await
    .unwrap();

    assert!(output.patches.is_none());
    let hero = output.data.unwrap().as_object().unwrap().get("hero").unwrap().clone();
    assert_eq!(hero.as_object().unwrap().get("name"), Some(&Value::from("R2-D2")));
}
