//! A small StarWars-style fixture schema shared by the integration tests.
//!
//! There is no parser in this crate (§1 Non-goals), so operations are built
//! directly as [`graphql_incremental_core::ast`] values instead of being
//! parsed from GraphQL source text.

use std::sync::Arc;

use graphql_incremental_core::{
    ast::{Argument, ArgumentValue, Directive, Field, FragmentDefinition, FragmentSpread, OperationDefinition, OperationType, Selection},
    error::{FieldError, FieldResult},
    path::Path,
    schema::{sync_resolver, FieldDef, ObjectType, Schema, TypeRef},
    value::{Object, Value},
};

pub fn droid(id: &str, name: &str, friends: Vec<Value>) -> Value {
    Value::object(Object::from_iter([
        ("id".to_owned(), Value::from(id)),
        ("name".to_owned(), Value::from(name)),
        ("friends".to_owned(), Value::List(friends)),
    ]))
}

fn field(name: &str) -> Selection {
    Selection::Field(Field {
        alias: None,
        name: name.to_owned(),
        arguments: Vec::new(),
        directives: Vec::new(),
        selection_set: Vec::new(),
        location: Default::default(),
    })
}

pub fn nested_field(name: &str, selection_set: Vec<Selection>) -> Selection {
    Selection::Field(Field {
        alias: None,
        name: name.to_owned(),
        arguments: Vec::new(),
        directives: Vec::new(),
        selection_set,
        location: Default::default(),
    })
}

pub fn defer_directive(label: &str) -> Directive {
    Directive {
        name: "defer".to_owned(),
        arguments: vec![Argument {
            name: "label".to_owned(),
            value: ArgumentValue::String(label.to_owned()),
        }],
    }
}

pub fn stream_directive(label: &str, initial_count: i32) -> Directive {
    Directive {
        name: "stream".to_owned(),
        arguments: vec![
            Argument {
                name: "label".to_owned(),
                value: ArgumentValue::String(label.to_owned()),
            },
            Argument {
                name: "initial_count".to_owned(),
                value: ArgumentValue::Int(initial_count),
            },
        ],
    }
}

pub fn deferred_spread(fragment: &str, label: &str) -> Selection {
    Selection::FragmentSpread(FragmentSpread {
        name: fragment.to_owned(),
        directives: vec![defer_directive(label)],
        location: Default::default(),
    })
}

pub fn streamed_field(name: &str, label: &str, initial_count: i32, selection_set: Vec<Selection>) -> Selection {
    Selection::Field(Field {
        alias: None,
        name: name.to_owned(),
        arguments: Vec::new(),
        directives: vec![stream_directive(label, initial_count)],
        selection_set,
        location: Default::default(),
    })
}

/// `Character { id name friends { id name } }`, with `secretBackstory`
/// always failing, modeling juniper's own StarWars example's behavior.
pub fn schema() -> Arc<Schema<()>> {
    let character = ObjectType::<()>::new("Character")
        .field(FieldDef::new("id", TypeRef::Scalar.non_null(), sync_resolver(read_field("id"))))
        .field(FieldDef::new("name", TypeRef::Scalar.non_null(), sync_resolver(read_field("name"))))
        .field(FieldDef::new(
            "friends",
            TypeRef::Object("Character".to_owned()).list_of(),
            sync_resolver(read_field("friends")),
        ))
        .field(FieldDef::new(
            "secretBackstory",
            TypeRef::Scalar,
            sync_resolver(|_source: &Value, _args: &Object, _ctx: &()| -> FieldResult<Value> {
                Err(FieldError::from("secretBackstory is secret."))
            }),
        ));

    let query = ObjectType::<()>::new("Query").field(FieldDef::new(
        "hero",
        TypeRef::Object("Character".to_owned()).non_null(),
        sync_resolver(|_source: &Value, _args: &Object, _ctx: &()| -> FieldResult<Value> {
            Ok(droid(
                "2001",
                "R2-D2",
                vec![
                    droid("1000", "Luke Skywalker", vec![]),
                    droid("1002", "Han Solo", vec![]),
                    droid("1003", "Leia Organa", vec![]),
                ],
            ))
        }),
    ));

    Arc::new(Schema::new("Query", vec![query, character]))
}

fn read_field(name: &'static str) -> impl Fn(&Value, &Object, &()) -> FieldResult<Value> {
    move |source, _args, _ctx| Ok(source.as_object().and_then(|o| o.get(name)).cloned().unwrap_or(Value::Null))
}

pub fn operation(selection_set: Vec<Selection>) -> OperationDefinition {
    OperationDefinition {
        operation_type: OperationType::Query,
        name: None,
        selection_set,
    }
}

pub fn fragment(name: &str, type_condition: &str, selection_set: Vec<Selection>) -> (String, FragmentDefinition) {
    (
        name.to_owned(),
        FragmentDefinition {
            name: name.to_owned(),
            type_condition: type_condition.to_owned(),
            selection_set,
        },
    )
}

pub fn scalar_field(name: &str) -> Selection {
    field(name)
}

pub fn root_path() -> Path {
    Path::empty()
}
