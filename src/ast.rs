//! A minimal, pre-validated operation document AST.
//!
//! Parsing and validation are not performed by this crate; the executor
//! consumes an already-validated [`Document`]. This module exists only to
//! give that input a concrete shape, trimmed to what field collection and
//! directive evaluation need (no general input-value coercion system),
//! modeled after the reference engine's `ast` module but without its
//! scalar-value generics or its full literal-value grammar.

use std::collections::HashMap;

use crate::{error::Location, value::Value};

/// The kind of operation a [`OperationDefinition`] represents.
///
/// Only `Query` is exercised by `@defer`/`@stream` in this crate; mutation
/// execution ordering and subscriptions are not modeled here.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationType {
    /// A read-only operation.
    Query,
    /// A side-effecting operation.
    Mutation,
}

/// A literal argument value as written in the operation, or a reference to
/// a variable supplied at execution time.
#[derive(Clone, Debug, PartialEq)]
pub enum ArgumentValue {
    /// A literal `null`.
    Null,
    /// A literal boolean.
    Bool(bool),
    /// A literal integer.
    Int(i32),
    /// A literal float.
    Float(f64),
    /// A literal string.
    String(String),
    /// A literal enum value.
    Enum(String),
    /// A literal list.
    List(Vec<ArgumentValue>),
    /// A reference to an operation variable, resolved at execution time.
    Variable(String),
}

impl ArgumentValue {
    /// Resolves this literal or variable reference against `variables`.
    ///
    /// Unresolvable variable references fall back to [`Value::Null`]: the
    /// validator (out of scope) is responsible for rejecting operations that
    /// reference undeclared variables.
    pub fn resolve(&self, variables: &HashMap<String, Value>) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Int(i) => Value::Int(*i),
            Self::Float(f) => Value::Float(*f),
            Self::String(s) => Value::String(s.clone()),
            Self::Enum(e) => Value::Enum(e.clone()),
            Self::List(items) => Value::List(items.iter().map(|v| v.resolve(variables)).collect()),
            Self::Variable(name) => variables.get(name).cloned().unwrap_or(Value::Null),
        }
    }

    /// Resolves this value expecting a boolean, defaulting to `default` if
    /// resolution doesn't produce one. Used for `@skip(if:)`,
    /// `@include(if:)`, `@defer(if:)`, and `@stream(if:)`.
    pub fn resolve_bool(&self, variables: &HashMap<String, Value>, default: bool) -> bool {
        match self.resolve(variables) {
            Value::Bool(b) => b,
            _ => default,
        }
    }

    /// Resolves this value expecting a string.
    pub fn resolve_string(&self, variables: &HashMap<String, Value>) -> Option<String> {
        match self.resolve(variables) {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Resolves this value expecting an integer.
    pub fn resolve_int(&self, variables: &HashMap<String, Value>) -> Option<i32> {
        match self.resolve(variables) {
            Value::Int(i) => Some(i),
            _ => None,
        }
    }
}

/// A single `name: value` argument, on a field or a directive.
#[derive(Clone, Debug, PartialEq)]
pub struct Argument {
    /// The argument's name.
    pub name: String,
    /// The argument's value (literal or variable reference).
    pub value: ArgumentValue,
}

/// A directive application (`@name(args...)`) on a selection.
#[derive(Clone, Debug, PartialEq)]
pub struct Directive {
    /// The directive's name, without the leading `@`.
    pub name: String,
    /// The directive's arguments.
    pub arguments: Vec<Argument>,
}

impl Directive {
    /// Looks up an argument by name.
    pub fn argument(&self, name: &str) -> Option<&ArgumentValue> {
        self.arguments.iter().find(|a| a.name == name).map(|a| &a.value)
    }
}

/// A field selection (`name(args) { subSelection }` or `alias: name`).
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    /// The field's response key override, if aliased.
    pub alias: Option<String>,
    /// The field's name in the schema.
    pub name: String,
    /// The field's arguments, as written.
    pub arguments: Vec<Argument>,
    /// Directives applied to this selection.
    pub directives: Vec<Directive>,
    /// The field's sub-selection, if its type is composite.
    pub selection_set: Vec<Selection>,
    /// Source location, for error reporting.
    pub location: Location,
}

impl Field {
    /// The field's response key: its alias if present, else its name.
    pub fn response_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// A named fragment spread (`...FragmentName`).
#[derive(Clone, Debug, PartialEq)]
pub struct FragmentSpread {
    /// The name of the referenced [`FragmentDefinition`].
    pub name: String,
    /// Directives applied to this selection.
    pub directives: Vec<Directive>,
    /// Source location, for error reporting.
    pub location: Location,
}

/// An inline fragment (`... on Type { ... }` or bare `... { ... }`).
#[derive(Clone, Debug, PartialEq)]
pub struct InlineFragment {
    /// The fragment's type condition, if any.
    pub type_condition: Option<String>,
    /// Directives applied to this selection.
    pub directives: Vec<Directive>,
    /// The fragment's selection set.
    pub selection_set: Vec<Selection>,
    /// Source location, for error reporting.
    pub location: Location,
}

/// One entry in a selection set.
#[derive(Clone, Debug, PartialEq)]
pub enum Selection {
    /// A field selection.
    Field(Field),
    /// A named fragment spread.
    FragmentSpread(FragmentSpread),
    /// An inline fragment.
    InlineFragment(InlineFragment),
}

/// A `fragment Name on Type { ... }` definition.
#[derive(Clone, Debug, PartialEq)]
pub struct FragmentDefinition {
    /// The fragment's name.
    pub name: String,
    /// The fragment's type condition.
    pub type_condition: String,
    /// The fragment's selection set.
    pub selection_set: Vec<Selection>,
}

/// An `query`/`mutation` operation definition.
#[derive(Clone, Debug, PartialEq)]
pub struct OperationDefinition {
    /// Whether this is a query or a mutation.
    pub operation_type: OperationType,
    /// The operation's name, if given.
    pub name: Option<String>,
    /// The operation's root selection set.
    pub selection_set: Vec<Selection>,
}

/// A parsed, validated operation document: some operations plus the
/// fragments they may reference.
#[derive(Clone, Debug, Default)]
pub struct Document {
    /// Operations defined in the document.
    pub operations: Vec<OperationDefinition>,
    /// Fragment definitions, keyed by name.
    pub fragments: HashMap<String, FragmentDefinition>,
}

impl Document {
    /// Selects the operation to execute, per the same-name resolution rule
    /// as the reference engine's `get_operation`.
    pub fn get_operation(
        &self,
        operation_name: Option<&str>,
    ) -> Result<&OperationDefinition, crate::error::GraphQLError> {
        use crate::error::GraphQLError;

        match operation_name {
            Some(name) => self
                .operations
                .iter()
                .find(|op| op.name.as_deref() == Some(name))
                .ok_or(GraphQLError::UnknownOperationName),
            None => match self.operations.as_slice() {
                [single] => Ok(single),
                [] => Err(GraphQLError::UnknownOperationName),
                _ => Err(GraphQLError::MultipleOperationsProvided),
            },
        }
    }
}
