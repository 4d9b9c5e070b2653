//! A minimal dynamic schema: opaque resolvers over a small type-reference
//! system.
//!
//! Full type-system construction (introspection, interfaces, unions) is not
//! modeled here; what remains is exactly enough to drive null-propagation
//! and list/object completion, the way the reference engine's
//! `types::base::GraphQLType` trait drives the same thing for statically
//! typed Rust values (except resolvers here are opaque boxed closures
//! rather than trait impls).

use std::{collections::HashMap, future::Future, pin::Pin, sync::Arc};

use indexmap::IndexMap;

use crate::{error::FieldResult, value::{Object, Value}};

/// A boxed, `Send` future, the uniform shape every resolver is lifted to at
/// the executor boundary.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A reference to a type in the schema, sufficient to drive completion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeRef {
    /// A leaf scalar (int, float, string, boolean, ID, ...).
    Scalar,
    /// A leaf enum.
    Enum,
    /// A reference to a named [`ObjectType`] in the schema.
    Object(String),
    /// A list of the wrapped type.
    List(Box<TypeRef>),
    /// A non-null wrapper around the wrapped type.
    NonNull(Box<TypeRef>),
}

impl TypeRef {
    /// Shorthand for `NonNull(Box::new(self))`.
    #[must_use]
    pub fn non_null(self) -> Self {
        Self::NonNull(Box::new(self))
    }

    /// Shorthand for `List(Box::new(self))`.
    #[must_use]
    pub fn list_of(self) -> Self {
        Self::List(Box::new(self))
    }

    /// Whether this type is non-null at the top level.
    pub fn is_non_null(&self) -> bool {
        matches!(self, Self::NonNull(_))
    }

    /// Strips a top-level `NonNull` wrapper, if present.
    pub fn nullable_inner(&self) -> &TypeRef {
        match self {
            Self::NonNull(inner) => inner,
            other => other,
        }
    }

    /// Whether, ignoring a top-level `NonNull`, this type is a list.
    pub fn is_list(&self) -> bool {
        matches!(self.nullable_inner(), Self::List(_))
    }

    /// The list's element type, ignoring a top-level `NonNull`.
    pub fn list_element(&self) -> Option<&TypeRef> {
        match self.nullable_inner() {
            Self::List(inner) => Some(inner),
            _ => None,
        }
    }

    /// The referenced object type's name, ignoring a top-level `NonNull`.
    pub fn object_name(&self) -> Option<&str> {
        match self.nullable_inner() {
            Self::Object(name) => Some(name),
            _ => None,
        }
    }
}

/// The arguments resolved for a single field invocation.
pub type Arguments = Object;

/// A resolver: given the parent value, resolved arguments, and the request
/// context, produces a [`Value`] or fails with a [`crate::error::FieldError`].
///
/// Every resolver is boxed to this single async shape; synchronous
/// resolvers simply return an already-ready future (see
/// [`crate::schema::sync_resolver`]).
pub type Resolver<C> =
    dyn for<'a> Fn(&'a Value, &'a Arguments, &'a C) -> BoxFuture<'a, FieldResult<Value>> + Send + Sync;

/// A field definition on an [`ObjectType`].
#[derive(Clone)]
pub struct FieldDef<C> {
    name: String,
    type_ref: TypeRef,
    resolver: Arc<Resolver<C>>,
}

impl<C> FieldDef<C> {
    /// Defines a field named `name` of type `type_ref`, resolved by
    /// `resolver`.
    pub fn new(
        name: impl Into<String>,
        type_ref: TypeRef,
        resolver: impl for<'a> Fn(&'a Value, &'a Arguments, &'a C) -> BoxFuture<'a, FieldResult<Value>>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            type_ref,
            resolver: Arc::new(resolver),
        }
    }

    /// The field's response name in the schema.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The field's declared type.
    pub fn type_ref(&self) -> &TypeRef {
        &self.type_ref
    }

    pub(crate) fn resolve<'a>(
        &'a self,
        source: &'a Value,
        arguments: &'a Arguments,
        context: &'a C,
    ) -> BoxFuture<'a, FieldResult<Value>> {
        (self.resolver)(source, arguments, context)
    }
}

/// An object type: a name plus its ordered field definitions.
///
/// Field order is insertion order, the same as [`Object`]'s, so that
/// `__typename`-style bookkeeping fields (not modeled here, since
/// introspection is out of scope) would not have disturbed user-declared
/// order either.
#[derive(Clone)]
pub struct ObjectType<C> {
    name: String,
    fields: IndexMap<String, FieldDef<C>>,
}

impl<C> ObjectType<C> {
    /// Creates a new, empty object type named `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: IndexMap::new(),
        }
    }

    /// Adds a field to this type, builder-style.
    #[must_use]
    pub fn field(mut self, field: FieldDef<C>) -> Self {
        self.fields.insert(field.name.clone(), field);
        self
    }

    /// The type's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Looks up a field by its schema name.
    pub fn field_by_name(&self, name: &str) -> Option<&FieldDef<C>> {
        self.fields.get(name)
    }
}

/// A schema: a named root query type plus every object type it (transitively)
/// references.
///
/// There is deliberately no mutation/subscription root here: `@defer` and
/// `@stream` are read-path concepts, and mutation root-field execution order
/// is out of this crate's scope.
pub struct Schema<C> {
    query_type_name: String,
    types: HashMap<String, ObjectType<C>>,
}

impl<C> Schema<C> {
    /// Builds a schema from a root query type name and the full set of
    /// object types (including the query type itself) it may reach.
    pub fn new(query_type_name: impl Into<String>, types: Vec<ObjectType<C>>) -> Self {
        Self {
            query_type_name: query_type_name.into(),
            types: types.into_iter().map(|t| (t.name.clone(), t)).collect(),
        }
    }

    /// The root query type.
    pub fn query_type(&self) -> &ObjectType<C> {
        self.types
            .get(&self.query_type_name)
            .expect("schema must define its declared query type")
    }

    /// Looks up an object type by name.
    pub fn object_type(&self, name: &str) -> Option<&ObjectType<C>> {
        self.types.get(name)
    }
}

/// Lifts a synchronous resolver function into the uniform async
/// [`Resolver`] shape.
pub fn sync_resolver<C, F>(f: F) -> impl for<'a> Fn(&'a Value, &'a Arguments, &'a C) -> BoxFuture<'a, FieldResult<Value>>
where
    F: Fn(&Value, &Arguments, &C) -> FieldResult<Value> + Send + Sync + 'static,
{
    move |source, arguments, context| {
        let result = f(source, arguments, context);
        Box::pin(async move { result })
    }
}

