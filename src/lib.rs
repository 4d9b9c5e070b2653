//! Incremental GraphQL execution: an `@defer`/`@stream`-aware executor and
//! its Patch Dispatcher.
//!
//! Given a pre-validated [`ast::Document`] and a [`schema::Schema`] of
//! opaque async resolvers, [`executor::execute`] runs the standard GraphQL
//! field-collection and value-completion algorithm to produce an initial
//! result, while every `@defer`red fragment and every element past a
//! `@stream`'s `initial_count` is peeled off into the [`dispatcher`] and
//! returned as a lazy [`executor::ExecutionOutput::patches`] sequence.
//!
//! Parsing, validation, and wire transport are all out of scope: this crate
//! starts from an already-valid document and produces [`value::Value`] trees
//! and [`patch::PatchRecord`]s, leaving JSON (or any other) encoding to the
//! caller (optionally via this crate's `serde` feature).

#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

/// The operation-document AST the executor walks.
pub mod ast;
/// Evaluation of `@skip`, `@include`, `@defer`, and `@stream`.
pub mod directives;
mod dispatcher;
/// Request-, field-, and fatal-level error types.
pub mod error;
/// The executor itself: field collection, value completion, and `execute`.
pub mod executor;
mod patch;
/// Response path tracking.
pub mod path;
/// The opaque-resolver schema model the executor runs against.
pub mod schema;
/// The dynamic response-value representation.
pub mod value;

pub use dispatcher::PatchStream;
pub use error::{ExecutionError, FieldError, FieldResult, GraphQLError, Location};
pub use executor::{execute, ExecutionInput, ExecutionOutput, Variables};
pub use patch::PatchRecord;
pub use path::{Path, Segment};
pub use schema::{sync_resolver, Arguments, BoxFuture, FieldDef, ObjectType, Resolver, Schema, TypeRef};
pub use value::{Object, Value};
