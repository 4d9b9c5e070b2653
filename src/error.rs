//! Error types for request-, field-, and fatal-level failures.
//!
//! Mirrors the reference engine's three-tier split: a top-level
//! [`GraphQLError`] for failures that prevent execution entirely, a
//! [`FieldError`] that a resolver returns, and an [`ExecutionError`] that
//! pairs a [`FieldError`] with the response [`Path`] and source location at
//! which it occurred (the shape actually placed into `errors` lists).

use std::fmt::Display;

use derive_more::{Display as DeriveDisplay, Error};

use crate::{path::Path, value::Value};

/// A source location in the operation document, for error reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Location {
    /// 1-based line number.
    pub line: usize,
    /// 1-based column number.
    pub column: usize,
}

impl Location {
    /// Constructs a [`Location`] at the given 1-based line and column.
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// An error that prevents execution of the operation (or a directive site on
/// it) from proceeding normally.
///
/// Request errors (duplicate `@defer` label, bad `@stream(initial_count:)`)
/// are surfaced in the top-level `errors` list without halting the whole
/// operation; [`GraphQLError::Internal`] is the one variant that does halt
/// it, representing a fatal error.
#[derive(Clone, Debug, DeriveDisplay, Eq, PartialEq)]
pub enum GraphQLError {
    /// Two `@defer`/`@stream` directives declared the same `label` in one
    /// operation.
    #[display("duplicate @defer/@stream label: {_0}")]
    DuplicateLabel(String),

    /// `@stream(initial_count:)` was negative or otherwise invalid.
    #[display("invalid initial_count for @stream(label: {label:?}): {initial_count}")]
    InvalidInitialCount {
        /// The offending directive's label.
        label: String,
        /// The invalid count as written.
        initial_count: i64,
    },

    /// An unknown argument was supplied to a recognized directive.
    #[display("unknown argument {argument:?} on @{directive}")]
    UnknownDirectiveArgument {
        /// The directive name (`defer` or `stream`).
        directive: &'static str,
        /// The unrecognized argument name.
        argument: String,
    },

    /// The document had no operation matching `operation_name`, or had
    /// multiple operations and none was named.
    #[display("unknown operation name")]
    UnknownOperationName,

    /// The document defined more than one operation and no
    /// `operation_name` was given to disambiguate.
    #[display("multiple operations provided")]
    MultipleOperationsProvided,

    /// An internal invariant was violated (e.g. the dispatcher received a
    /// child registration for a label it has no record of). Aborts the
    /// operation with this single error and no patches.
    #[display("internal error: {_0}")]
    Internal(String),
}

impl std::error::Error for GraphQLError {}

/// The result of resolving a field, before the path/location are attached.
pub type FieldResult<T> = Result<T, FieldError>;

/// An error raised while resolving a single field.
///
/// Field errors carry a human-readable message plus optional structured
/// `extensions`, the way the reference engine's `FieldError` does, and admit
/// a blanket `From<T: Display>` so resolver authors can use `?` against any
/// error type without manual wrapping.
#[derive(Clone, Debug, PartialEq, Error)]
pub struct FieldError {
    message: String,
    extensions: Value,
}

impl Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl<T: Display> From<T> for FieldError {
    fn from(e: T) -> Self {
        Self {
            message: e.to_string(),
            extensions: Value::Null,
        }
    }
}

impl FieldError {
    /// Constructs a [`FieldError`] with structured `extensions` data.
    pub fn with_extensions(message: impl Display, extensions: Value) -> Self {
        Self {
            message: message.to_string(),
            extensions,
        }
    }

    /// The error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The `extensions` payload, or [`Value::Null`] if none was given.
    pub fn extensions(&self) -> &Value {
        &self.extensions
    }
}

/// An error that occurred while resolving a field, located in the response.
///
/// This is the shape that actually accumulates in top-level `errors` and in
/// a patch's `errors`: a [`FieldError`] plus the [`Path`] at which it
/// occurred and (if known) the document [`Location`] that produced it.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ExecutionError {
    message: String,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    locations: Option<Vec<Location>>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Path::is_empty"))]
    path: Path,
}

impl ExecutionError {
    /// Builds an [`ExecutionError`] from a resolver's [`FieldError`], the
    /// path it occurred at, and its source location (if any).
    pub fn new(error: &FieldError, path: Path, location: Option<Location>) -> Self {
        Self {
            message: error.message.clone(),
            locations: location.map(|l| vec![l]),
            path,
        }
    }

    /// The error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The response path at which the error occurred.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Source locations referencing the operation document, if known.
    pub fn locations(&self) -> Option<&[Location]> {
        self.locations.as_deref()
    }
}
