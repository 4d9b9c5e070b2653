//! Walks an operation's selection set against a [`Schema`], invoking
//! resolvers, assembling the initial result, and registering deferred and
//! streamed work with the [`crate::dispatcher::Dispatcher`].

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use indexmap::IndexMap;

use crate::{
    ast::{Argument, Directive, Document, FragmentSpread, Selection},
    directives::{self, DeferOutcome, StreamOutcome},
    dispatcher::{Dispatcher, PatchStream, PendingUnit, UnitKind, UnitPayload},
    error::{ExecutionError, FieldError, GraphQLError, Location},
    path::Path,
    schema::{Arguments, FieldDef, Schema, TypeRef},
    value::{Object, Value},
};

/// The map of variables supplied for an execution.
pub type Variables = HashMap<String, Value>;

/// Input to [`execute`].
pub struct ExecutionInput<C> {
    /// The schema to execute against.
    pub schema: Arc<Schema<C>>,
    /// The pre-validated operation document.
    pub document: Arc<Document>,
    /// Selects an operation when the document defines more than one.
    pub operation_name: Option<String>,
    /// The root value passed to root-field resolvers.
    pub root_value: Value,
    /// The request context, threaded to every resolver.
    pub context: Arc<C>,
    /// Variable values substituted into the operation.
    pub variables: Variables,
    /// Whether `@defer`/`@stream` are honored, or treated as no-ops.
    pub enable_deferred_delivery: bool,
}

/// Output of [`execute`].
pub struct ExecutionOutput {
    /// The initial result tree, or `None` if a fatal error aborted execution.
    pub data: Option<Value>,
    /// Top-level request/field errors collected during the initial phase.
    pub errors: Vec<ExecutionError>,
    /// The lazy patch sequence, present iff at least one deferred/stream
    /// unit was registered.
    pub patches: Option<PatchStream>,
}

/// Schema, document, and request state shared for the lifetime of one
/// execution, including all of its deferred work. Owned via [`Arc`] so it
/// can be captured by the [`PatchStream`] returned from [`execute`], which
/// may be polled long after `execute` itself has returned.
pub(crate) struct OwnedExecCtx<C> {
    pub(crate) schema: Arc<Schema<C>>,
    pub(crate) document: Arc<Document>,
    pub(crate) variables: Arc<Variables>,
    pub(crate) context: Arc<C>,
    pub(crate) enable_deferred_delivery: bool,
    /// Labels seen so far, shared across the *entire* operation (including
    /// nested deferred resolution), enforcing label uniqueness.
    pub(crate) seen_labels: Arc<Mutex<std::collections::HashSet<String>>>,
    /// The top-level `errors` sink: always the same list regardless of
    /// nesting, since request errors (duplicate labels, bad directives) are
    /// always reported at the top level.
    pub(crate) request_errors: Arc<Mutex<Vec<ExecutionError>>>,
}

impl<C> Clone for OwnedExecCtx<C> {
    fn clone(&self) -> Self {
        Self {
            schema: Arc::clone(&self.schema),
            document: Arc::clone(&self.document),
            variables: Arc::clone(&self.variables),
            context: Arc::clone(&self.context),
            enable_deferred_delivery: self.enable_deferred_delivery,
            seen_labels: Arc::clone(&self.seen_labels),
            request_errors: Arc::clone(&self.request_errors),
        }
    }
}

impl<C> OwnedExecCtx<C> {
    /// Borrows a short-lived [`ExecCtx`] view for a single traversal call,
    /// directing field-resolution errors to `errors` (the top-level sink
    /// during initial execution, or a deferred unit's own local sink during
    /// its resolution).
    pub(crate) fn as_ctx<'a>(&'a self, errors: &'a Mutex<Vec<ExecutionError>>) -> ExecCtx<'a, C> {
        ExecCtx { owned: self, errors }
    }
}

/// A borrowed, `Copy`-able view over [`OwnedExecCtx`] for one traversal call.
pub(crate) struct ExecCtx<'a, C> {
    owned: &'a OwnedExecCtx<C>,
    errors: &'a Mutex<Vec<ExecutionError>>,
}

impl<C> Clone for ExecCtx<'_, C> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<C> Copy for ExecCtx<'_, C> {}

impl<'a, C> ExecCtx<'a, C> {
    fn schema(&self) -> &'a Schema<C> {
        &self.owned.schema
    }

    fn document(&self) -> &'a Document {
        &self.owned.document
    }

    fn variables(&self) -> &'a Variables {
        &self.owned.variables
    }

    fn context(&self) -> &'a C {
        &self.owned.context
    }

    fn enabled(&self) -> bool {
        self.owned.enable_deferred_delivery
    }

    fn push_error(&self, error: &FieldError, path: Path, location: Option<Location>) {
        self.errors
            .lock()
            .unwrap()
            .push(ExecutionError::new(error, path, location));
    }

    fn push_request_error(&self, error: GraphQLError, path: Path) {
        let field_error = FieldError::from(error.to_string());
        self.owned
            .request_errors
            .lock()
            .unwrap()
            .push(ExecutionError::new(&field_error, path, None));
    }

    /// Claims `label` for uniqueness, returning `false` (and recording a
    /// top-level request error) if it was already taken.
    fn claim_label(&self, label: &str, path: &Path) -> bool {
        let fresh = self.owned.seen_labels.lock().unwrap().insert(label.to_owned());
        if !fresh {
            self.push_request_error(GraphQLError::DuplicateLabel(label.to_owned()), path.clone());
        }
        fresh
    }
}

#[derive(Clone)]
struct CollectedField {
    name: String,
    arguments: Vec<Argument>,
    directives: Vec<Directive>,
    location: Location,
    sub_selections: Vec<Selection>,
}

type Pending<C> = Mutex<Vec<PendingUnit<C>>>;

/// Standard GraphQL field collection, modified at fragment boundaries to
/// peel off `@defer`red spreads into `pending` instead of inlining them.
fn collect_fields<C>(
    ctx: ExecCtx<'_, C>,
    parent_type_name: &str,
    parent_value: &Value,
    selection_set: &[Selection],
    path: &Path,
    out: &mut IndexMap<String, CollectedField>,
    pending: &Pending<C>,
) -> Result<(), GraphQLError> {
    for selection in selection_set {
        match selection {
            Selection::Field(field) => {
                if !directives::is_selected(&field.directives, ctx.variables()) {
                    continue;
                }
                let entry = out.entry(field.response_key().to_owned()).or_insert_with(|| CollectedField {
                    name: field.name.clone(),
                    arguments: field.arguments.clone(),
                    directives: field.directives.clone(),
                    location: field.location,
                    sub_selections: Vec::new(),
                });
                entry.sub_selections.extend(field.selection_set.iter().cloned());
            }
            Selection::FragmentSpread(spread) => {
                if !directives::is_selected(&spread.directives, ctx.variables()) {
                    continue;
                }
                match directives::eval_defer(&spread.directives, ctx.variables(), ctx.enabled())? {
                    DeferOutcome::Defer { label } => {
                        if ctx.claim_label(&label, path) {
                            let fragment = ctx.document().fragments.get(&spread.name).ok_or_else(|| {
                                GraphQLError::Internal(format!("unknown fragment {}", spread.name))
                            })?;
                            pending.lock().unwrap().push(PendingUnit {
                                label,
                                path: path.clone(),
                                kind: UnitKind::Defer,
                                payload: UnitPayload::Defer {
                                    parent_type: parent_type_name.to_owned(),
                                    parent_value: parent_value.clone(),
                                    selection_set: fragment.selection_set.clone(),
                                    _marker: std::marker::PhantomData,
                                },
                            });
                        } else {
                            inline_spread(ctx, parent_type_name, parent_value, spread, path, out, pending)?;
                        }
                    }
                    DeferOutcome::Inline => {
                        inline_spread(ctx, parent_type_name, parent_value, spread, path, out, pending)?;
                    }
                }
            }
            Selection::InlineFragment(inline) => {
                if !directives::is_selected(&inline.directives, ctx.variables()) {
                    continue;
                }
                match directives::eval_defer(&inline.directives, ctx.variables(), ctx.enabled())? {
                    DeferOutcome::Defer { label } => {
                        if ctx.claim_label(&label, path) {
                            pending.lock().unwrap().push(PendingUnit {
                                label,
                                path: path.clone(),
                                kind: UnitKind::Defer,
                                payload: UnitPayload::Defer {
                                    parent_type: parent_type_name.to_owned(),
                                    parent_value: parent_value.clone(),
                                    selection_set: inline.selection_set.clone(),
                                    _marker: std::marker::PhantomData,
                                },
                            });
                        } else {
                            collect_fields(ctx, parent_type_name, parent_value, &inline.selection_set, path, out, pending)?;
                        }
                    }
                    DeferOutcome::Inline => {
                        collect_fields(ctx, parent_type_name, parent_value, &inline.selection_set, path, out, pending)?;
                    }
                }
            }
        }
    }
    Ok(())
}

fn inline_spread<C>(
    ctx: ExecCtx<'_, C>,
    parent_type_name: &str,
    parent_value: &Value,
    spread: &FragmentSpread,
    path: &Path,
    out: &mut IndexMap<String, CollectedField>,
    pending: &Pending<C>,
) -> Result<(), GraphQLError> {
    let fragment = ctx
        .document()
        .fragments
        .get(&spread.name)
        .ok_or_else(|| GraphQLError::Internal(format!("unknown fragment {}", spread.name)))?;
    collect_fields(ctx, parent_type_name, parent_value, &fragment.selection_set, path, out, pending)
}

fn resolve_arguments(args: &[Argument], variables: &Variables) -> Arguments {
    args.iter().map(|a| (a.name.clone(), a.value.resolve(variables))).collect()
}

/// Resolves a selection set against `parent_value` of type `parent_type_name`,
/// returning the assembled object, or `Err(())` if a non-null field within
/// it failed and must bubble to the nearest nullable ancestor.
pub(crate) fn execute_selection_set<'f, C>(
    ctx: ExecCtx<'f, C>,
    parent_type_name: &'f str,
    parent_value: &'f Value,
    selection_set: &'f [Selection],
    path: Path,
    pending: &'f Pending<C>,
) -> crate::schema::BoxFuture<'f, Result<Value, ()>>
where
    C: Sync + Send + 'f,
{
    Box::pin(async move {
        let object_type = ctx
            .schema()
            .object_type(parent_type_name)
            .unwrap_or_else(|| panic!("schema has no object type named {parent_type_name:?}"));

        let mut collected = IndexMap::new();
        if let Err(error) = collect_fields(ctx, parent_type_name, parent_value, selection_set, &path, &mut collected, pending) {
            ctx.push_request_error(error, path);
            return Ok(Value::Object(Object::with_capacity(0)));
        }

        let mut futures = Vec::with_capacity(collected.len());
        for (response_key, field) in collected {
            let field_def = object_type
                .field_by_name(&field.name)
                .unwrap_or_else(|| panic!("schema type {parent_type_name:?} has no field named {:?}", field.name));
            let field_path = path.append_field(response_key.clone());
            futures.push(async move {
                let outcome = resolve_field(ctx, field_def, field, parent_value, field_path, pending).await;
                (response_key, outcome)
            });
        }

        let results = futures::future::join_all(futures).await;

        let mut object = Object::with_capacity(results.len());
        let mut bubbled = false;
        for (key, outcome) in results {
            match outcome {
                Ok(value) => {
                    object.insert(key, value);
                }
                Err(()) => bubbled = true,
            }
        }

        if bubbled {
            Err(())
        } else {
            Ok(Value::Object(object))
        }
    })
}

async fn resolve_field<'f, C>(
    ctx: ExecCtx<'f, C>,
    field_def: &'f FieldDef<C>,
    field: CollectedField,
    parent_value: &'f Value,
    field_path: Path,
    pending: &'f Pending<C>,
) -> Result<Value, ()>
where
    C: Sync + Send + 'f,
{
    let arguments = resolve_arguments(&field.arguments, ctx.variables());
    let resolved = field_def.resolve(parent_value, &arguments, ctx.context()).await;

    let type_ref = field_def.type_ref();
    match resolved {
        Err(field_error) => {
            ctx.push_error(&field_error, field_path, Some(field.location));
            if type_ref.is_non_null() {
                Err(())
            } else {
                Ok(Value::Null)
            }
        }
        Ok(raw) => {
            let completed = complete_value(ctx, type_ref, &field.directives, field.sub_selections, field_path, raw, pending).await;
            match completed {
                Ok(value) => Ok(value),
                Err(()) if type_ref.is_non_null() => Err(()),
                Err(()) => Ok(Value::Null),
            }
        }
    }
}

/// Completes a raw resolver value against its declared type: descends
/// through `List`/`NonNull` wrappers, recurses into object sub-selections,
/// and (at a list field carrying `@stream`) splits the list into its
/// inline prefix and its streamed tail.
pub(crate) fn complete_value<'f, C>(
    ctx: ExecCtx<'f, C>,
    type_ref: &'f TypeRef,
    directives: &'f [Directive],
    selection_set: Vec<Selection>,
    path: Path,
    raw: Value,
    pending: &'f Pending<C>,
) -> crate::schema::BoxFuture<'f, Result<Value, ()>>
where
    C: Sync + Send + 'f,
{
    Box::pin(async move {
        if raw.is_null() {
            if type_ref.is_non_null() {
                let error = FieldError::from("Cannot return null for non-nullable field.");
                ctx.push_error(&error, path, None);
                return Err(());
            }
            return Ok(Value::Null);
        }

        match type_ref.nullable_inner() {
            TypeRef::Scalar | TypeRef::Enum => Ok(raw),
            TypeRef::Object(name) => execute_selection_set(ctx, name, &raw, &selection_set, path, pending).await,
            TypeRef::List(elem_ty) => {
                let Value::List(items) = raw else {
                    return Ok(Value::Null);
                };
                complete_list(ctx, elem_ty, directives, selection_set, path, items, pending).await
            }
            TypeRef::NonNull(_) => unreachable!("nullable_inner strips NonNull"),
        }
    })
}

fn complete_list<'f, C>(
    ctx: ExecCtx<'f, C>,
    elem_ty: &'f TypeRef,
    directives: &'f [Directive],
    selection_set: Vec<Selection>,
    path: Path,
    items: Vec<Value>,
    pending: &'f Pending<C>,
) -> crate::schema::BoxFuture<'f, Result<Value, ()>>
where
    C: Sync + Send + 'f,
{
    Box::pin(async move {
        let stream_outcome = match directives::eval_stream(directives, ctx.variables(), ctx.enabled()) {
            Ok(outcome) => outcome,
            Err(error) => {
                ctx.push_request_error(error, path.clone());
                StreamOutcome::Inline
            }
        };

        match stream_outcome {
            StreamOutcome::Stream { label, initial_count } if ctx.claim_label(&label, &path) => {
                let n = initial_count.min(items.len());
                let mut iter = items.into_iter().enumerate();

                let mut inline_futs = Vec::with_capacity(n);
                for _ in 0..n {
                    let (i, item) = iter.next().expect("n <= items.len()");
                    inline_futs.push(complete_value(
                        ctx,
                        elem_ty,
                        &[],
                        selection_set.clone(),
                        path.append_index(i),
                        item,
                        pending,
                    ));
                }
                let completed = futures::future::join_all(inline_futs).await;
                let mut bubbled = false;
                let mut out = Vec::with_capacity(n);
                for r in completed {
                    match r {
                        Ok(v) => out.push(v),
                        Err(()) => bubbled = true,
                    }
                }

                for (i, item) in iter {
                    pending.lock().unwrap().push(PendingUnit {
                        label: label.clone(),
                        path: path.append_index(i),
                        kind: UnitKind::StreamElement,
                        payload: UnitPayload::StreamElement {
                            element_type: elem_ty.clone(),
                            element_value: item,
                            selection_set: selection_set.clone(),
                            _marker: std::marker::PhantomData,
                        },
                    });
                }

                if bubbled {
                    Err(())
                } else {
                    Ok(Value::List(out))
                }
            }
            _ => {
                let mut futs = Vec::with_capacity(items.len());
                for (i, item) in items.into_iter().enumerate() {
                    futs.push(complete_value(ctx, elem_ty, &[], selection_set.clone(), path.append_index(i), item, pending));
                }
                let completed = futures::future::join_all(futs).await;
                let mut bubbled = false;
                let mut out = Vec::with_capacity(completed.len());
                for r in completed {
                    match r {
                        Ok(v) => out.push(v),
                        Err(()) => bubbled = true,
                    }
                }
                if bubbled {
                    Err(())
                } else {
                    Ok(Value::List(out))
                }
            }
        }
    })
}

/// Resolves one registered deferred/stream unit's own payload: its
/// completed value, the errors raised while producing it, and any further
/// deferred/stream units discovered along the way (its *children*, in
/// dispatcher terms).
#[cfg_attr(feature = "tracing", tracing::instrument(skip_all, fields(label = %unit.label, path = %unit.path)))]
pub(crate) async fn resolve_unit<C>(owned: &OwnedExecCtx<C>, unit: &PendingUnit<C>) -> (Value, Vec<ExecutionError>, Vec<PendingUnit<C>>)
where
    C: Sync + Send,
{
    let local_errors = Mutex::new(Vec::new());
    let ctx = owned.as_ctx(&local_errors);
    let nested = Mutex::new(Vec::new());

    let data = match &unit.payload {
        UnitPayload::Defer {
            parent_type,
            parent_value,
            selection_set,
            ..
        } => execute_selection_set(ctx, parent_type, parent_value, selection_set, unit.path.clone(), &nested)
            .await
            .unwrap_or(Value::Null),
        UnitPayload::StreamElement {
            element_type,
            element_value,
            selection_set,
            ..
        } => complete_value(ctx, element_type, &[], selection_set.clone(), unit.path.clone(), element_value.clone(), &nested)
            .await
            .unwrap_or(Value::Null),
    };

    (data, local_errors.into_inner().unwrap(), nested.into_inner().unwrap())
}

/// Evaluates an operation against `schema` and returns its initial result
/// plus a lazy patch sequence.
#[cfg_attr(feature = "tracing", tracing::instrument(skip_all, fields(operation_name = input.operation_name.as_deref())))]
pub async fn execute<C>(input: ExecutionInput<C>) -> Result<ExecutionOutput, GraphQLError>
where
    C: Send + Sync + 'static,
{
    let operation = input.document.get_operation(input.operation_name.as_deref())?;

    let owned = OwnedExecCtx {
        schema: Arc::clone(&input.schema),
        document: Arc::clone(&input.document),
        variables: Arc::new(input.variables),
        context: Arc::clone(&input.context),
        enable_deferred_delivery: input.enable_deferred_delivery,
        seen_labels: Arc::new(Mutex::new(std::collections::HashSet::new())),
        request_errors: Arc::new(Mutex::new(Vec::new())),
    };

    let root_type_name = owned.schema.query_type().name().to_owned();
    let root_value = input.root_value;
    let pending = Mutex::new(Vec::new());

    let data = {
        let ctx = owned.as_ctx(&owned.request_errors);
        execute_selection_set(ctx, &root_type_name, &root_value, &operation.selection_set, Path::empty(), &pending)
            .await
            .ok()
    };

    let errors = owned.request_errors.lock().unwrap().clone();
    let pending = pending.into_inner().unwrap();

    let dispatcher = Dispatcher::new(owned, pending);
    let patches = dispatcher.into_patch_stream();

    Ok(ExecutionOutput { data, errors, patches })
}
