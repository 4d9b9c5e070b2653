//! The Patch Dispatcher: schedules registered `@defer`/`@stream` units and
//! assembles their results into the lazy [`PatchStream`] returned alongside
//! an operation's initial result.
//!
//! Siblings that resolved from the *same* directive occurrence executing
//! multiple times (one `@defer`red fragment spread inside an ordinarily
//! resolved list, for instance) share a `label` and are aggregated into a
//! single [`PatchRecord`] at their longest common response-path prefix.
//! `@stream` elements never aggregate: each carries a synthetic,
//! path-qualified grouping key so it is always emitted on its own.
//!
//! Nested deferred/stream units discovered while resolving a unit's own
//! payload are that unit's *children*: their patches are always fully
//! resolved, and placed ahead of their parent's own patch in the emitted
//! sequence, before the parent's patch is produced at all. Unrelated
//! top-level units race via [`futures::stream::FuturesUnordered`], so two
//! independent `@defer`s or `@stream`s interleave in real completion order.

use futures::{
    future::{join_all, BoxFuture},
    stream::{self, FuturesUnordered},
    Stream, StreamExt,
};
use indexmap::IndexMap;

use crate::{
    executor::{self, OwnedExecCtx},
    patch::PatchRecord,
    path::{Path, Segment},
    schema::TypeRef,
    value::{Object, Value},
};

/// Distinguishes the two directive sources of deferred work, so that only
/// `Defer` siblings sharing a label are aggregated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum UnitKind {
    Defer,
    StreamElement,
}

/// The work a registered unit still has to do once scheduled.
#[derive(Clone)]
pub(crate) enum UnitPayload<C> {
    /// A deferred fragment: resolve `selection_set` against `parent_value`,
    /// as if it had been executed inline on `parent_type`.
    Defer {
        parent_type: String,
        parent_value: Value,
        selection_set: Vec<crate::ast::Selection>,
        _marker: std::marker::PhantomData<C>,
    },
    /// One element beyond a `@stream`'s `initial_count`.
    StreamElement {
        element_type: TypeRef,
        element_value: Value,
        selection_set: Vec<crate::ast::Selection>,
        _marker: std::marker::PhantomData<C>,
    },
}

/// A unit of deferred or streamed work discovered during traversal, not yet
/// resolved.
pub(crate) struct PendingUnit<C> {
    pub label: String,
    pub path: Path,
    pub kind: UnitKind,
    pub payload: UnitPayload<C>,
}

/// The lazily-produced sequence of [`PatchRecord`]s for one execution.
///
/// Dropping the stream before it is exhausted cancels every unit that has
/// not yet finished resolving: nothing here is spawned onto a background
/// executor, so unpolled futures (and the resolver work they hold) are
/// simply dropped in place.
pub type PatchStream = std::pin::Pin<Box<dyn Stream<Item = PatchRecord> + Send>>;

fn group_key<C>(unit: &PendingUnit<C>) -> String {
    match unit.kind {
        UnitKind::Defer => unit.label.clone(),
        // Stream elements never merge with each other, regardless of label:
        // the path makes every key unique.
        UnitKind::StreamElement => format!("{}\u{0}{}", unit.label, unit.path.as_key()),
    }
}

fn group_units<C>(units: Vec<PendingUnit<C>>) -> Vec<Vec<PendingUnit<C>>> {
    let mut groups: IndexMap<String, Vec<PendingUnit<C>>> = IndexMap::new();
    for unit in units {
        groups.entry(group_key(&unit)).or_default().push(unit);
    }
    groups.into_values().collect()
}

/// The segments of `full` beyond the prefix shared with `lcp`.
fn relative_segments(lcp: &Path, full: &Path) -> Vec<Segment> {
    full.as_array().split_off(lcp.len())
}

/// Writes `data` into `acc` at `path`, creating intermediate objects/lists
/// as needed and merging object fields on collision.
fn apply_patch(acc: &mut Value, path: &[Segment], data: Value) {
    let Some((head, rest)) = path.split_first() else {
        match (acc, data) {
            (Value::Object(existing), Value::Object(incoming)) => existing.merge(incoming),
            (slot, data) => *slot = data,
        }
        return;
    };

    match head {
        Segment::Field(name) => {
            if !matches!(acc, Value::Object(_)) {
                *acc = Value::Object(Object::with_capacity(1));
            }
            let Value::Object(obj) = acc else { unreachable!() };
            match obj.get_mut(name) {
                Some(existing) => apply_patch(existing, rest, data),
                None => {
                    let mut slot = Value::Null;
                    apply_patch(&mut slot, rest, data);
                    obj.insert(name.to_string(), slot);
                }
            }
        }
        Segment::Index(index) => {
            if !matches!(acc, Value::List(_)) {
                *acc = Value::List(Vec::new());
            }
            let Value::List(list) = acc else { unreachable!() };
            while list.len() <= *index {
                list.push(Value::Null);
            }
            apply_patch(&mut list[*index], rest, data);
        }
    }
}

struct SubtreeResult {
    label: String,
    path: Path,
    value: Value,
    errors: Vec<crate::error::ExecutionError>,
    /// Already-resolved patches from nested units, ordered child-first.
    nested_patches: Vec<PatchRecord>,
}

fn resolve_subtree<C>(owned: OwnedExecCtx<C>, unit: PendingUnit<C>) -> BoxFuture<'static, SubtreeResult>
where
    C: Send + Sync + 'static,
{
    Box::pin(async move {
        let (value, errors, nested) = executor::resolve_unit(&owned, &unit).await;
        let nested_patches = if nested.is_empty() {
            Vec::new()
        } else {
            resolve_groups(owned, group_units(nested)).await
        };
        SubtreeResult {
            label: unit.label,
            path: unit.path,
            value,
            errors,
            nested_patches,
        }
    })
}

fn resolve_group<C>(owned: OwnedExecCtx<C>, group: Vec<PendingUnit<C>>) -> BoxFuture<'static, Vec<PatchRecord>>
where
    C: Send + Sync + 'static,
{
    Box::pin(async move {
        let results = join_all(group.into_iter().map(|unit| resolve_subtree(owned.clone(), unit))).await;

        let mut children = Vec::new();
        let lcp = results
            .iter()
            .map(|r| r.path.clone())
            .reduce(|acc, p| acc.longest_common_prefix(&p))
            .unwrap_or_else(Path::empty);

        let label = results
            .first()
            .map(|r| r.label.clone())
            .unwrap_or_default();
        let mut merged = Value::Null;
        let mut errors = Vec::new();
        for result in results {
            let relative = relative_segments(&lcp, &result.path);
            apply_patch(&mut merged, &relative, result.value);
            errors.extend(result.errors);
            children.extend(result.nested_patches);
        }

        children.push(PatchRecord::new(label, lcp, merged, errors));
        children
    })
}

fn resolve_groups<C>(owned: OwnedExecCtx<C>, groups: Vec<Vec<PendingUnit<C>>>) -> BoxFuture<'static, Vec<PatchRecord>>
where
    C: Send + Sync + 'static,
{
    Box::pin(async move {
        let per_group = join_all(groups.into_iter().map(|g| resolve_group(owned.clone(), g))).await;
        per_group.into_iter().flatten().collect()
    })
}

/// Owns the deferred/stream work registered while executing one operation,
/// and turns it into a [`PatchStream`].
pub(crate) struct Dispatcher<C> {
    owned: OwnedExecCtx<C>,
    groups: Vec<Vec<PendingUnit<C>>>,
}

impl<C> Dispatcher<C>
where
    C: Send + Sync + 'static,
{
    pub(crate) fn new(owned: OwnedExecCtx<C>, pending: Vec<PendingUnit<C>>) -> Self {
        Self {
            owned,
            groups: group_units(pending),
        }
    }

    /// Consumes the dispatcher, returning `None` if no work was registered
    /// (i.e. the operation had no `@defer`/`@stream`), or a stream emitting
    /// every top-level group's patches in real completion order, internally
    /// ordered child-before-parent.
    pub(crate) fn into_patch_stream(self) -> Option<PatchStream> {
        if self.groups.is_empty() {
            return None;
        }

        let futures: FuturesUnordered<BoxFuture<'static, Vec<PatchRecord>>> = self
            .groups
            .into_iter()
            .map(|group| resolve_group(self.owned.clone(), group))
            .collect();

        let flattened = futures.flat_map(|patches| stream::iter(patches));
        Some(Box::pin(flattened))
    }
}
