//! The wire-level shape of a single deferred/streamed delivery.

use crate::{error::ExecutionError, path::Path, value::Value};

/// A single patch: the delta produced by one `@defer`red fragment or one
/// `@stream`ed list element (or aggregated group, for sibling `@defer`s
/// sharing a label; see [`crate::dispatcher`]).
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PatchRecord {
    /// The `label` declared on the directive site this patch correlates to.
    pub label: String,
    /// The response path at which `data` should be merged.
    pub path: Path,
    /// The resolved data for this patch: an object for `@defer`, or the
    /// single resolved element for `@stream`.
    pub data: Value,
    /// Errors raised while resolving `data`. Always non-empty when present.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub errors: Option<Vec<ExecutionError>>,
}

impl PatchRecord {
    /// Builds a [`PatchRecord`], normalizing an empty error list to `None`
    /// so that `errors`, when present, is always non-empty.
    pub fn new(label: String, path: Path, data: Value, errors: Vec<ExecutionError>) -> Self {
        Self {
            label,
            path,
            data,
            errors: (!errors.is_empty()).then_some(errors),
        }
    }
}

#[cfg(all(test, feature = "serde"))]
mod tests {
    use super::*;

    #[test]
    fn wire_format_omits_errors_when_none_and_includes_path_as_an_array() {
        let patch = PatchRecord::new(
            "Name".to_owned(),
            Path::empty().append_field("hero"),
            Value::from("R2-D2"),
            Vec::new(),
        );
        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(json["label"], "Name");
        assert_eq!(json["path"], serde_json::json!(["hero"]));
        assert_eq!(json["data"], "R2-D2");
        assert!(json.get("errors").is_none());
    }
}
