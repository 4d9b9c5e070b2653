//! Evaluation of `@include`, `@skip`, `@defer`, and `@stream`.

use std::collections::HashMap;

use crate::{
    ast::Directive,
    error::GraphQLError,
    value::Value,
};

/// Outcome of evaluating `@defer` on a selection.
#[derive(Clone, Debug, PartialEq)]
pub enum DeferOutcome {
    /// No `@defer`, or `@defer(if: false)`: execute inline as usual.
    Inline,
    /// `@defer(label: ..)` applies; register a deferred unit under `label`.
    Defer {
        /// The directive's required, unique label.
        label: String,
    },
}

/// Outcome of evaluating `@stream` on a list field selection.
#[derive(Clone, Debug, PartialEq)]
pub enum StreamOutcome {
    /// No `@stream`, or `@stream(if: false)`: resolve the whole list inline.
    Inline,
    /// `@stream(label:, initial_count:)` applies.
    Stream {
        /// The directive's required, unique label.
        label: String,
        /// Number of leading elements resolved inline.
        initial_count: usize,
    },
}

fn find<'a>(directives: &'a [Directive], name: &str) -> Option<&'a Directive> {
    directives.iter().find(|d| d.name == name)
}

/// Evaluates `@skip(if:)` then `@include(if:)`: if either causes the
/// selection to be omitted, returns `false` and evaluation stops there.
pub fn is_selected(directives: &[Directive], variables: &HashMap<String, Value>) -> bool {
    if let Some(skip) = find(directives, "skip") {
        let should_skip = skip
            .argument("if")
            .map(|v| v.resolve_bool(variables, false))
            .unwrap_or(false);
        if should_skip {
            return false;
        }
    }
    if let Some(include) = find(directives, "include") {
        let should_include = include
            .argument("if")
            .map(|v| v.resolve_bool(variables, true))
            .unwrap_or(true);
        if !should_include {
            return false;
        }
    }
    true
}

/// Evaluates `@defer` on a fragment spread or inline fragment.
///
/// `enabled` is the request-level `enable_deferred_delivery` flag: when
/// `false`, `@defer` is always treated as absent.
pub fn eval_defer(
    directives: &[Directive],
    variables: &HashMap<String, Value>,
    enabled: bool,
) -> Result<DeferOutcome, GraphQLError> {
    if !enabled {
        return Ok(DeferOutcome::Inline);
    }
    let Some(directive) = find(directives, "defer") else {
        return Ok(DeferOutcome::Inline);
    };

    for arg in &directive.arguments {
        if arg.name != "label" && arg.name != "if" {
            return Err(GraphQLError::UnknownDirectiveArgument {
                directive: "defer",
                argument: arg.name.clone(),
            });
        }
    }

    let if_true = directive
        .argument("if")
        .map(|v| v.resolve_bool(variables, true))
        .unwrap_or(true);
    if !if_true {
        return Ok(DeferOutcome::Inline);
    }

    let label = directive
        .argument("label")
        .and_then(|v| v.resolve_string(variables))
        .ok_or_else(|| GraphQLError::Internal("@defer requires a label".into()))?;

    Ok(DeferOutcome::Defer { label })
}

/// Evaluates `@stream` on a list field selection.
pub fn eval_stream(
    directives: &[Directive],
    variables: &HashMap<String, Value>,
    enabled: bool,
) -> Result<StreamOutcome, GraphQLError> {
    if !enabled {
        return Ok(StreamOutcome::Inline);
    }
    let Some(directive) = find(directives, "stream") else {
        return Ok(StreamOutcome::Inline);
    };

    for arg in &directive.arguments {
        if !["label", "if", "initial_count", "initialCount"].contains(&arg.name.as_str()) {
            return Err(GraphQLError::UnknownDirectiveArgument {
                directive: "stream",
                argument: arg.name.clone(),
            });
        }
    }

    let if_true = directive
        .argument("if")
        .map(|v| v.resolve_bool(variables, true))
        .unwrap_or(true);
    if !if_true {
        return Ok(StreamOutcome::Inline);
    }

    let label = directive
        .argument("label")
        .and_then(|v| v.resolve_string(variables))
        .ok_or_else(|| GraphQLError::Internal("@stream requires a label".into()))?;

    let initial_count_arg = directive
        .argument("initial_count")
        .or_else(|| directive.argument("initialCount"))
        .ok_or_else(|| GraphQLError::Internal("@stream requires initial_count".into()))?;
    let initial_count = match initial_count_arg.resolve(variables) {
        Value::Int(n) if n >= 0 => n as usize,
        Value::Int(n) => {
            return Err(GraphQLError::InvalidInitialCount {
                label,
                initial_count: n.into(),
            })
        }
        other => {
            return Err(GraphQLError::Internal(format!(
                "@stream(initial_count:) must be a non-negative integer, got {other:?}"
            )))
        }
    };

    Ok(StreamOutcome::Stream { label, initial_count })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Argument, ArgumentValue};

    fn directive(name: &str, args: Vec<(&str, ArgumentValue)>) -> Directive {
        Directive {
            name: name.to_owned(),
            arguments: args
                .into_iter()
                .map(|(name, value)| Argument { name: name.to_owned(), value })
                .collect(),
        }
    }

    #[test]
    fn skip_true_omits_selection() {
        let dirs = vec![directive("skip", vec![("if", ArgumentValue::Bool(true))])];
        assert!(!is_selected(&dirs, &HashMap::new()));
    }

    #[test]
    fn include_false_omits_selection() {
        let dirs = vec![directive("include", vec![("if", ArgumentValue::Bool(false))])];
        assert!(!is_selected(&dirs, &HashMap::new()));
    }

    #[test]
    fn no_directives_selects() {
        assert!(is_selected(&[], &HashMap::new()));
    }

    #[test]
    fn defer_disabled_globally_is_inline() {
        let dirs = vec![directive(
            "defer",
            vec![("label", ArgumentValue::String("X".into()))],
        )];
        assert_eq!(
            eval_defer(&dirs, &HashMap::new(), false).unwrap(),
            DeferOutcome::Inline
        );
    }

    #[test]
    fn defer_if_false_is_inline() {
        let dirs = vec![directive(
            "defer",
            vec![
                ("label", ArgumentValue::String("X".into())),
                ("if", ArgumentValue::Bool(false)),
            ],
        )];
        assert_eq!(
            eval_defer(&dirs, &HashMap::new(), true).unwrap(),
            DeferOutcome::Inline
        );
    }

    #[test]
    fn defer_with_label_registers() {
        let dirs = vec![directive(
            "defer",
            vec![("label", ArgumentValue::String("NameFragment".into()))],
        )];
        assert_eq!(
            eval_defer(&dirs, &HashMap::new(), true).unwrap(),
            DeferOutcome::Defer { label: "NameFragment".into() }
        );
    }

    #[test]
    fn stream_negative_initial_count_is_rejected() {
        let dirs = vec![directive(
            "stream",
            vec![
                ("label", ArgumentValue::String("X".into())),
                ("initial_count", ArgumentValue::Int(-1)),
            ],
        )];
        assert!(matches!(
            eval_stream(&dirs, &HashMap::new(), true),
            Err(GraphQLError::InvalidInitialCount { .. })
        ));
    }

    #[test]
    fn stream_unknown_argument_is_a_request_error() {
        let dirs = vec![directive(
            "stream",
            vec![
                ("label", ArgumentValue::String("X".into())),
                ("initial_count", ArgumentValue::Int(1)),
                ("bogus", ArgumentValue::Bool(true)),
            ],
        )];
        assert!(matches!(
            eval_stream(&dirs, &HashMap::new(), true),
            Err(GraphQLError::UnknownDirectiveArgument { .. })
        ));
    }
}
