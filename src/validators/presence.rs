//! `isNull` / `isNotNull` and `isEmpty` / `isNotEmpty`.
//!
//! A path that does not exist counts as null and as empty.

use serde::Deserialize;
use serde_yaml::Value;

use super::report::{self, expected, indent_yaml, path_line};
use super::{lookup_path, Outcome, Validate, ValidateContext};
use crate::path::DocPath;

fn actual_lines(found: Option<&Value>) -> Vec<String> {
    let mut lines = vec!["Actual:".to_string()];
    lines.extend(indent_yaml(found.unwrap_or(&Value::Null)));
    lines
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IsNullValidator {
    #[serde(default)]
    pub path: DocPath,
}

impl Validate for IsNullValidator {
    fn validate(&self, ctx: &mut ValidateContext<'_>) -> Outcome {
        let found = match lookup_path(ctx, &self.path) {
            Ok(found) => found,
            Err(failure) => return failure,
        };
        let is_null = found.map_or(true, Value::is_null);
        report::verdict(ctx, is_null, || {
            let mut lines = vec![path_line(&self.path), expected(ctx.negative, "to be null, got")];
            lines.extend(actual_lines(found).into_iter().skip(1));
            lines
        })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IsEmptyValidator {
    #[serde(default)]
    pub path: DocPath,
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Sequence(items) => items.is_empty(),
        Value::Mapping(map) => map.is_empty(),
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::Tagged(tagged) => is_empty(&tagged.value),
    }
}

impl Validate for IsEmptyValidator {
    fn validate(&self, ctx: &mut ValidateContext<'_>) -> Outcome {
        let found = match lookup_path(ctx, &self.path) {
            Ok(found) => found,
            Err(failure) => return failure,
        };
        let empty = found.map_or(true, is_empty);
        report::verdict(ctx, empty, || {
            let mut lines = vec![path_line(&self.path), expected(ctx.negative, "to be empty")];
            lines.extend(actual_lines(found));
            lines
        })
    }
}
