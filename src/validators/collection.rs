//! Checks on sequences and mappings: `contains`, `isSubset`, `lengthEqual`
//! and their negations.

use serde::Deserialize;
use serde_yaml::{Mapping, Value};

use super::report::{self, expected, indent_yaml, path_line, to_yaml};
use super::{lookup_path, require_path, Outcome, Validate, ValidateContext};
use crate::path::DocPath;

/// True when every entry of `subset` appears in `superset` with a
/// recursively matching value.
fn is_subset(subset: &Value, superset: &Value) -> bool {
    match (subset, superset) {
        (Value::Mapping(sub), Value::Mapping(sup)) => sub
            .iter()
            .all(|(key, value)| sup.get(key).is_some_and(|other| is_subset(value, other))),
        _ => subset == superset,
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainsValidator {
    #[serde(default)]
    pub path: DocPath,
    #[serde(default)]
    pub content: Value,
    /// Exact number of matching elements.
    #[serde(default)]
    pub count: Option<usize>,
    /// Match elements that contain `content` rather than equal it.
    #[serde(default)]
    pub any: bool,
}

impl ContainsValidator {
    fn matches(&self, element: &Value) -> bool {
        if self.any {
            is_subset(&self.content, element)
        } else {
            *element == self.content
        }
    }
}

impl Validate for ContainsValidator {
    fn validate(&self, ctx: &mut ValidateContext<'_>) -> Outcome {
        let found = match lookup_path(ctx, &self.path) {
            Ok(found) => found,
            Err(failure) => return failure,
        };
        let items: &[Value] = match found {
            Some(Value::Sequence(items)) => items.as_slice(),
            Some(Value::Null) | None if ctx.negative => &[],
            Some(other) => {
                return report::error(
                    ctx,
                    format!("expected {} to be an array, got:\n{}", self.path, to_yaml(other)),
                )
            }
            None => return report::error(ctx, format!("unknown path {}", self.path)),
        };

        let hits = items.iter().filter(|item| self.matches(item)).count();
        let matched = match self.count {
            Some(count) => hits == count,
            None => hits > 0,
        };
        report::verdict(ctx, matched, || {
            let what = match self.count {
                Some(count) => format!("to contain {} time(s)", count),
                None => "to contain".to_string(),
            };
            let mut lines = vec![path_line(&self.path), expected(ctx.negative, &what)];
            lines.extend(indent_yaml(&self.content));
            lines.push("Actual:".to_string());
            lines.extend(indent_yaml(&Value::Sequence(items.to_vec())));
            lines
        })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IsSubsetValidator {
    #[serde(default)]
    pub path: DocPath,
    #[serde(default)]
    pub content: Mapping,
}

impl Validate for IsSubsetValidator {
    fn validate(&self, ctx: &mut ValidateContext<'_>) -> Outcome {
        let found = match require_path(ctx, &self.path) {
            Ok(found) => found,
            Err(failure) => return failure,
        };
        if !found.is_mapping() {
            return report::error(
                ctx,
                format!("expected {} to be a mapping, got:\n{}", self.path, to_yaml(found)),
            );
        }
        let content = Value::Mapping(self.content.clone());
        report::verdict(ctx, is_subset(&content, found), || {
            let mut lines = vec![path_line(&self.path), expected(ctx.negative, "to contain")];
            lines.extend(indent_yaml(&content));
            lines.push("Actual:".to_string());
            lines.extend(indent_yaml(found));
            lines
        })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LengthEqualValidator {
    #[serde(default)]
    pub path: DocPath,
    pub count: usize,
}

impl Validate for LengthEqualValidator {
    fn validate(&self, ctx: &mut ValidateContext<'_>) -> Outcome {
        let found = match require_path(ctx, &self.path) {
            Ok(found) => found,
            Err(failure) => return failure,
        };
        let length = match found {
            Value::Sequence(items) => items.len(),
            Value::Mapping(map) => map.len(),
            other => {
                return report::error(
                    ctx,
                    format!("expected {} to be an array or mapping, got:\n{}", self.path, to_yaml(other)),
                )
            }
        };
        report::verdict(ctx, length == self.count, || {
            vec![
                path_line(&self.path),
                expected(ctx.negative, "length to be"),
                format!("\t{}", self.count),
                "Actual:".to_string(),
                format!("\t{}", length),
            ]
        })
    }
}
