//! `equal` / `notEqual` and `matchRegex` / `notMatchRegex`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use regex::Regex;
use serde::Deserialize;
use serde_yaml::Value;

use super::report::{self, diff, expected, indent, indent_yaml, path_line, to_yaml};
use super::{require_path, Outcome, Validate, ValidateContext};
use crate::path::DocPath;

/// Decodes a base64 string value found in a document (secrets' `data`).
fn decode_base64(value: &Value) -> std::result::Result<Value, String> {
    let encoded = value
        .as_str()
        .ok_or_else(|| format!("expected a base64 string, found {}", to_yaml(value)))?;
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| format!("invalid base64: {}", e))?;
    String::from_utf8(bytes)
        .map(Value::String)
        .map_err(|e| format!("decoded value is not UTF-8: {}", e))
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EqualValidator {
    #[serde(default)]
    pub path: DocPath,
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub decode_base64: bool,
}

impl Validate for EqualValidator {
    fn validate(&self, ctx: &mut ValidateContext<'_>) -> Outcome {
        let found = match require_path(ctx, &self.path) {
            Ok(found) => found,
            Err(failure) => return failure,
        };
        let actual = if self.decode_base64 {
            match decode_base64(found) {
                Ok(decoded) => decoded,
                Err(message) => return report::error(ctx, message),
            }
        } else {
            found.clone()
        };

        report::verdict(ctx, actual == self.value, || {
            let expected_text = to_yaml(&self.value);
            let actual_text = to_yaml(&actual);
            let mut lines = vec![path_line(&self.path), expected(ctx.negative, "to equal")];
            lines.extend(indent(&expected_text));
            if !ctx.negative {
                lines.push("Actual:".to_string());
                lines.extend(indent(&actual_text));
                lines.extend(diff(&expected_text, &actual_text));
            }
            lines
        })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRegexValidator {
    #[serde(default)]
    pub path: DocPath,
    pub pattern: String,
    #[serde(default)]
    pub decode_base64: bool,
}

impl Validate for MatchRegexValidator {
    fn validate(&self, ctx: &mut ValidateContext<'_>) -> Outcome {
        let regex = match Regex::new(&self.pattern) {
            Ok(regex) => regex,
            Err(e) => return report::error(ctx, e),
        };
        let found = match require_path(ctx, &self.path) {
            Ok(found) => found,
            Err(failure) => return failure,
        };
        let found = if self.decode_base64 {
            match decode_base64(found) {
                Ok(decoded) => decoded,
                Err(message) => return report::error(ctx, message),
            }
        } else {
            found.clone()
        };
        let Some(actual) = found.as_str() else {
            return report::error(
                ctx,
                format!("expected {} to be a string", to_yaml(&found)),
            );
        };

        report::verdict(ctx, regex.is_match(actual), || {
            let mut lines = vec![path_line(&self.path), expected(ctx.negative, "to match")];
            lines.push(format!("\t{}", self.pattern));
            lines.push("Actual:".to_string());
            lines.extend(indent_yaml(&found));
            lines
        })
    }
}
