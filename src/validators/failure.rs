//! `failedTemplate` / `notFailedTemplate`: assertions about the render
//! outcome itself.

use regex::Regex;
use serde::Deserialize;

use super::report;
use super::{Outcome, Validate, ValidateContext};

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct FailedTemplateValidator {
    /// Substring the render error must contain.
    #[serde(default)]
    pub error_message: Option<String>,
    /// Regex the render error must match.
    #[serde(default)]
    pub error_pattern: Option<String>,
}

impl FailedTemplateValidator {
    fn expectation(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(message) = &self.error_message {
            lines.push(format!("\t{}", message));
        }
        if let Some(pattern) = &self.error_pattern {
            lines.push(format!("\t/{}/", pattern));
        }
        lines
    }
}

impl Validate for FailedTemplateValidator {
    fn validate(&self, ctx: &mut ValidateContext<'_>) -> Outcome {
        let pattern = match self.error_pattern.as_deref().map(Regex::new).transpose() {
            Ok(pattern) => pattern,
            Err(e) => return report::error(ctx, e),
        };
        let actual = ctx.render_error.map(|e| e.to_string());

        let matched = actual.as_deref().is_some_and(|message| {
            self.error_message
                .as_deref()
                .map_or(true, |want| message.contains(want))
                && pattern.as_ref().map_or(true, |re| re.is_match(message))
        });

        report::verdict(ctx, matched, || match (&actual, ctx.negative) {
            (Some(message), true) => vec![
                "Expected NOT to fail, but got:".to_string(),
                format!("\t{}", message),
            ],
            (None, _) => {
                let mut lines = vec!["Expected to fail with:".to_string()];
                lines.extend(self.expectation());
                lines.push("But rendered without error".to_string());
                lines
            }
            (Some(message), false) => {
                let mut lines = vec!["Expected to fail with:".to_string()];
                lines.extend(self.expectation());
                lines.push("Actual:".to_string());
                lines.push(format!("\t{}", message));
                lines
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::build;
    use super::super::{Outcome, Validate, ValidateContext};
    use crate::render::RenderError;
    use crate::snapshot::{SnapshotCache, SnapshotCursor};

    fn check(params: &str, negative: bool, error: Option<&RenderError>) -> Outcome {
        let validator = build("failedTemplate", params);
        let mut cache = SnapshotCache::in_memory(false);
        let mut cursor = SnapshotCursor::new(&mut cache, "0");
        let mut ctx = ValidateContext {
            template: "templates/deployment.yaml",
            documents: &[],
            document_index: 0,
            negative,
            render_error: error,
            snapshots: &mut cursor,
        };
        validator.validate(&mut ctx)
    }

    #[test]
    fn matches_message_and_pattern() {
        let error = RenderError::template("values don't meet the specifications of the schema(s)");
        assert!(check("errorMessage: schema", false, Some(&error)).0);
        assert!(check("errorPattern: meet the .* schema", false, Some(&error)).0);
        assert!(check("{}", false, Some(&error)).0);
        assert!(!check("errorMessage: other", false, Some(&error)).0);
    }

    #[test]
    fn absent_error_fails_unless_negated() {
        let (passed, info) = check("errorMessage: boom", false, None);
        assert!(!passed);
        assert_eq!(info.last().unwrap(), "But rendered without error");
        assert!(check("{}", true, None).0);
    }

    #[test]
    fn negated_with_error_fails() {
        let error = RenderError::template("boom");
        let (passed, info) = check("{}", true, Some(&error));
        assert!(!passed);
        assert_eq!(&info[2..], ["Expected NOT to fail, but got:", "\tboom"]);
    }
}
