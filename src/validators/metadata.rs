//! `isKind` and `isAPIVersion`.

use serde::Deserialize;
use serde_yaml::Value;

use super::report::{self, expected, indent_yaml};
use super::{Outcome, Validate, ValidateContext};

fn check_field(ctx: &ValidateContext<'_>, key: &str, want: &str, label: &str) -> Outcome {
    let document = match ctx.document() {
        Ok(document) => document,
        Err(message) => return report::error(ctx, message),
    };
    let actual = document.get(key).unwrap_or(&Value::Null);
    report::verdict(ctx, actual.as_str() == Some(want), || {
        let mut lines = vec![expected(ctx.negative, label), format!("\t{}", want)];
        lines.push("Actual:".to_string());
        lines.extend(indent_yaml(actual));
        lines
    })
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IsKindValidator {
    pub of: String,
}

impl Validate for IsKindValidator {
    fn validate(&self, ctx: &mut ValidateContext<'_>) -> Outcome {
        check_field(ctx, "kind", &self.of, "to be kind")
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IsApiVersionValidator {
    pub of: String,
}

impl Validate for IsApiVersionValidator {
    fn validate(&self, ctx: &mut ValidateContext<'_>) -> Outcome {
        check_field(ctx, "apiVersion", &self.of, "to be apiVersion")
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{docs, run};

    #[test]
    fn kind_and_api_version() {
        let d = docs(&["apiVersion: apps/v1\nkind: Deployment"]);
        assert!(run("isKind", "of: Deployment", &d, 0).0);
        assert!(run("isAPIVersion", "of: apps/v1", &d, 0).0);
        let (passed, info) = run("isKind", "of: Pod", &d, 0);
        assert!(!passed);
        assert_eq!(&info[2..], ["Expected to be kind:", "\tPod", "Actual:", "\tDeployment"]);
    }
}
