//! Assertions over whole document lists: `hasDocuments` and
//! `containsDocument`.

use serde::Deserialize;
use serde_yaml::Value;

use super::report::{self, expected};
use super::{Outcome, Validate, ValidateContext};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HasDocumentsValidator {
    pub count: usize,
}

impl Validate for HasDocumentsValidator {
    fn validate(&self, ctx: &mut ValidateContext<'_>) -> Outcome {
        let actual = ctx.documents.len();
        report::verdict(ctx, actual == self.count, || {
            vec![
                expected(ctx.negative, "documents count to be"),
                format!("\t{}", self.count),
                "Actual:".to_string(),
                format!("\t{}", actual),
            ]
        })
    }
}

/// Matches when some document has the given kind and apiVersion, and the
/// given name and namespace when those are set.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainsDocumentValidator {
    pub kind: String,
    pub api_version: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub namespace: Option<String>,
}

impl ContainsDocumentValidator {
    fn matches(&self, document: &Value) -> bool {
        let text = |v: &Value, key: &str| v.get(key).and_then(Value::as_str).map(str::to_string);
        let metadata = document.get("metadata").unwrap_or(&Value::Null);
        text(document, "kind").as_deref() == Some(self.kind.as_str())
            && text(document, "apiVersion").as_deref() == Some(self.api_version.as_str())
            && self
                .name
                .as_ref()
                .map_or(true, |name| text(metadata, "name").as_ref() == Some(name))
            && self
                .namespace
                .as_ref()
                .map_or(true, |ns| text(metadata, "namespace").as_ref() == Some(ns))
    }

    fn describe(&self) -> Vec<String> {
        let mut lines = vec![
            format!("\tkind: {}", self.kind),
            format!("\tapiVersion: {}", self.api_version),
        ];
        if let Some(name) = &self.name {
            lines.push(format!("\tname: {}", name));
        }
        if let Some(namespace) = &self.namespace {
            lines.push(format!("\tnamespace: {}", namespace));
        }
        lines
    }
}

impl Validate for ContainsDocumentValidator {
    fn validate(&self, ctx: &mut ValidateContext<'_>) -> Outcome {
        let found = ctx.documents.iter().any(|doc| self.matches(doc));
        report::verdict(ctx, found, || {
            let mut lines = vec![expected(ctx.negative, "to contain document")];
            lines.extend(self.describe());
            lines
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{docs, run};

    #[test]
    fn counts_documents() {
        let d = docs(&["kind: A", "kind: B"]);
        assert!(run("hasDocuments", "count: 2", &d, 0).0);
        let (passed, info) = run("hasDocuments", "count: 1", &d, 0);
        assert!(!passed);
        assert_eq!(info.last().unwrap(), "\t2");
        assert!(run("hasDocuments", "count: 0", &[], 0).0);
    }

    #[test]
    fn finds_document_by_identity() {
        let d = docs(&[
            "apiVersion: v1\nkind: Service\nmetadata: {name: web}",
            "apiVersion: apps/v1\nkind: Deployment\nmetadata: {name: web, namespace: prod}",
        ]);
        assert!(run("containsDocument", "kind: Deployment\napiVersion: apps/v1", &d, 0).0);
        assert!(run("containsDocument", "kind: Deployment\napiVersion: apps/v1\nname: web\nnamespace: prod", &d, 0).0);
        assert!(!run("containsDocument", "kind: Service\napiVersion: v1\nname: api", &d, 0).0);
    }
}
