//! Building blocks for failure diagnostics.

use std::fmt::Display;

use difference::{Changeset, Difference};
use serde_yaml::Value;

use super::{Outcome, ValidateContext};

/// Leading lines of every failure.
pub fn header(ctx: &ValidateContext<'_>) -> Vec<String> {
    header_for(ctx.template, ctx.document_index)
}

pub fn header_for(template: &str, document_index: usize) -> Vec<String> {
    vec![
        format!("Template:\t{}", template),
        format!("DocumentIndex:\t{}", document_index),
    ]
}

/// An error raised before any validator ran, e.g. for a template that was
/// never rendered.
pub fn standalone_error(template: &str, document_index: usize, message: impl Display) -> Outcome {
    let mut lines = header_for(template, document_index);
    lines.push("Error:".to_string());
    lines.push(format!("\t{}", message));
    (false, lines)
}

pub fn failure(ctx: &ValidateContext<'_>, body: Vec<String>) -> Outcome {
    let mut lines = header(ctx);
    lines.extend(body);
    (false, lines)
}

/// A failure that is not about the expectation itself (bad index, missing
/// path, undecodable value).
pub fn error(ctx: &ValidateContext<'_>, message: impl Display) -> Outcome {
    failure(ctx, vec!["Error:".to_string(), format!("\t{}", message)])
}

/// Applies negation to a raw match and builds the body only on failure.
pub fn verdict(
    ctx: &ValidateContext<'_>,
    matched: bool,
    body: impl FnOnce() -> Vec<String>,
) -> Outcome {
    if matched != ctx.negative {
        (true, Vec::new())
    } else {
        failure(ctx, body())
    }
}

/// `Expected to equal:` / `Expected NOT to equal:`
pub fn expected(negative: bool, what: &str) -> String {
    if negative {
        format!("Expected NOT {}:", what)
    } else {
        format!("Expected {}:", what)
    }
}

pub fn path_line(path: impl Display) -> String {
    format!("Path:\t{}", path)
}

pub fn to_yaml(value: &Value) -> String {
    match serde_yaml::to_string(value) {
        Ok(text) => text.trim_end_matches('\n').to_string(),
        Err(_) => format!("{:?}", value),
    }
}

pub fn indent(text: &str) -> Vec<String> {
    text.lines().map(|line| format!("\t{}", line)).collect()
}

pub fn indent_yaml(value: &Value) -> Vec<String> {
    indent(&to_yaml(value))
}

/// Line diff between `expected` and `actual`.
pub fn diff(expected: &str, actual: &str) -> Vec<String> {
    let changeset = Changeset::new(expected, actual, "\n");
    let mut lines = vec![
        "Diff:".to_string(),
        "\t--- Expected".to_string(),
        "\t+++ Actual".to_string(),
    ];
    for change in &changeset.diffs {
        let (marker, text) = match change {
            Difference::Same(text) => (' ', text),
            Difference::Add(text) => ('+', text),
            Difference::Rem(text) => ('-', text),
        };
        lines.extend(text.split('\n').map(|line| format!("\t{}{}", marker, line)));
    }
    lines
}
