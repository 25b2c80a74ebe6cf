//! `matchSnapshot`: compares a document (or part of it) with the content
//! recorded in the snapshot cache.

use serde::Deserialize;

use super::report::{self, diff};
use super::{lookup_path, Outcome, Validate, ValidateContext};
use crate::path::DocPath;
use crate::snapshot::SnapshotOutcome;

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct MatchSnapshotValidator {
    #[serde(default)]
    pub path: DocPath,
}

impl Validate for MatchSnapshotValidator {
    fn validate(&self, ctx: &mut ValidateContext<'_>) -> Outcome {
        let found = match lookup_path(ctx, &self.path) {
            Ok(found) => found,
            Err(failure) => return failure,
        };
        let content = match found {
            Some(value) => match serde_yaml::to_string(value) {
                Ok(content) => content,
                Err(e) => return report::error(ctx, e),
            },
            None => return report::error(ctx, format!("unknown path {}", self.path)),
        };

        let outcome = ctx.snapshots.compare(&content);
        let mut lines = vec![
            report::path_line(&self.path),
            report::expected(ctx.negative, &format!("to match snapshot {}", outcome.key())),
        ];
        match outcome {
            SnapshotOutcome::Mismatched { expected, .. } => {
                if ctx.negative {
                    return (true, Vec::new());
                }
                lines.extend(diff(&expected, &content));
            }
            _ if ctx.negative => lines.extend(report::indent(&content)),
            _ => return (true, Vec::new()),
        }
        report::failure(ctx, lines)
    }
}
