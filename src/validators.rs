//! # Validator Framework
//!
//! Every assertion type maps to one variant of the closed [`Validator`] enum.
//! The mapping from YAML key to variant lives in [`ASSERT_TYPES`], a
//! compile-time table where a negative name (`notEqual`, `isNotNull`, ...) is
//! the same validator registered with `antonym: true`.
//!
//! Validators are pure with respect to the documents: they read the
//! [`ValidateContext`] and report `(passed, diagnostic lines)`. The one piece
//! of mutable state they may touch is the snapshot comparer, which
//! `matchSnapshot` advances.
//!
//! ## Diagnostics
//!
//! Failure lines start with the template and document index, followed by
//! validator-specific sections (`Expected to equal:`, `Actual:`, `Diff:`),
//! each body line indented with a tab.

use serde::de::DeserializeOwned;
use serde_yaml::Value;

use crate::errors::{ChartCheckError, Result};
use crate::render::{Document, RenderError};
use crate::snapshot::SnapshotComparer;

pub mod collection;
pub mod documents;
pub mod equality;
pub mod failure;
pub mod metadata;
pub mod presence;
pub mod report;
pub mod snapshot;

pub use collection::{ContainsValidator, IsSubsetValidator, LengthEqualValidator};
pub use documents::{ContainsDocumentValidator, HasDocumentsValidator};
pub use equality::{EqualValidator, MatchRegexValidator};
pub use failure::FailedTemplateValidator;
pub use metadata::{IsApiVersionValidator, IsKindValidator};
pub use presence::{IsEmptyValidator, IsNullValidator};
pub use snapshot::MatchSnapshotValidator;

/// `(passed, fail_info)` of one validation.
pub type Outcome = (bool, Vec<String>);

// ============================================================================
// CONTEXT
// ============================================================================

/// What a validator sees for one template.
pub struct ValidateContext<'a> {
    pub template: &'a str,
    /// Documents of `template`, in render order.
    pub documents: &'a [Document],
    pub document_index: usize,
    /// Effective negation (`not` combined with the antonym flag).
    pub negative: bool,
    pub render_error: Option<&'a RenderError>,
    pub snapshots: &'a mut dyn SnapshotComparer,
}

impl<'a> ValidateContext<'a> {
    /// The document under test.
    pub fn document(&self) -> std::result::Result<&'a Document, String> {
        self.documents
            .get(self.document_index)
            .ok_or_else(|| format!("documentIndex {} out of range", self.document_index))
    }
}

/// A check that can be run against a [`ValidateContext`].
pub trait Validate {
    fn validate(&self, ctx: &mut ValidateContext<'_>) -> Outcome;
}

/// What a validator needs to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// One document of each selected template.
    Document,
    /// All documents of each selected template.
    Template,
    /// All documents of all selected templates at once.
    Selection,
    /// Whether rendering failed; runs once per assertion.
    RenderOutcome,
}

// ============================================================================
// VALIDATOR ENUM
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Validator {
    Equal(EqualValidator),
    MatchRegex(MatchRegexValidator),
    Contains(ContainsValidator),
    IsSubset(IsSubsetValidator),
    LengthEqual(LengthEqualValidator),
    IsNull(IsNullValidator),
    IsEmpty(IsEmptyValidator),
    IsKind(IsKindValidator),
    IsApiVersion(IsApiVersionValidator),
    HasDocuments(HasDocumentsValidator),
    ContainsDocument(ContainsDocumentValidator),
    MatchSnapshot(MatchSnapshotValidator),
    FailedTemplate(FailedTemplateValidator),
}

impl Validator {
    pub fn scope(&self) -> Scope {
        match self {
            Validator::HasDocuments(_) => Scope::Template,
            Validator::ContainsDocument(_) => Scope::Selection,
            Validator::FailedTemplate(_) => Scope::RenderOutcome,
            _ => Scope::Document,
        }
    }
}

impl Validate for Validator {
    fn validate(&self, ctx: &mut ValidateContext<'_>) -> Outcome {
        match self {
            Validator::Equal(v) => v.validate(ctx),
            Validator::MatchRegex(v) => v.validate(ctx),
            Validator::Contains(v) => v.validate(ctx),
            Validator::IsSubset(v) => v.validate(ctx),
            Validator::LengthEqual(v) => v.validate(ctx),
            Validator::IsNull(v) => v.validate(ctx),
            Validator::IsEmpty(v) => v.validate(ctx),
            Validator::IsKind(v) => v.validate(ctx),
            Validator::IsApiVersion(v) => v.validate(ctx),
            Validator::HasDocuments(v) => v.validate(ctx),
            Validator::ContainsDocument(v) => v.validate(ctx),
            Validator::MatchSnapshot(v) => v.validate(ctx),
            Validator::FailedTemplate(v) => v.validate(ctx),
        }
    }
}

// ============================================================================
// REGISTRY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Equal,
    MatchRegex,
    Contains,
    IsSubset,
    LengthEqual,
    IsNull,
    IsEmpty,
    IsKind,
    IsApiVersion,
    HasDocuments,
    ContainsDocument,
    MatchSnapshot,
    FailedTemplate,
}

/// One registered assertion type name.
#[derive(Debug, PartialEq, Eq)]
pub struct AssertTypeDef {
    pub name: &'static str,
    kind: Kind,
    /// The name inverts the validator it is bound to.
    pub antonym: bool,
}

const fn def(name: &'static str, kind: Kind, antonym: bool) -> AssertTypeDef {
    AssertTypeDef {
        name,
        kind,
        antonym,
    }
}

pub const ASSERT_TYPES: &[AssertTypeDef] = &[
    def("equal", Kind::Equal, false),
    def("notEqual", Kind::Equal, true),
    def("matchRegex", Kind::MatchRegex, false),
    def("notMatchRegex", Kind::MatchRegex, true),
    def("contains", Kind::Contains, false),
    def("notContains", Kind::Contains, true),
    def("isSubset", Kind::IsSubset, false),
    def("isNotSubset", Kind::IsSubset, true),
    def("lengthEqual", Kind::LengthEqual, false),
    def("notLengthEqual", Kind::LengthEqual, true),
    def("isNull", Kind::IsNull, false),
    def("isNotNull", Kind::IsNull, true),
    def("isEmpty", Kind::IsEmpty, false),
    def("isNotEmpty", Kind::IsEmpty, true),
    def("isKind", Kind::IsKind, false),
    def("isAPIVersion", Kind::IsApiVersion, false),
    def("hasDocuments", Kind::HasDocuments, false),
    def("containsDocument", Kind::ContainsDocument, false),
    def("matchSnapshot", Kind::MatchSnapshot, false),
    def("failedTemplate", Kind::FailedTemplate, false),
    def("notFailedTemplate", Kind::FailedTemplate, true),
];

pub fn lookup(name: &str) -> Option<&'static AssertTypeDef> {
    ASSERT_TYPES.iter().find(|def| def.name == name)
}

impl AssertTypeDef {
    /// Decodes the parameter map of this assertion type into a validator.
    /// A null parameter block is an empty map.
    pub fn build(&self, params: &Value) -> Result<Validator> {
        let validator = match self.kind {
            Kind::Equal => Validator::Equal(self.params(params)?),
            Kind::MatchRegex => Validator::MatchRegex(self.params(params)?),
            Kind::Contains => Validator::Contains(self.params(params)?),
            Kind::IsSubset => Validator::IsSubset(self.params(params)?),
            Kind::LengthEqual => Validator::LengthEqual(self.params(params)?),
            Kind::IsNull => Validator::IsNull(self.params(params)?),
            Kind::IsEmpty => Validator::IsEmpty(self.params(params)?),
            Kind::IsKind => Validator::IsKind(self.params(params)?),
            Kind::IsApiVersion => Validator::IsApiVersion(self.params(params)?),
            Kind::HasDocuments => Validator::HasDocuments(self.params(params)?),
            Kind::ContainsDocument => Validator::ContainsDocument(self.params(params)?),
            Kind::MatchSnapshot => Validator::MatchSnapshot(self.params(params)?),
            Kind::FailedTemplate => Validator::FailedTemplate(self.params(params)?),
        };
        Ok(validator)
    }

    fn params<T: DeserializeOwned>(&self, params: &Value) -> Result<T> {
        let params = if params.is_null() {
            Value::Mapping(Default::default())
        } else {
            params.clone()
        };
        serde_yaml::from_value(params).map_err(|source| ChartCheckError::AssertionParams {
            assert_type: self.name.to_string(),
            source,
        })
    }
}

// ============================================================================
// SHARED HELPERS
// ============================================================================

/// Resolves `path` in the current document. `Err` carries a ready failure.
pub(crate) fn lookup_path<'a>(
    ctx: &ValidateContext<'a>,
    path: &crate::path::DocPath,
) -> std::result::Result<Option<&'a Value>, Outcome> {
    let document = ctx.document().map_err(|message| report::error(ctx, message))?;
    Ok(path.lookup(document))
}

/// Like [`lookup_path`] but a missing path is a failure too.
pub(crate) fn require_path<'a>(
    ctx: &ValidateContext<'a>,
    path: &crate::path::DocPath,
) -> std::result::Result<&'a Value, Outcome> {
    lookup_path(ctx, path)?.ok_or_else(|| report::error(ctx, format!("unknown path {}", path)))
}

#[cfg(test)]
pub(crate) mod testing {
    //! Helpers for validator unit tests.

    use super::*;
    use crate::snapshot::{SnapshotCache, SnapshotCursor};

    pub fn docs(sources: &[&str]) -> Vec<Document> {
        sources
            .iter()
            .map(|s| serde_yaml::from_str(s).unwrap())
            .collect()
    }

    pub fn build(assert_type: &str, params: &str) -> Validator {
        lookup(assert_type)
            .unwrap()
            .build(&serde_yaml::from_str(params).unwrap())
            .unwrap()
    }

    /// Runs `assert_type` against `documents[index]` with its registered polarity.
    pub fn run(assert_type: &str, params: &str, documents: &[Document], index: usize) -> Outcome {
        let def = lookup(assert_type).unwrap();
        let validator = build(assert_type, params);
        let mut cache = SnapshotCache::in_memory(false);
        let mut cursor = SnapshotCursor::new(&mut cache, "0");
        let mut ctx = ValidateContext {
            template: "templates/test.yaml",
            documents,
            document_index: index,
            negative: def.antonym,
            render_error: None,
            snapshots: &mut cursor,
        };
        validator.validate(&mut ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_names_are_unique() {
        for (i, def) in ASSERT_TYPES.iter().enumerate() {
            assert!(
                ASSERT_TYPES[i + 1..].iter().all(|other| other.name != def.name),
                "{} registered twice",
                def.name
            );
        }
    }

    #[test]
    fn antonyms_share_a_validator() {
        let equal = lookup("equal").unwrap();
        let not_equal = lookup("notEqual").unwrap();
        assert_eq!(equal.kind, not_equal.kind);
        assert!(!equal.antonym && not_equal.antonym);
        assert!(lookup("isNotKind").is_none());
    }

    #[test]
    fn params_errors_name_the_type() {
        let err = lookup("hasDocuments")
            .unwrap()
            .build(&serde_yaml::from_str("count: many").unwrap())
            .unwrap_err();
        assert!(err.to_string().contains("hasDocuments"));
    }

    #[test]
    fn scopes() {
        assert_eq!(testing::build("hasDocuments", "count: 1").scope(), Scope::Template);
        assert_eq!(testing::build("containsDocument", "kind: A\napiVersion: v1").scope(), Scope::Selection);
        assert_eq!(testing::build("failedTemplate", "{}").scope(), Scope::RenderOutcome);
        assert_eq!(testing::build("isNull", "path: a").scope(), Scope::Document);
    }

    #[test]
    fn out_of_range_index_fails() {
        let docs = testing::docs(&["kind: Pod"]);
        let (passed, info) = testing::run("isKind", "of: Pod", &docs, 3);
        assert!(!passed);
        assert_eq!(
            info,
            [
                "Template:\ttemplates/test.yaml",
                "DocumentIndex:\t3",
                "Error:",
                "\tdocumentIndex 3 out of range",
            ]
        );
    }
}
