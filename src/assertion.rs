//! Assertion descriptors: which check to run, on which template and document,
//! and whether the outcome is inverted.

use serde_yaml::Value;

use crate::errors::{ChartCheckError, Result};
use crate::model::normalize_template;
use crate::parser::fields::Fields;
use crate::validators::{self, Scope, Validator};

const META_KEYS: &[&str] = &["template", "file", "documentIndex", "not"];

/// One entry of a job's `asserts` list.
#[derive(Debug, Clone, PartialEq)]
pub struct Assertion {
    /// Explicit template; overrides the job's selection.
    pub template: Option<String>,
    /// Explicit document index; overrides the job's.
    pub document_index: Option<usize>,
    pub not: bool,
    /// The registered type name as written, e.g. `notEqual`.
    pub assert_type: &'static str,
    pub validator: Validator,
    /// Set for names registered as the negation of a base validator.
    pub antonym: bool,
}

impl Assertion {
    /// Decodes one assertion entry. Template selectors are normalised
    /// against `chart_name`. Keys that are neither a meta key nor an
    /// assertion type are ignored.
    pub fn from_yaml(value: &Value, chart_name: &str) -> Result<Self> {
        Self::decode(value, chart_name).map(|(assertion, _)| assertion)
    }

    /// Like [`Assertion::from_yaml`], also returning one
    /// [`ChartCheckError::UnknownField`] per ignored key for strict mode.
    pub fn decode(value: &Value, chart_name: &str) -> Result<(Self, Vec<ChartCheckError>)> {
        let mut fields = Fields::new(value, "Assertion")?;
        let template = match fields.string("template")? {
            Some(t) => Some(t),
            None => fields.string("file")?,
        }
        .map(|t| normalize_template(&t, chart_name));
        let document_index = fields.usize("documentIndex")?;
        let not = fields.bool("not")?.unwrap_or(false);

        let Value::Mapping(map) = value else {
            return Err(ChartCheckError::NoAssertionType);
        };

        let mut found: Option<(&'static validators::AssertTypeDef, &Value)> = None;
        let mut first_unknown: Option<&str> = None;
        for (key, params) in map {
            let Some(key) = key.as_str() else { continue };
            if META_KEYS.contains(&key) {
                continue;
            }
            let Some(def) = validators::lookup(key) else {
                first_unknown.get_or_insert(key);
                continue;
            };
            if let Some((first, _)) = found {
                return Err(ChartCheckError::DuplicateAssertionType {
                    first: first.name.to_string(),
                    second: def.name.to_string(),
                });
            }
            fields.raw(key);
            found = Some((def, params));
        }

        let Some((def, params)) = found else {
            return Err(match first_unknown {
                Some(key) => ChartCheckError::InvalidAssertionType {
                    key: key.to_string(),
                },
                None => ChartCheckError::NoAssertionType,
            });
        };
        let assertion = Self {
            template,
            document_index,
            not,
            assert_type: def.name,
            validator: def.build(params)?,
            antonym: def.antonym,
        };
        Ok((assertion, fields.unknown()))
    }

    /// Effective negation: `not` flips the registered polarity.
    pub fn is_negative(&self) -> bool {
        self.not != self.antonym
    }

    pub fn scope(&self) -> Scope {
        self.validator.scope()
    }

    /// True for `failedTemplate` and `notFailedTemplate`.
    pub fn expects_render_outcome(&self) -> bool {
        self.scope() == Scope::RenderOutcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> Result<Assertion> {
        Assertion::from_yaml(&serde_yaml::from_str(src).unwrap(), "basic")
    }

    #[test]
    fn negation_combines_not_and_antonym() {
        let cases = [
            ("equal: {path: a, value: 1}", false),
            ("equal: {path: a, value: 1}\nnot: true", true),
            ("notEqual: {path: a, value: 1}", true),
            ("notEqual: {path: a, value: 1}\nnot: true", false),
        ];
        for (src, negative) in cases {
            assert_eq!(parse(src).unwrap().is_negative(), negative, "{}", src);
        }
    }

    #[test]
    fn meta_keys_are_read() {
        let assertion = parse("template: deployment.yaml\ndocumentIndex: 2\nisKind: {of: Pod}").unwrap();
        assert_eq!(assertion.template.as_deref(), Some("templates/deployment.yaml"));
        assert_eq!(assertion.document_index, Some(2));
        assert_eq!(assertion.assert_type, "isKind");
    }

    #[test]
    fn requires_exactly_one_type() {
        assert!(matches!(parse("not: true"), Err(ChartCheckError::NoAssertionType)));
        assert_eq!(
            parse("bad: {}").unwrap_err().to_string(),
            "assertion type `bad` is invalid"
        );
        assert_eq!(
            parse("equal: {path: a, value: 1}\nnotEqual: {path: a, value: 2}")
                .unwrap_err()
                .to_string(),
            "assertion type `equal` and `notEqual` is declared duplicately"
        );
    }

    #[test]
    fn extra_keys_beside_a_type_are_reported_not_fatal() {
        let src = "description: checks the kind\nisKind: {of: Pod}\nnot: false";
        let assertion = parse(src).unwrap();
        assert_eq!(assertion.assert_type, "isKind");

        let value = serde_yaml::from_str(src).unwrap();
        let (_, extras) = Assertion::decode(&value, "basic").unwrap();
        assert_eq!(extras.len(), 1);
        assert_eq!(
            extras[0].to_string(),
            "field description not found in type Assertion"
        );

        assert_eq!(
            parse("description: no type here\ntemplate: a.yaml").unwrap_err().to_string(),
            "assertion type `description` is invalid"
        );
    }

    #[test]
    fn null_params_are_accepted() {
        let assertion = parse("matchSnapshot:").unwrap();
        assert_eq!(assertion.assert_type, "matchSnapshot");
        assert!(!assertion.is_negative());
    }
}
