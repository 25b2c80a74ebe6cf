//! A canonical, type-safe representation of a path into a rendered document
//! or a values tree.
//!
//! Accepted syntax is the JSONPath-like dialect used in test suites:
//! `spec.template.spec.containers[0].image`, `metadata.labels["app.kubernetes.io/name"]`,
//! `data.postgres-password`. A backslash escapes a literal dot inside a key
//! (`annotations.prometheus\.io/scrape`). The empty path addresses the whole
//! document.

use std::fmt;

use serde::Deserialize;
use serde_yaml::Value;

use crate::errors::{ChartCheckError, Result};

/// One step of a [`DocPath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Key(String),
    Index(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(try_from = "String")]
pub struct DocPath(pub Vec<Segment>);

impl TryFrom<String> for DocPath {
    type Error = ChartCheckError;

    fn try_from(raw: String) -> Result<Self> {
        Self::parse(&raw)
    }
}

impl DocPath {
    pub fn parse(raw: &str) -> Result<Self> {
        let invalid = |reason: &str| ChartCheckError::InvalidPath {
            path: raw.to_string(),
            reason: reason.to_string(),
        };

        let mut segments = Vec::new();
        let mut key = String::new();
        let mut chars = raw.trim().chars();
        // A key may be empty only right after a bracket segment.
        let mut after_bracket = false;

        while let Some(c) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some(escaped) => key.push(escaped),
                    None => return Err(invalid("dangling escape")),
                },
                '.' => {
                    if key.is_empty() && !after_bracket {
                        return Err(invalid("empty key"));
                    }
                    if !key.is_empty() {
                        segments.push(Segment::Key(std::mem::take(&mut key)));
                    }
                    after_bracket = false;
                }
                '[' => {
                    if !key.is_empty() {
                        segments.push(Segment::Key(std::mem::take(&mut key)));
                    }
                    let mut inner = String::new();
                    let mut closed = false;
                    for c in chars.by_ref() {
                        if c == ']' {
                            closed = true;
                            break;
                        }
                        inner.push(c);
                    }
                    if !closed {
                        return Err(invalid("unclosed `[`"));
                    }
                    segments.push(Self::bracket_segment(inner.trim()).ok_or_else(|| {
                        invalid("bracket must hold an index or a quoted key")
                    })?);
                    after_bracket = true;
                }
                _ => {
                    after_bracket = false;
                    key.push(c);
                }
            }
        }

        if !key.is_empty() {
            segments.push(Segment::Key(key));
        } else if raw.trim().ends_with('.') {
            return Err(invalid("trailing `.`"));
        }

        Ok(Self(segments))
    }

    fn bracket_segment(inner: &str) -> Option<Segment> {
        let quoted = inner
            .strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
            .or_else(|| inner.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')));
        if let Some(key) = quoted {
            return Some(Segment::Key(key.to_string()));
        }
        inner.parse::<usize>().ok().map(Segment::Index)
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    /// Follows the path through `doc`. Missing keys, out-of-range indices and
    /// stepping into scalars all yield `None`.
    pub fn lookup<'a>(&self, doc: &'a Value) -> Option<&'a Value> {
        let mut current = doc;
        for segment in &self.0 {
            while let Value::Tagged(tagged) = current {
                current = &tagged.value;
            }
            current = match (segment, current) {
                (Segment::Key(key), Value::Mapping(map)) => map.get(key.as_str())?,
                (Segment::Index(i), Value::Sequence(seq)) => seq.get(*i)?,
                _ => return None,
            };
        }
        Some(current)
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                Segment::Index(index) => write!(f, "[{}]", index)?,
                Segment::Key(key) if key.contains('.') || key.contains('[') => {
                    write!(f, "[\"{}\"]", key)?
                }
                Segment::Key(key) => {
                    if i > 0 {
                        f.write_str(".")?;
                    }
                    f.write_str(key)?;
                }
            }
        }
        Ok(())
    }
}
