//! Presence-tracking projection over a YAML mapping.
//!
//! Suites are decoded in two steps: the raw document becomes a
//! `serde_yaml::Value`, then [`Fields`] pulls typed fields out of it one key at
//! a time. Every key read is remembered so that strict mode can report the
//! keys nobody asked for.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use serde_yaml::{Mapping, Value};

use crate::errors::{ChartCheckError, Result};
use crate::model::Field;

static EMPTY: Lazy<Mapping> = Lazy::new(Mapping::new);

pub(crate) struct Fields<'a> {
    type_name: &'static str,
    map: &'a Mapping,
    consumed: BTreeSet<String>,
}

impl<'a> Fields<'a> {
    /// Opens `value` as a mapping of type `type_name`. A null document is an
    /// empty mapping.
    pub(crate) fn new(value: &'a Value, type_name: &'static str) -> Result<Self> {
        let map = match value {
            Value::Mapping(map) => map,
            Value::Null => &*EMPTY,
            Value::Tagged(tagged) => return Self::new(&tagged.value, type_name),
            _ => {
                return Err(ChartCheckError::FieldType {
                    field: "<document>".to_string(),
                    type_name,
                    expected: "a mapping",
                })
            }
        };
        Ok(Self {
            type_name,
            map,
            consumed: BTreeSet::new(),
        })
    }

    fn type_error(&self, key: &str, expected: &'static str) -> ChartCheckError {
        ChartCheckError::FieldType {
            field: key.to_string(),
            type_name: self.type_name,
            expected,
        }
    }

    /// The raw value under `key`, marking the key as read.
    pub(crate) fn raw(&mut self, key: &str) -> Option<&'a Value> {
        self.consumed.insert(key.to_string());
        self.map.get(key)
    }

    /// Raw value with nulls folded into absence.
    fn present(&mut self, key: &str) -> Option<&'a Value> {
        self.raw(key).filter(|v| !v.is_null())
    }

    fn field_with<T>(
        &mut self,
        key: &str,
        expected: &'static str,
        convert: impl Fn(&Value) -> Option<T>,
    ) -> Result<Field<T>> {
        match self.raw(key) {
            None => Ok(Field::Absent),
            Some(Value::Null) => Ok(Field::Null),
            Some(value) => convert(value)
                .map(Field::Value)
                .ok_or_else(|| self.type_error(key, expected)),
        }
    }

    pub(crate) fn field_string(&mut self, key: &str) -> Result<Field<String>> {
        self.field_with(key, "a string", scalar_to_string)
    }

    pub(crate) fn field_u32(&mut self, key: &str) -> Result<Field<u32>> {
        self.field_with(key, "a non-negative integer", |v| {
            v.as_u64().and_then(|n| u32::try_from(n).ok())
        })
    }

    pub(crate) fn field_bool(&mut self, key: &str) -> Result<Field<bool>> {
        self.field_with(key, "a boolean", Value::as_bool)
    }

    pub(crate) fn field_string_list(&mut self, key: &str) -> Result<Field<Vec<String>>> {
        self.field_with(key, "a list of strings", |v| {
            v.as_sequence()?.iter().map(scalar_to_string).collect()
        })
    }

    pub(crate) fn string(&mut self, key: &str) -> Result<Option<String>> {
        match self.present(key) {
            None => Ok(None),
            Some(value) => scalar_to_string(value)
                .map(Some)
                .ok_or_else(|| self.type_error(key, "a string")),
        }
    }

    /// A list of strings; a single string is accepted as a one-element list.
    pub(crate) fn string_list(&mut self, key: &str) -> Result<Vec<String>> {
        match self.present(key) {
            None => Ok(Vec::new()),
            Some(Value::Sequence(items)) => items
                .iter()
                .map(scalar_to_string)
                .collect::<Option<Vec<_>>>()
                .ok_or_else(|| self.type_error(key, "a list of strings")),
            Some(value) => scalar_to_string(value)
                .map(|s| vec![s])
                .ok_or_else(|| self.type_error(key, "a list of strings")),
        }
    }

    pub(crate) fn bool(&mut self, key: &str) -> Result<Option<bool>> {
        match self.present(key) {
            None => Ok(None),
            Some(value) => value
                .as_bool()
                .map(Some)
                .ok_or_else(|| self.type_error(key, "a boolean")),
        }
    }

    pub(crate) fn usize(&mut self, key: &str) -> Result<Option<usize>> {
        match self.present(key) {
            None => Ok(None),
            Some(value) => value
                .as_u64()
                .and_then(|n| usize::try_from(n).ok())
                .map(Some)
                .ok_or_else(|| self.type_error(key, "a non-negative integer")),
        }
    }

    pub(crate) fn mapping(&mut self, key: &str) -> Result<Option<&'a Mapping>> {
        match self.present(key) {
            None => Ok(None),
            Some(Value::Mapping(map)) => Ok(Some(map)),
            Some(_) => Err(self.type_error(key, "a mapping")),
        }
    }

    pub(crate) fn sequence(&mut self, key: &str) -> Result<&'a [Value]> {
        match self.present(key) {
            None => Ok(&[]),
            Some(Value::Sequence(items)) => Ok(items.as_slice()),
            Some(_) => Err(self.type_error(key, "a list")),
        }
    }

    /// One error per key that was never read.
    pub(crate) fn unknown(&self) -> Vec<ChartCheckError> {
        self.map
            .keys()
            .filter_map(|key| {
                let name = match key {
                    Value::String(s) => s.clone(),
                    other => scalar_to_string(other).unwrap_or_else(|| format!("{:?}", other)),
                };
                (!self.consumed.contains(&name)).then(|| ChartCheckError::UnknownField {
                    field: name,
                    type_name: self.type_name,
                })
            })
            .collect()
    }
}

/// Scalars as strings; numbers and booleans are stringified.
pub(crate) fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Tagged(tagged) => scalar_to_string(&tagged.value),
        _ => None,
    }
}
