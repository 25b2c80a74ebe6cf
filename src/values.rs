//! Values compiler: merges values files and dotted-path `set` assignments
//! into the single values tree handed to the renderer.
//!
//! Layers apply in order, later layers winning per leaf: values files first
//! (suite files, then job files), then `set` mappings (suite, then job).
//! Mappings merge recursively; any other value replaces what was there.

use std::path::{Path, PathBuf};

use serde_yaml::{Mapping, Value};

use crate::errors::{ChartCheckError, Result};
use crate::parser::fields::scalar_to_string;
use crate::path::{DocPath, Segment};

/// Largest list index a `set` path may write; the list is padded with nulls
/// up to it.
pub const MAX_SET_INDEX: usize = 65_536;

/// Builds the values tree from `files` and then `set_layers`.
pub fn compile(files: &[PathBuf], set_layers: &[&Mapping]) -> Result<Value> {
    let mut values = Value::Mapping(Mapping::new());
    for file in files {
        merge(&mut values, load_values_file(file)?);
    }
    for layer in set_layers {
        apply_set(&mut values, layer)?;
    }
    Ok(values)
}

pub fn load_values_file(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path).map_err(|e| ChartCheckError::io(path, e))?;
    let value: Value = serde_yaml::from_str(&content).map_err(|source| ChartCheckError::Yaml {
        origin: path.display().to_string(),
        source,
    })?;
    match value {
        Value::Null => Ok(Value::Mapping(Mapping::new())),
        Value::Mapping(_) => Ok(value),
        _ => Err(ChartCheckError::ValuesSet {
            path: path.display().to_string(),
            reason: "values file must contain a mapping".to_string(),
        }),
    }
}

/// Deep-merges `over` into `base`.
pub fn merge(base: &mut Value, over: Value) {
    match (base, over) {
        (Value::Mapping(base), Value::Mapping(over)) => {
            for (key, value) in over {
                match base.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, over) => *base = over,
    }
}

/// Applies one `set` mapping; each key is a dotted path.
pub fn apply_set(values: &mut Value, set: &Mapping) -> Result<()> {
    for (key, value) in set {
        let raw = scalar_to_string(key).ok_or_else(|| ChartCheckError::ValuesSet {
            path: format!("{:?}", key),
            reason: "set keys must be strings".to_string(),
        })?;
        let path = DocPath::parse(&raw)?;
        if path.is_root() {
            return Err(ChartCheckError::ValuesSet {
                path: raw,
                reason: "empty path".to_string(),
            });
        }
        set_path(values, path.segments(), value.clone()).map_err(|reason| {
            ChartCheckError::ValuesSet {
                path: raw.clone(),
                reason,
            }
        })?;
    }
    Ok(())
}

fn set_path(
    target: &mut Value,
    segments: &[Segment],
    value: Value,
) -> std::result::Result<(), String> {
    let Some((head, rest)) = segments.split_first() else {
        merge(target, value);
        return Ok(());
    };
    match head {
        Segment::Key(key) => {
            if !target.is_mapping() {
                *target = Value::Mapping(Mapping::new());
            }
            let Value::Mapping(map) = target else {
                return Err(format!("cannot descend into `{}`", key));
            };
            let slot = map
                .entry(Value::String(key.clone()))
                .or_insert(Value::Null);
            set_path(slot, rest, value)
        }
        Segment::Index(index) => {
            if !target.is_sequence() {
                *target = Value::Sequence(Vec::new());
            }
            let Value::Sequence(items) = target else {
                return Err(format!("cannot index [{}]", index));
            };
            if *index > MAX_SET_INDEX {
                return Err(format!("index [{}] exceeds the limit of {}", index, MAX_SET_INDEX));
            }
            if items.len() <= *index {
                items.resize(index + 1, Value::Null);
            }
            set_path(&mut items[*index], rest, value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(src: &str) -> Mapping {
        serde_yaml::from_str(src).unwrap()
    }

    #[test]
    fn set_paths_build_nested_values() {
        let suite = mapping("image.tag: v1\nservice.ports[1]: 443\n");
        let job = mapping("image.tag: v2\nimage.pullPolicy: Always\n");
        let values = compile(&[], &[&suite, &job]).unwrap();
        assert_eq!(values["image"]["tag"], "v2");
        assert_eq!(values["image"]["pullPolicy"], "Always");
        assert_eq!(values["service"]["ports"][1], 443);
        assert!(values["service"]["ports"][0].is_null());
    }

    #[test]
    fn set_merges_mappings_at_leaf() {
        let layer = mapping("resources: {limits: {cpu: 1}}\n");
        let more = mapping("resources: {requests: {cpu: 2}}\n");
        let values = compile(&[], &[&layer, &more]).unwrap();
        assert_eq!(values["resources"]["limits"]["cpu"], 1);
        assert_eq!(values["resources"]["requests"]["cpu"], 2);
    }

    #[test]
    fn files_then_sets() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("a.yaml");
        let second = dir.path().join("b.yaml");
        std::fs::write(&first, "image:\n  repository: nginx\n  tag: '1.0'\n").unwrap();
        std::fs::write(&second, "image:\n  tag: '2.0'\n").unwrap();
        let set = mapping("image.tag: '3.0'\n");

        let values = compile(&[first.clone(), second.clone()], &[]).unwrap();
        assert_eq!(values["image"]["tag"], "2.0");
        assert_eq!(values["image"]["repository"], "nginx");

        let values = compile(&[first, second], &[&set]).unwrap();
        assert_eq!(values["image"]["tag"], "3.0");
    }

    #[test]
    fn missing_values_file_is_an_error() {
        let err = compile(&[PathBuf::from("/nonexistent/values.yaml")], &[]).unwrap_err();
        assert!(matches!(err, ChartCheckError::Io { .. }));
    }

    #[test]
    fn oversized_index_is_rejected() {
        for key in ["ports[18446744073709551615]", "ports[65537]"] {
            let set = mapping(&format!("{}: 1\n", key));
            let err = compile(&[], &[&set]).unwrap_err();
            assert!(matches!(err, ChartCheckError::ValuesSet { .. }), "{}", key);
            assert!(err.to_string().contains("exceeds the limit"));
        }
        let set = mapping("ports[65536]: 1\n");
        let values = compile(&[], &[&set]).unwrap();
        assert_eq!(values["ports"][65536], 1);
    }

    #[test]
    fn escaped_dots_stay_in_keys() {
        let set = mapping("podAnnotations.prometheus\\.io/scrape: 'true'\n");
        let values = compile(&[], &[&set]).unwrap();
        assert_eq!(values["podAnnotations"]["prometheus.io/scrape"], "true");
    }
}
