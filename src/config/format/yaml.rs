use serde_yaml::{Mapping, Value};

use crate::config::{
    config_value::{ConfigMap, ConfigValue},
    format::{FormatError, join_key},
};

pub(crate) fn parse(text: &str) -> Result<ConfigMap, FormatError> {
    let root: Value = serde_yaml::from_str(text).map_err(|e| FormatError::Parse(e.to_string()))?;
    let mut map = ConfigMap::new();
    match root {
        // An empty document is an empty config.
        Value::Null => {}
        Value::Mapping(m) => flatten("", &m, &mut map)?,
        _ => return Err(FormatError::Parse("top level must be a mapping".into())),
    }
    Ok(map)
}

fn key_text(key: &Value) -> Result<String, FormatError> {
    match key {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(FormatError::Parse(format!("unsupported mapping key {other:?}"))),
    }
}

fn flatten(prefix: &str, mapping: &Mapping, out: &mut ConfigMap) -> Result<(), FormatError> {
    for (key, value) in mapping {
        let full = join_key(prefix, &key_text(key)?);
        let value = match value {
            Value::Tagged(tagged) => &tagged.value,
            other => other,
        };
        match value {
            Value::Mapping(child) => flatten(&full, child, out)?,
            Value::Null => {}
            Value::Bool(b) => {
                out.insert(full, ConfigValue::Bool(*b));
            }
            Value::Number(n) => {
                let v = match (n.as_i64(), n.as_f64()) {
                    (Some(i), _) => ConfigValue::Int(i),
                    (None, Some(f)) => ConfigValue::Float(f),
                    (None, None) => ConfigValue::Str(n.to_string()),
                };
                out.insert(full, v);
            }
            Value::String(s) => {
                out.insert(full, ConfigValue::Str(s.clone()));
            }
            Value::Sequence(items) => {
                let items = items
                    .iter()
                    .map(|item| match item {
                        Value::String(s) => s.clone(),
                        Value::Number(n) => n.to_string(),
                        Value::Bool(b) => b.to_string(),
                        other => serde_yaml::to_string(other)
                            .map(|s| s.trim_end().to_string())
                            .unwrap_or_default(),
                    })
                    .collect();
                out.insert(full, ConfigValue::List(items));
            }
            Value::Tagged(_) => {
                return Err(FormatError::Parse(format!("{full}: nested tags are not supported")));
            }
        }
    }
    Ok(())
}

pub(crate) fn render(map: &ConfigMap) -> Result<String, FormatError> {
    let mut root = Mapping::new();
    for (key, value) in map {
        let yaml = match value {
            ConfigValue::Str(s) => Value::String(s.clone()),
            ConfigValue::Int(i) => Value::from(*i),
            ConfigValue::Float(f) => Value::from(*f),
            ConfigValue::Bool(b) => Value::Bool(*b),
            ConfigValue::List(items) => {
                Value::Sequence(items.iter().cloned().map(Value::String).collect())
            }
        };
        root.insert(Value::String(key.clone()), yaml);
    }
    serde_yaml::to_string(&Value::Mapping(root)).map_err(|e| FormatError::unrepresentable("", e.to_string()))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    #[test]
    fn nested_mappings_flatten() {
        let text = "version: 1.0.0\nvolume:\n  master: 100\n  music: 80\nlanguage: zh_CN\nskills:\n  - slash\n  - parry\n";
        let map = parse(text).unwrap();
        assert_eq!(map["version"], ConfigValue::Str("1.0.0".into()));
        assert_eq!(map["volume.master"], ConfigValue::Int(100));
        assert_eq!(map["skills"], ConfigValue::from(vec!["slash", "parry"]));
    }

    #[test]
    fn empty_document_is_empty_map() {
        assert!(parse("").unwrap().is_empty());
        assert!(matches!(parse("- a\n- b\n"), Err(FormatError::Parse(_))));
    }

    #[test]
    fn strings_that_look_typed_survive() {
        let mut map = ConfigMap::new();
        map.insert("flag".into(), ConfigValue::Str("true".into()));
        map.insert("num".into(), ConfigValue::Str("42".into()));
        assert_eq!(parse(&render(&map).unwrap()).unwrap(), map);
    }
}
