use serde_json::{Map, Number, Value};

use crate::config::{
    config_value::{ConfigMap, ConfigValue},
    format::{FormatError, join_key},
};

pub(crate) fn parse(text: &str) -> Result<ConfigMap, FormatError> {
    let root: Value = serde_json::from_str(text).map_err(|e| FormatError::Parse(e.to_string()))?;
    let Value::Object(obj) = root else {
        return Err(FormatError::Parse("top level must be an object".into()));
    };
    let mut map = ConfigMap::new();
    flatten("", &obj, &mut map);
    Ok(map)
}

fn flatten(prefix: &str, obj: &Map<String, Value>, out: &mut ConfigMap) {
    for (key, value) in obj {
        let full = join_key(prefix, key);
        match value {
            Value::Object(child) => flatten(&full, child, out),
            Value::Null => {}
            Value::Bool(b) => {
                out.insert(full, ConfigValue::Bool(*b));
            }
            Value::Number(n) => {
                out.insert(full, number(n));
            }
            Value::String(s) => {
                out.insert(full, ConfigValue::Str(s.clone()));
            }
            Value::Array(items) => {
                out.insert(full, ConfigValue::List(items.iter().map(element_text).collect()));
            }
        }
    }
}

fn number(n: &Number) -> ConfigValue {
    match (n.as_i64(), n.as_f64()) {
        (Some(i), _) => ConfigValue::Int(i),
        (None, Some(f)) => ConfigValue::Float(f),
        (None, None) => ConfigValue::Str(n.to_string()),
    }
}

fn element_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub(crate) fn render(map: &ConfigMap) -> Result<String, FormatError> {
    let mut obj = Map::new();
    for (key, value) in map {
        let json = match value {
            ConfigValue::Str(s) => Value::String(s.clone()),
            ConfigValue::Int(i) => Value::from(*i),
            ConfigValue::Float(f) => Number::from_f64(*f)
                .map(Value::Number)
                .ok_or_else(|| FormatError::unrepresentable(key, "JSON has no NaN or infinity"))?,
            ConfigValue::Bool(b) => Value::Bool(*b),
            ConfigValue::List(items) => {
                Value::Array(items.iter().cloned().map(Value::String).collect())
            }
        };
        obj.insert(key.clone(), json);
    }
    serde_json::to_string_pretty(&Value::Object(obj))
        .map_err(|e| FormatError::unrepresentable("", e.to_string()))
}
