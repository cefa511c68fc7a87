use ::toml::{Table, Value};

use crate::config::{
    config_value::{ConfigMap, ConfigValue},
    format::{FormatError, join_key},
};

pub(crate) fn parse(text: &str) -> Result<ConfigMap, FormatError> {
    let table: Table = ::toml::from_str(text).map_err(|e| FormatError::Parse(e.to_string()))?;
    let mut map = ConfigMap::new();
    flatten("", &table, &mut map);
    Ok(map)
}

fn flatten(prefix: &str, table: &Table, out: &mut ConfigMap) {
    for (key, value) in table {
        let full = join_key(prefix, key);
        let converted = match value {
            Value::Table(child) => {
                flatten(&full, child, out);
                continue;
            }
            Value::String(s) => ConfigValue::Str(s.clone()),
            Value::Integer(i) => ConfigValue::Int(*i),
            Value::Float(f) => ConfigValue::Float(*f),
            Value::Boolean(b) => ConfigValue::Bool(*b),
            Value::Datetime(dt) => ConfigValue::Str(dt.to_string()),
            Value::Array(items) => ConfigValue::List(
                items
                    .iter()
                    .map(|item| match item {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect(),
            ),
        };
        out.insert(full, converted);
    }
}

pub(crate) fn render(map: &ConfigMap) -> Result<String, FormatError> {
    let mut table = Table::new();
    for (key, value) in map {
        let v = match value {
            ConfigValue::Str(s) => Value::String(s.clone()),
            ConfigValue::Int(i) => Value::Integer(*i),
            ConfigValue::Float(f) => Value::Float(*f),
            ConfigValue::Bool(b) => Value::Boolean(*b),
            ConfigValue::List(items) => {
                Value::Array(items.iter().cloned().map(Value::String).collect())
            }
        };
        table.insert(key.clone(), v);
    }
    ::toml::to_string(&table).map_err(|e| FormatError::unrepresentable("", e.to_string()))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    #[test]
    fn tables_flatten_and_dotted_keys_are_quoted() {
        let text = "version = \"1.0.0\"\n[graphics]\nquality = \"high\"\nshadows = true\n[resolution]\nwidth = 1920\n";
        let map = parse(text).unwrap();
        assert_eq!(map["graphics.quality"], ConfigValue::Str("high".into()));
        assert_eq!(map["graphics.shadows"], ConfigValue::Bool(true));
        assert_eq!(map["resolution.width"], ConfigValue::Int(1920));

        let rendered = render(&map).unwrap();
        assert_eq!(parse(&rendered).unwrap(), map);
    }

    #[test]
    fn syntax_error_is_parse_error() {
        assert!(matches!(parse("a = = 1"), Err(FormatError::Parse(_))));
    }
}
