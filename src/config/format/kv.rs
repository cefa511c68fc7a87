//! Line-oriented `key=value` files: `.cfg` and `.ini`.
//!
//! Blank lines and lines starting with `#` or `;` are ignored. Keys and
//! values are trimmed. In `.ini` files a `[section]` header prefixes the
//! following keys with `section.`. Bare values carry no type; it is inferred
//! on load. A value wrapped in double quotes is always a string, taken as
//! written between the quotes.

use std::fmt::Write as _;

use crate::config::{
    config_value::{ConfigMap, ConfigValue},
    format::{FormatError, join_key},
};

pub(crate) fn parse_cfg(text: &str) -> Result<ConfigMap, FormatError> {
    parse_lines(text, false)
}

pub(crate) fn parse_ini(text: &str) -> Result<ConfigMap, FormatError> {
    parse_lines(text, true)
}

fn parse_lines(text: &str, sections: bool) -> Result<ConfigMap, FormatError> {
    let mut map = ConfigMap::new();
    let mut current_section = String::new();

    for (line_no, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if sections && line.starts_with('[') && line.ends_with(']') {
            current_section = line[1..line.len() - 1].trim().to_string();
            continue;
        }

        let Some(pos) = line.find('=') else {
            return Err(FormatError::Parse(format!(
                "line {}: expected key=value, got `{line}`",
                line_no + 1
            )));
        };
        let key = line[..pos].trim();
        if key.is_empty() {
            return Err(FormatError::Parse(format!("line {}: empty key", line_no + 1)));
        }
        let raw = line[pos + 1..].trim();
        let value = match quoted(raw) {
            Some(inner) => ConfigValue::Str(inner.to_string()),
            None => ConfigValue::infer(raw),
        };
        map.insert(join_key(&current_section, key), value);
    }
    Ok(map)
}

fn quoted(value: &str) -> Option<&str> {
    (value.len() >= 2 && value.starts_with('"') && value.ends_with('"'))
        .then(|| &value[1..value.len() - 1])
}

pub(crate) fn render_cfg(map: &ConfigMap) -> Result<String, FormatError> {
    let mut out = String::new();
    for (key, value) in map {
        check_key(key)?;
        let _ = writeln!(out, "{key}={}", line_value(key, value)?);
    }
    Ok(out)
}

/// Keys without a dot go first; the rest are grouped under `[prefix]`
/// by their first dotted segment.
pub(crate) fn render_ini(map: &ConfigMap) -> Result<String, FormatError> {
    let mut out = String::new();
    let mut current: Option<&str> = None;

    let (top, nested): (Vec<_>, Vec<_>) = map.iter().partition(|(k, _)| !k.contains('.'));
    for (key, value) in top {
        check_key(key)?;
        let _ = writeln!(out, "{key}={}", line_value(key, value)?);
    }
    for (key, value) in nested {
        check_key(key)?;
        let Some((section, rest)) = key.split_once('.') else {
            continue;
        };
        if section.is_empty() || section.contains(']') || rest.is_empty() {
            return Err(FormatError::unrepresentable(key, "not a valid section.key pair"));
        }
        if current != Some(section) {
            if !out.is_empty() {
                out.push('\n');
            }
            let _ = writeln!(out, "[{section}]");
            current = Some(section);
        }
        let _ = writeln!(out, "{rest}={}", line_value(key, value)?);
    }
    Ok(out)
}

fn check_key(key: &str) -> Result<(), FormatError> {
    let bad = key.is_empty()
        || key.trim() != key
        || key.contains(['=', '\n', '\r'])
        || key.starts_with(['#', ';', '[']);
    if bad {
        Err(FormatError::unrepresentable(key, "key cannot be written as key=value"))
    } else {
        Ok(())
    }
}

fn line_value(key: &str, value: &ConfigValue) -> Result<String, FormatError> {
    if let ConfigValue::List(_) = value {
        return Err(FormatError::unrepresentable(
            key,
            "lists need a structured format (json, yaml, toml)",
        ));
    }
    let text = value.to_text();
    if text.contains(['\n', '\r']) {
        return Err(FormatError::unrepresentable(key, "multi-line value"));
    }
    let ConfigValue::Str(s) = value else {
        return Ok(text);
    };
    // Strings that would read back as another type, or lose their edges to
    // trimming or unquoting, go out quoted.
    let needs_quotes =
        ConfigValue::infer(s) != *value || s.trim() != s || quoted(s).is_some();
    Ok(if needs_quotes { format!("\"{s}\"") } else { text })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    #[test]
    fn parses_comments_quotes_and_types() {
        let text = "# game settings\n\
                    version = \"1.0.0\"\n\
                    fullscreen=false\n\
                    \n\
                    ; legacy comment\n\
                    resolution.width=1920\n\
                    volume.master = 0.5\n\
                    language=zh_CN\n";
        let map = parse_cfg(text).unwrap();
        assert_eq!(map["version"], ConfigValue::Str("1.0.0".into()));
        assert_eq!(map["fullscreen"], ConfigValue::Bool(false));
        assert_eq!(map["resolution.width"], ConfigValue::Int(1920));
        assert_eq!(map["volume.master"], ConfigValue::Float(0.5));
        assert_eq!(map["language"], ConfigValue::Str("zh_CN".into()));
    }

    #[test]
    fn ini_sections_fold_into_dotted_keys() {
        let text = "title=Fantasy\n[graphics]\nquality=high\nvsync=true\n[volume]\nmaster=100\n";
        let map = parse_ini(text).unwrap();
        assert_eq!(map["title"], ConfigValue::Str("Fantasy".into()));
        assert_eq!(map["graphics.quality"], ConfigValue::Str("high".into()));
        assert_eq!(map["graphics.vsync"], ConfigValue::Bool(true));
        assert_eq!(map["volume.master"], ConfigValue::Int(100));

        let rendered = render_ini(&map).unwrap();
        assert!(rendered.starts_with("title=Fantasy\n"));
        assert!(rendered.contains("[graphics]\nquality=high\nvsync=true\n"));
        assert_eq!(parse_ini(&rendered).unwrap(), map);
    }

    #[test]
    fn malformed_line_is_an_error() {
        assert!(matches!(parse_cfg("just text"), Err(FormatError::Parse(_))));
        assert!(matches!(parse_cfg("=1"), Err(FormatError::Parse(_))));
    }

    #[test]
    fn refuses_values_it_cannot_reproduce() {
        let mut map = ConfigMap::new();
        map.insert("skills".into(), vec!["a", "b"].into());
        assert!(matches!(render_cfg(&map), Err(FormatError::Unrepresentable { .. })));

        let mut map = ConfigMap::new();
        map.insert("motd".into(), "line one\nline two".into());
        assert!(matches!(render_cfg(&map), Err(FormatError::Unrepresentable { .. })));

    }

    #[test]
    fn scalar_looking_strings_survive_a_round_trip() {
        let mut map = ConfigMap::new();
        for (key, text) in [
            ("version", "1.10"),
            ("agent", "007"),
            ("flag", "true"),
            ("big", "1e3"),
            ("pad", " x "),
            ("quoted", "\"hi\""),
            ("empty", ""),
            ("plain", "zh_CN"),
        ] {
            map.insert(key.into(), ConfigValue::Str(text.into()));
        }
        map.insert("count".into(), ConfigValue::Int(7));
        map.insert("ratio".into(), ConfigValue::Float(1.1));

        let cfg = render_cfg(&map).unwrap();
        assert!(cfg.contains("version=\"1.10\"\n"), "{cfg}");
        assert!(cfg.contains("plain=zh_CN\n"), "{cfg}");
        assert!(cfg.contains("count=7\n"), "{cfg}");
        assert_eq!(parse_cfg(&cfg).unwrap(), map);
        assert_eq!(parse_ini(&render_ini(&map).unwrap()).unwrap(), map);
    }
}
