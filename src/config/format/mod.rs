//! File formats for config documents.
//!
//! Every format maps a file onto a flat [`ConfigMap`]. Tree-shaped formats
//! (JSON, YAML, TOML) flatten nested tables into dotted keys on load and write
//! flat keys back.

pub mod binary;
pub mod json;
pub mod kv;
pub mod toml;
pub mod yaml;

use std::path::Path;

use crate::config::{config_error::ConfigError, config_value::ConfigMap};

/// Format of a config file, detected from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigFormat {
    Json,
    Xml,
    Yaml,
    Ini,
    Toml,
    Binary,
    /// Native line-oriented `key=value` (`.cfg` and anything unrecognised).
    Unknown,
}

/// Extensions tried, in order, when a config name has none.
pub const PROBE_EXTENSIONS: [&str; 8] = ["cfg", "json", "yaml", "yml", "toml", "ini", "bin", "dat"];

impl ConfigFormat {
    #[must_use]
    pub fn detect(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("json") => ConfigFormat::Json,
            Some("xml") => ConfigFormat::Xml,
            Some("yaml" | "yml") => ConfigFormat::Yaml,
            Some("ini") => ConfigFormat::Ini,
            Some("toml") => ConfigFormat::Toml,
            Some("bin" | "dat") => ConfigFormat::Binary,
            _ => ConfigFormat::Unknown,
        }
    }

    /// Canonical extension for files written in this format.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            ConfigFormat::Json => "json",
            ConfigFormat::Xml => "xml",
            ConfigFormat::Yaml => "yaml",
            ConfigFormat::Ini => "ini",
            ConfigFormat::Toml => "toml",
            ConfigFormat::Binary => "bin",
            ConfigFormat::Unknown => "cfg",
        }
    }

    /// Whether `name` ends in an extension this module recognises.
    #[must_use]
    pub fn has_known_extension(name: &str) -> bool {
        Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| {
                let e = e.to_ascii_lowercase();
                e == "xml" || PROBE_EXTENSIONS.contains(&e.as_str())
            })
    }
}

#[derive(Debug)]
pub(crate) enum FormatError {
    Parse(String),
    Unrepresentable { key: String, reason: String },
    Unsupported,
}

impl FormatError {
    pub(crate) fn unrepresentable(key: &str, reason: impl Into<String>) -> Self {
        FormatError::Unrepresentable {
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn into_config_error(self, path: &Path, format: ConfigFormat) -> ConfigError {
        match self {
            FormatError::Parse(message) => ConfigError::Parse {
                path: path.to_path_buf(),
                message,
            },
            FormatError::Unrepresentable { key, reason } => ConfigError::Unrepresentable {
                key,
                format,
                reason,
            },
            FormatError::Unsupported => ConfigError::UnsupportedFormat(format),
        }
    }
}

pub(crate) fn parse(format: ConfigFormat, bytes: &[u8]) -> Result<ConfigMap, FormatError> {
    match format {
        ConfigFormat::Binary => binary::decode(bytes),
        ConfigFormat::Xml => Err(FormatError::Unsupported),
        _ => {
            let text = std::str::from_utf8(bytes)
                .map_err(|e| FormatError::Parse(format!("not UTF-8: {e}")))?;
            match format {
                ConfigFormat::Json => json::parse(text),
                ConfigFormat::Yaml => yaml::parse(text),
                ConfigFormat::Toml => self::toml::parse(text),
                ConfigFormat::Ini => kv::parse_ini(text),
                _ => kv::parse_cfg(text),
            }
        }
    }
}

pub(crate) fn render(format: ConfigFormat, map: &ConfigMap) -> Result<Vec<u8>, FormatError> {
    match format {
        ConfigFormat::Json => json::render(map).map(String::into_bytes),
        ConfigFormat::Yaml => yaml::render(map).map(String::into_bytes),
        ConfigFormat::Toml => self::toml::render(map).map(String::into_bytes),
        ConfigFormat::Ini => kv::render_ini(map).map(String::into_bytes),
        ConfigFormat::Binary => binary::encode(map),
        ConfigFormat::Xml => Err(FormatError::Unsupported),
        ConfigFormat::Unknown => kv::render_cfg(map).map(String::into_bytes),
    }
}

/// Joins a parent path and a child key with a dot.
pub(crate) fn join_key(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use crate::config::config_value::ConfigValue;

    #[test]
    fn detection_by_extension() {
        assert_eq!(ConfigFormat::detect(Path::new("a/game.JSON")), ConfigFormat::Json);
        assert_eq!(ConfigFormat::detect(Path::new("x.yml")), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::detect(Path::new("x.dat")), ConfigFormat::Binary);
        assert_eq!(ConfigFormat::detect(Path::new("x.xml")), ConfigFormat::Xml);
        assert_eq!(ConfigFormat::detect(Path::new("game.cfg")), ConfigFormat::Unknown);
        assert_eq!(ConfigFormat::detect(Path::new("game")), ConfigFormat::Unknown);
        assert!(ConfigFormat::has_known_extension("game.toml"));
        assert!(!ConfigFormat::has_known_extension("game"));
    }

    #[test]
    fn every_supported_format_round_trips() {
        let mut map = ConfigMap::new();
        map.insert("version".into(), "1.0.0".into());
        map.insert("resolution.width".into(), ConfigValue::Int(1920));
        map.insert("graphics.shadows".into(), ConfigValue::Bool(true));
        map.insert("difficulty".into(), ConfigValue::Float(1.5));
        for (key, text) in [("build", "1.10"), ("agent", "007"), ("flag", "true"), ("big", "1e3")] {
            map.insert(key.into(), ConfigValue::Str(text.into()));
        }
        let mut with_list = map.clone();
        with_list.insert("skills".into(), vec!["fire", "ice"].into());

        for format in [ConfigFormat::Json, ConfigFormat::Yaml, ConfigFormat::Toml, ConfigFormat::Binary] {
            let bytes = render(format, &with_list).unwrap();
            assert_eq!(parse(format, &bytes).unwrap(), with_list, "{format:?}");
        }
        for format in [ConfigFormat::Unknown, ConfigFormat::Ini] {
            let bytes = render(format, &map).unwrap();
            assert_eq!(parse(format, &bytes).unwrap(), map, "{format:?}");
        }
    }

    #[test]
    fn xml_is_reported_unsupported() {
        assert!(matches!(parse(ConfigFormat::Xml, b"<a/>"), Err(FormatError::Unsupported)));
        assert!(matches!(
            render(ConfigFormat::Xml, &ConfigMap::new()),
            Err(FormatError::Unsupported)
        ));
    }
}
