use std::collections::BTreeMap;
use std::fmt;

/// Flat key to value map of one config document, ordered by key.
pub type ConfigMap = BTreeMap<String, ConfigValue>;

/// A config value.
///
/// Typed reads go through [`ConfigType`], which applies the conversion table
/// between tags. Every conversion either succeeds or yields `None`, in which
/// case the caller's default is used.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    List(Vec<String>),
}

/// Tag of a [`ConfigValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueTag {
    Str,
    Int,
    Float,
    Bool,
    List,
}

impl fmt::Display for ValueTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValueTag::Str => "string",
            ValueTag::Int => "int",
            ValueTag::Float => "float",
            ValueTag::Bool => "bool",
            ValueTag::List => "list",
        })
    }
}

impl ConfigValue {
    #[must_use]
    pub const fn tag(&self) -> ValueTag {
        match self {
            ConfigValue::Str(_) => ValueTag::Str,
            ConfigValue::Int(_) => ValueTag::Int,
            ConfigValue::Float(_) => ValueTag::Float,
            ConfigValue::Bool(_) => ValueTag::Bool,
            ConfigValue::List(_) => ValueTag::List,
        }
    }

    /// String form: decimal ints, shortest round-trip floats (`1.0`, `0.1`),
    /// `true`/`false`, comma-joined lists.
    #[must_use]
    pub fn to_text(&self) -> String {
        match self {
            ConfigValue::Str(s) => s.clone(),
            ConfigValue::Int(i) => i.to_string(),
            ConfigValue::Float(f) => format!("{f:?}"),
            ConfigValue::Bool(b) => b.to_string(),
            ConfigValue::List(items) => items.join(","),
        }
    }

    #[must_use]
    pub fn to_int(&self) -> Option<i64> {
        match self {
            ConfigValue::Str(s) => s.trim().parse().ok(),
            ConfigValue::Int(i) => Some(*i),
            ConfigValue::Float(f) => float_to_int(*f),
            ConfigValue::Bool(b) => Some(i64::from(*b)),
            ConfigValue::List(_) => None,
        }
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn to_float(&self) -> Option<f64> {
        match self {
            ConfigValue::Str(s) => s.trim().parse().ok(),
            ConfigValue::Int(i) => Some(*i as f64),
            ConfigValue::Float(f) => Some(*f),
            ConfigValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            ConfigValue::List(_) => None,
        }
    }

    #[must_use]
    pub fn to_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Str(s) => parse_bool(s),
            ConfigValue::Int(i) => Some(*i != 0),
            ConfigValue::Float(f) => Some(*f != 0.0),
            ConfigValue::Bool(b) => Some(*b),
            ConfigValue::List(_) => None,
        }
    }

    /// Lists are returned as is, strings are split on `,` (the empty string
    /// is the empty list), scalars become a single element.
    #[must_use]
    pub fn to_list(&self) -> Vec<String> {
        match self {
            ConfigValue::List(items) => items.clone(),
            ConfigValue::Str(s) if s.is_empty() => Vec::new(),
            ConfigValue::Str(s) => s.split(',').map(str::to_string).collect(),
            other => vec![other.to_text()],
        }
    }

    /// Whether this value converts to `tag` without falling back to a default.
    #[must_use]
    pub fn converts_to(&self, tag: ValueTag) -> bool {
        match tag {
            ValueTag::Str | ValueTag::List => true,
            ValueTag::Int => self.to_int().is_some(),
            ValueTag::Float => self.to_float().is_some(),
            ValueTag::Bool => self.to_bool().is_some(),
        }
    }

    /// Reads untyped text the way the line-oriented formats do: `true` and
    /// `false`, then integers, then floats, else a string.
    #[must_use]
    pub fn infer(text: &str) -> Self {
        match text {
            "true" => return ConfigValue::Bool(true),
            "false" => return ConfigValue::Bool(false),
            _ => {}
        }
        if let Ok(i) = text.parse::<i64>() {
            return ConfigValue::Int(i);
        }
        let numeric = text.bytes().any(|b| b.is_ascii_digit());
        match text.parse::<f64>() {
            Ok(f) if numeric => ConfigValue::Float(f),
            _ => ConfigValue::Str(text.to_string()),
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn float_to_int(f: f64) -> Option<i64> {
    let t = f.trunc();
    if t.is_finite() && t >= i64::MIN as f64 && t < i64::MAX as f64 {
        Some(t as i64)
    } else {
        None
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    let s = s.trim();
    if ["true", "1", "yes"].iter().any(|t| s.eq_ignore_ascii_case(t)) {
        Some(true)
    } else if ["false", "0", "no"].iter().any(|t| s.eq_ignore_ascii_case(t)) {
        Some(false)
    } else {
        None
    }
}

/// Rust types readable from and writable to a [`ConfigValue`].
pub trait ConfigType: Sized {
    fn from_value(value: &ConfigValue) -> Option<Self>;
    fn into_value(self) -> ConfigValue;
}

impl ConfigType for ConfigValue {
    fn from_value(value: &ConfigValue) -> Option<Self> {
        Some(value.clone())
    }
    fn into_value(self) -> ConfigValue {
        self
    }
}

impl ConfigType for String {
    fn from_value(value: &ConfigValue) -> Option<Self> {
        Some(value.to_text())
    }
    fn into_value(self) -> ConfigValue {
        ConfigValue::Str(self)
    }
}

impl ConfigType for i64 {
    fn from_value(value: &ConfigValue) -> Option<Self> {
        value.to_int()
    }
    fn into_value(self) -> ConfigValue {
        ConfigValue::Int(self)
    }
}

impl ConfigType for i32 {
    fn from_value(value: &ConfigValue) -> Option<Self> {
        value.to_int().and_then(|i| i32::try_from(i).ok())
    }
    fn into_value(self) -> ConfigValue {
        ConfigValue::Int(i64::from(self))
    }
}

impl ConfigType for u32 {
    fn from_value(value: &ConfigValue) -> Option<Self> {
        value.to_int().and_then(|i| u32::try_from(i).ok())
    }
    fn into_value(self) -> ConfigValue {
        ConfigValue::Int(i64::from(self))
    }
}

impl ConfigType for f64 {
    fn from_value(value: &ConfigValue) -> Option<Self> {
        value.to_float()
    }
    fn into_value(self) -> ConfigValue {
        ConfigValue::Float(self)
    }
}

impl ConfigType for bool {
    fn from_value(value: &ConfigValue) -> Option<Self> {
        value.to_bool()
    }
    fn into_value(self) -> ConfigValue {
        ConfigValue::Bool(self)
    }
}

impl ConfigType for Vec<String> {
    fn from_value(value: &ConfigValue) -> Option<Self> {
        Some(value.to_list())
    }
    fn into_value(self) -> ConfigValue {
        ConfigValue::List(self)
    }
}

impl From<&str> for ConfigValue {
    fn from(s: &str) -> Self {
        ConfigValue::Str(s.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(s: String) -> Self {
        ConfigValue::Str(s)
    }
}

impl From<i64> for ConfigValue {
    fn from(i: i64) -> Self {
        ConfigValue::Int(i)
    }
}

impl From<i32> for ConfigValue {
    fn from(i: i32) -> Self {
        ConfigValue::Int(i64::from(i))
    }
}

impl From<u32> for ConfigValue {
    fn from(i: u32) -> Self {
        ConfigValue::Int(i64::from(i))
    }
}

impl From<f64> for ConfigValue {
    fn from(f: f64) -> Self {
        ConfigValue::Float(f)
    }
}

impl From<bool> for ConfigValue {
    fn from(b: bool) -> Self {
        ConfigValue::Bool(b)
    }
}

impl From<Vec<String>> for ConfigValue {
    fn from(items: Vec<String>) -> Self {
        ConfigValue::List(items)
    }
}

impl From<Vec<&str>> for ConfigValue {
    fn from(items: Vec<&str>) -> Self {
        ConfigValue::List(items.into_iter().map(str::to_string).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> ConfigValue {
        ConfigValue::Str(v.to_string())
    }

    #[test]
    fn string_conversions() {
        assert_eq!(s("42").to_int(), Some(42));
        assert_eq!(s("4x").to_int(), None);
        assert_eq!(s("2.5").to_float(), Some(2.5));
        assert_eq!(s("YES").to_bool(), Some(true));
        assert_eq!(s("0").to_bool(), Some(false));
        assert_eq!(s("maybe").to_bool(), None);
        assert_eq!(s("a,b,,c").to_list(), vec!["a", "b", "", "c"]);
        assert!(s("").to_list().is_empty());
    }

    #[test]
    fn int_conversions() {
        let v = ConfigValue::Int(-7);
        assert_eq!(v.to_text(), "-7");
        assert_eq!(v.to_float(), Some(-7.0));
        assert_eq!(v.to_bool(), Some(true));
        assert_eq!(ConfigValue::Int(0).to_bool(), Some(false));
        assert_eq!(v.to_list(), vec!["-7"]);
    }

    #[test]
    fn float_conversions() {
        assert_eq!(ConfigValue::Float(1.0).to_text(), "1.0");
        assert_eq!(ConfigValue::Float(0.1).to_text(), "0.1");
        assert_eq!(ConfigValue::Float(-3.9).to_int(), Some(-3));
        assert_eq!(ConfigValue::Float(1e300).to_int(), None);
        assert_eq!(ConfigValue::Float(f64::NAN).to_int(), None);
        assert_eq!(ConfigValue::Float(0.0).to_bool(), Some(false));
    }

    #[test]
    fn bool_and_list_conversions() {
        let t = ConfigValue::Bool(true);
        assert_eq!(t.to_text(), "true");
        assert_eq!(t.to_int(), Some(1));
        assert_eq!(ConfigValue::Bool(false).to_float(), Some(0.0));

        let l = ConfigValue::from(vec!["x", "y"]);
        assert_eq!(l.to_text(), "x,y");
        assert_eq!(l.to_int(), None);
        assert_eq!(l.to_float(), None);
        assert_eq!(l.to_bool(), None);
    }

    #[test]
    fn typed_reads() {
        assert_eq!(i32::from_value(&ConfigValue::Int(i64::MAX)), None);
        assert_eq!(u32::from_value(&s("1080")), Some(1080));
        assert_eq!(String::from_value(&ConfigValue::Float(2.0)).as_deref(), Some("2.0"));
    }

    #[test]
    fn inference_order() {
        assert_eq!(ConfigValue::infer("true"), ConfigValue::Bool(true));
        assert_eq!(ConfigValue::infer("12"), ConfigValue::Int(12));
        assert_eq!(ConfigValue::infer("1.0"), ConfigValue::Float(1.0));
        assert_eq!(ConfigValue::infer("inf"), s("inf"));
        assert_eq!(ConfigValue::infer("zh_CN"), s("zh_CN"));
    }

    #[test]
    fn float_text_round_trips() {
        for f in [0.1, 1.0, -2.5e-9, 123_456.789, 1e21] {
            assert_eq!(ConfigValue::infer(&ConfigValue::Float(f).to_text()), ConfigValue::Float(f));
        }
    }
}
