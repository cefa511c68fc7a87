use std::fmt;
use std::sync::Arc;

use crate::config::config_value::ConfigValue;

/// Extra rule a value must satisfy.
pub type Validator = Arc<dyn Fn(&ConfigValue) -> bool + Send + Sync>;

/// Schema entry for one key of a named config.
///
/// # Example
///
/// ```rust,ignore
/// let item = ConfigItem::new("graphics.quality", "high")
///     .description("Render quality preset")
///     .valid_values(["low", "medium", "high", "ultra"]);
/// ```
#[derive(Clone)]
pub struct ConfigItem {
    pub key: String,
    pub default_value: ConfigValue,
    pub description: String,
    pub required: bool,
    /// Masked by `dump_config`.
    pub encrypted: bool,
    /// Allowed string forms; empty means unrestricted.
    pub valid_values: Vec<String>,
    validator: Option<Validator>,
}

impl ConfigItem {
    pub fn new(key: impl Into<String>, default_value: impl Into<ConfigValue>) -> Self {
        Self {
            key: key.into(),
            default_value: default_value.into(),
            description: String::new(),
            required: false,
            encrypted: false,
            valid_values: Vec::new(),
            validator: None,
        }
    }

    #[must_use]
    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = text.into();
        self
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub fn encrypted(mut self) -> Self {
        self.encrypted = true;
        self
    }

    #[must_use]
    pub fn valid_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.valid_values = values.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn validator<F>(mut self, f: F) -> Self
    where
        F: Fn(&ConfigValue) -> bool + Send + Sync + 'static,
    {
        self.validator = Some(Arc::new(f));
        self
    }

    /// Checks `value` against the enumeration, the validator and the
    /// default's type. Returns the first rule broken.
    pub fn check(&self, value: &ConfigValue) -> Result<(), String> {
        if !value.converts_to(self.default_value.tag()) {
            return Err(format!(
                "{}: expected {}, got {}",
                self.key,
                self.default_value.tag(),
                value.tag()
            ));
        }
        if !self.valid_values.is_empty() && !self.valid_values.contains(&value.to_text()) {
            return Err(format!(
                "{}: `{}` not in [{}]",
                self.key,
                value,
                self.valid_values.join(", ")
            ));
        }
        if self.validator.as_ref().is_some_and(|rule| !rule(value)) {
            return Err(format!("{}: `{}` rejected by validator", self.key, value));
        }
        Ok(())
    }
}

impl fmt::Debug for ConfigItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigItem")
            .field("key", &self.key)
            .field("default_value", &self.default_value)
            .field("description", &self.description)
            .field("required", &self.required)
            .field("encrypted", &self.encrypted)
            .field("valid_values", &self.valid_values)
            .field("validator", &self.validator.is_some())
            .finish()
    }
}
