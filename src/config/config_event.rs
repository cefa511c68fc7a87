use std::sync::Arc;

use chrono::{DateTime, Local};

use crate::config::{config_scope::ConfigScope, config_value::ConfigValue};

/// A change of a key's effective value.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigChangeEvent {
    pub key: String,
    /// `None` if the key was absent before.
    pub old_value: Option<ConfigValue>,
    /// `None` if the key is now absent everywhere.
    pub new_value: Option<ConfigValue>,
    /// Scope written; `None` for the dynamic overlay.
    pub scope: Option<ConfigScope>,
    pub timestamp: DateTime<Local>,
}

impl ConfigChangeEvent {
    pub(crate) fn new(
        key: &str,
        old_value: Option<ConfigValue>,
        new_value: Option<ConfigValue>,
        scope: Option<ConfigScope>,
    ) -> Self {
        Self {
            key: key.to_string(),
            old_value,
            new_value,
            scope,
            timestamp: Local::now(),
        }
    }
}

pub type ConfigListener = Arc<dyn Fn(&ConfigChangeEvent) + Send + Sync>;

/// Handle returned when registering a listener, used to remove it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);
