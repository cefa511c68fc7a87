pub mod config_error;
pub mod config_event;
pub mod config_item;
pub mod config_manager;
pub mod config_scope;
pub mod config_stats;
pub mod config_value;
pub mod entity;
pub mod format;
pub mod game_config;
mod hot_reload;
pub mod seal;

pub use config_error::ConfigError;
pub use config_event::{ConfigChangeEvent, ConfigListener, ListenerId};
pub use config_item::{ConfigItem, Validator};
pub use config_manager::ConfigManager;
pub use config_scope::ConfigScope;
pub use config_stats::ConfigStats;
pub use config_value::{ConfigMap, ConfigType, ConfigValue, ValueTag};
pub use entity::{EntityKind, apply_config_template, character_id, config_template, level_id};
pub use format::ConfigFormat;
pub use game_config::{GameConfig, SystemConfig};
