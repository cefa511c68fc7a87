use crate::config::config_value::{ConfigType, ConfigValue};
use crate::log::log_level::LogLevel;

/// Client-facing game settings. Stored as flat keys (`resolution.width`,
/// `volume.master`, ...); this struct is only a view over them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameConfig {
    pub version: String,
    pub language: String,
    pub fullscreen: bool,
    pub resolution_width: u32,
    pub resolution_height: u32,
    /// Volumes are percentages, clamped to `0..=100` when read or written.
    pub master_volume: u32,
    pub music_volume: u32,
    pub sfx_volume: u32,
    pub voice_volume: u32,
    pub graphics_quality: String,
    pub shadows: bool,
    pub antialiasing: bool,
    pub vsync: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            version: "1.0.0".to_string(),
            language: "zh_CN".to_string(),
            fullscreen: false,
            resolution_width: 1920,
            resolution_height: 1080,
            master_volume: 100,
            music_volume: 80,
            sfx_volume: 90,
            voice_volume: 85,
            graphics_quality: "high".to_string(),
            shadows: true,
            antialiasing: true,
            vsync: true,
        }
    }
}

fn read<T: ConfigType>(lookup: &impl Fn(&str) -> Option<ConfigValue>, key: &str, default: T) -> T {
    lookup(key)
        .and_then(|v| T::from_value(&v))
        .unwrap_or(default)
}

impl GameConfig {
    pub const KEYS: [&'static str; 13] = [
        "version",
        "language",
        "fullscreen",
        "resolution.width",
        "resolution.height",
        "volume.master",
        "volume.music",
        "volume.sfx",
        "volume.voice",
        "graphics.quality",
        "graphics.shadows",
        "graphics.antialiasing",
        "graphics.vsync",
    ];

    /// Builds the view from a key lookup, falling back to defaults per field.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<ConfigValue>) -> Self {
        let d = Self::default();
        Self {
            version: read(&lookup, "version", d.version),
            language: read(&lookup, "language", d.language),
            fullscreen: read(&lookup, "fullscreen", d.fullscreen),
            resolution_width: read(&lookup, "resolution.width", d.resolution_width),
            resolution_height: read(&lookup, "resolution.height", d.resolution_height),
            master_volume: read(&lookup, "volume.master", d.master_volume).min(100),
            music_volume: read(&lookup, "volume.music", d.music_volume).min(100),
            sfx_volume: read(&lookup, "volume.sfx", d.sfx_volume).min(100),
            voice_volume: read(&lookup, "volume.voice", d.voice_volume).min(100),
            graphics_quality: read(&lookup, "graphics.quality", d.graphics_quality),
            shadows: read(&lookup, "graphics.shadows", d.shadows),
            antialiasing: read(&lookup, "graphics.antialiasing", d.antialiasing),
            vsync: read(&lookup, "graphics.vsync", d.vsync),
        }
    }

    /// Flat `(key, value)` pairs in [`KEYS`](Self::KEYS) order.
    #[must_use]
    pub fn to_entries(&self) -> Vec<(&'static str, ConfigValue)> {
        vec![
            ("version", self.version.clone().into()),
            ("language", self.language.clone().into()),
            ("fullscreen", self.fullscreen.into()),
            ("resolution.width", self.resolution_width.into()),
            ("resolution.height", self.resolution_height.into()),
            ("volume.master", self.master_volume.min(100).into()),
            ("volume.music", self.music_volume.min(100).into()),
            ("volume.sfx", self.sfx_volume.min(100).into()),
            ("volume.voice", self.voice_volume.min(100).into()),
            ("graphics.quality", self.graphics_quality.clone().into()),
            ("graphics.shadows", self.shadows.into()),
            ("graphics.antialiasing", self.antialiasing.into()),
            ("graphics.vsync", self.vsync.into()),
        ]
    }
}

/// Process-level settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemConfig {
    pub auto_save: bool,
    /// Seconds between automatic saves.
    pub auto_save_interval: u32,
    pub max_save_slots: u32,
    pub log_level: String,
    pub debug_mode: bool,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            auto_save: true,
            auto_save_interval: 300,
            max_save_slots: 10,
            log_level: "info".to_string(),
            debug_mode: false,
        }
    }
}

impl SystemConfig {
    pub const KEYS: [&'static str; 5] = [
        "autoSave",
        "autoSaveInterval",
        "maxSaveSlots",
        "logLevel",
        "debugMode",
    ];

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<ConfigValue>) -> Self {
        let d = Self::default();
        Self {
            auto_save: read(&lookup, "autoSave", d.auto_save),
            auto_save_interval: read(&lookup, "autoSaveInterval", d.auto_save_interval),
            max_save_slots: read(&lookup, "maxSaveSlots", d.max_save_slots),
            log_level: read(&lookup, "logLevel", d.log_level),
            debug_mode: read(&lookup, "debugMode", d.debug_mode),
        }
    }

    #[must_use]
    pub fn to_entries(&self) -> Vec<(&'static str, ConfigValue)> {
        vec![
            ("autoSave", self.auto_save.into()),
            ("autoSaveInterval", self.auto_save_interval.into()),
            ("maxSaveSlots", self.max_save_slots.into()),
            ("logLevel", self.log_level.clone().into()),
            ("debugMode", self.debug_mode.into()),
        ]
    }

    /// `logLevel` as a [`LogLevel`]; unknown names map to `Info`.
    #[must_use]
    pub fn level(&self) -> LogLevel {
        LogLevel::parse(&self.log_level)
    }
}
