use std::fmt;

/// Layer of the config overlay. Reads resolve `User`, then `Application`,
/// then `System` (after the in-memory dynamic overlay).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConfigScope {
    System,
    Application,
    User,
}

impl ConfigScope {
    pub const ALL: [ConfigScope; 3] = [
        ConfigScope::System,
        ConfigScope::Application,
        ConfigScope::User,
    ];

    /// Highest precedence first.
    pub const RESOLUTION_ORDER: [ConfigScope; 3] = [
        ConfigScope::User,
        ConfigScope::Application,
        ConfigScope::System,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ConfigScope::System => "system",
            ConfigScope::Application => "application",
            ConfigScope::User => "user",
        }
    }

    /// Document that owns keys written to this scope without a name.
    #[must_use]
    pub const fn default_document(self) -> &'static str {
        match self {
            ConfigScope::System => "system",
            ConfigScope::Application => "game",
            ConfigScope::User => "user",
        }
    }

    pub(crate) const fn index(self) -> usize {
        match self {
            ConfigScope::System => 0,
            ConfigScope::Application => 1,
            ConfigScope::User => 2,
        }
    }
}

impl fmt::Display for ConfigScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
