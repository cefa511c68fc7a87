use std::fmt;

/// Category of a log stream. Each file sink writes one category into its own
/// directory under the base log directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LogType {
    System,
    Program,
    Code,
    Network,
    Database,
    Security,
    Performance,
}

impl LogType {
    pub const ALL: [LogType; 7] = [
        LogType::System,
        LogType::Program,
        LogType::Code,
        LogType::Network,
        LogType::Database,
        LogType::Security,
        LogType::Performance,
    ];

    /// Capitalised name used inside log file names, e.g. `Network`.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            LogType::System => "System",
            LogType::Program => "Program",
            LogType::Code => "Code",
            LogType::Network => "Network",
            LogType::Database => "Database",
            LogType::Security => "Security",
            LogType::Performance => "Performance",
        }
    }

    /// Lowercase directory name, e.g. `network`.
    #[must_use]
    pub const fn dir_name(self) -> &'static str {
        match self {
            LogType::System => "system",
            LogType::Program => "program",
            LogType::Code => "code",
            LogType::Network => "network",
            LogType::Database => "database",
            LogType::Security => "security",
            LogType::Performance => "performance",
        }
    }

    /// Prefix shared by every file this type produces: `Fantasy_{Name}`.
    #[must_use]
    pub fn file_prefix(self) -> String {
        format!("Fantasy_{}", self.name())
    }
}

impl fmt::Display for LogType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
