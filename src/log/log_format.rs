use std::fmt::Write as _;

use crate::log::log_record::LogRecord;

pub const DEFAULT_FORMAT: &str = "%timestamp% [%level%] [%filename%:%line%] [%thread%] %message%";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placeholder {
    Timestamp,
    Level,
    Filename,
    Line,
    Thread,
    Message,
}

impl Placeholder {
    const ALL: [(&'static str, Placeholder); 6] = [
        ("%timestamp%", Placeholder::Timestamp),
        ("%level%", Placeholder::Level),
        ("%filename%", Placeholder::Filename),
        ("%line%", Placeholder::Line),
        ("%thread%", Placeholder::Thread),
        ("%message%", Placeholder::Message),
    ];
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Literal(String),
    Field(Placeholder),
}

/// A compiled format template.
///
/// The template is split once into literal runs and placeholders so that
/// formatting a record is a single pass. Unknown `%...%` sequences stay
/// literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFormat {
    template: String,
    parts: Vec<Part>,
}

impl LogFormat {
    #[must_use]
    pub fn compile(template: &str) -> Self {
        let mut parts = Vec::new();
        let mut literal = String::new();
        let mut rest = template;

        while !rest.is_empty() {
            let matched = Placeholder::ALL
                .iter()
                .find(|(token, _)| rest.starts_with(token));
            match matched {
                Some((token, field)) => {
                    if !literal.is_empty() {
                        parts.push(Part::Literal(std::mem::take(&mut literal)));
                    }
                    parts.push(Part::Field(*field));
                    rest = &rest[token.len()..];
                }
                None => {
                    let mut chars = rest.chars();
                    if let Some(c) = chars.next() {
                        literal.push(c);
                    }
                    rest = chars.as_str();
                }
            }
        }
        if !literal.is_empty() {
            parts.push(Part::Literal(literal));
        }

        Self {
            template: template.to_string(),
            parts,
        }
    }

    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Renders `record` through the template. The result carries no trailing
    /// newline; line-oriented sinks add their own.
    #[must_use]
    pub fn format(&self, record: &LogRecord) -> String {
        let mut out = String::with_capacity(self.template.len() + record.message.len() + 48);
        for part in &self.parts {
            match part {
                Part::Literal(s) => out.push_str(s),
                Part::Field(Placeholder::Timestamp) => {
                    let _ = write!(out, "{}", record.timestamp.format(TIMESTAMP_FORMAT));
                }
                Part::Field(Placeholder::Level) => out.push_str(record.level.as_str()),
                Part::Field(Placeholder::Filename) => out.push_str(&record.filename),
                Part::Field(Placeholder::Line) => {
                    let _ = write!(out, "{}", record.line);
                }
                Part::Field(Placeholder::Thread) => {
                    let _ = write!(out, "{}", record.thread_no);
                }
                Part::Field(Placeholder::Message) => out.push_str(&record.message),
            }
        }
        out
    }
}

impl Default for LogFormat {
    fn default() -> Self {
        Self::compile(DEFAULT_FORMAT)
    }
}
