use std::fmt;

use crate::config::config_value::{ConfigMap, ConfigValue};

/// Kind of per-entity config, each kept in its own subdirectory of the
/// config root.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Character,
    Level,
    Item,
    Skill,
    Quest,
}

impl EntityKind {
    pub const ALL: [EntityKind; 5] = [
        EntityKind::Character,
        EntityKind::Level,
        EntityKind::Item,
        EntityKind::Skill,
        EntityKind::Quest,
    ];

    #[must_use]
    pub const fn dir_name(self) -> &'static str {
        match self {
            EntityKind::Character => "characters",
            EntityKind::Level => "levels",
            EntityKind::Item => "items",
            EntityKind::Skill => "skills",
            EntityKind::Quest => "quests",
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            EntityKind::Character => "character",
            EntityKind::Level => "level",
            EntityKind::Item => "item",
            EntityKind::Skill => "skill",
            EntityKind::Quest => "quest",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// File id of a character config: `{character_type}_{level}`.
#[must_use]
pub fn character_id(character_type: &str, level: u32) -> String {
    format!("{character_type}_{level}")
}

/// File id of a level config: `level_{id}`.
#[must_use]
pub fn level_id(id: u32) -> String {
    format!("level_{id}")
}

fn list() -> ConfigValue {
    ConfigValue::List(Vec::new())
}

/// Field set and starting values for a new entity of `kind`. Quests have no
/// template.
#[must_use]
pub fn config_template(kind: EntityKind) -> ConfigMap {
    let fields: Vec<(&str, ConfigValue)> = match kind {
        EntityKind::Character => vec![
            ("name", "".into()),
            ("level", 1.into()),
            ("health", 100.into()),
            ("mana", 50.into()),
            ("strength", 10.into()),
            ("agility", 10.into()),
            ("intelligence", 10.into()),
            ("experience", 0.into()),
            ("skills", list()),
            ("equipment", list()),
        ],
        EntityKind::Level => vec![
            ("id", 0.into()),
            ("name", "".into()),
            ("difficulty", 1.0.into()),
            ("enemies", list()),
            ("rewards", list()),
            ("time_limit", 0.into()),
            ("background", "".into()),
            ("music", "".into()),
        ],
        EntityKind::Item => vec![
            ("id", "".into()),
            ("name", "".into()),
            ("type", "".into()),
            ("rarity", "common".into()),
            ("level", 1.into()),
            ("value", 0.into()),
            ("weight", 0.0.into()),
            ("description", "".into()),
            ("effects", list()),
        ],
        EntityKind::Skill => vec![
            ("id", "".into()),
            ("name", "".into()),
            ("type", "".into()),
            ("level", 1.into()),
            ("mana_cost", 0.into()),
            ("cooldown", 0.0.into()),
            ("range", 0.0.into()),
            ("damage", 0.into()),
            ("description", "".into()),
            ("effects", list()),
        ],
        EntityKind::Quest => Vec::new(),
    };
    fields
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

/// Fills in every template field missing from `config`. Returns `false` if
/// `kind` has no template.
pub fn apply_config_template(config: &mut ConfigMap, kind: EntityKind) -> bool {
    let template = config_template(kind);
    if template.is_empty() {
        return false;
    }
    for (key, value) in template {
        config.entry(key).or_insert(value);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_fills_only_missing_fields() {
        let mut cfg = ConfigMap::new();
        cfg.insert("name".into(), "Aria".into());
        cfg.insert("health".into(), 250.into());
        assert!(apply_config_template(&mut cfg, EntityKind::Character));
        assert_eq!(cfg["name"], ConfigValue::Str("Aria".into()));
        assert_eq!(cfg["health"], ConfigValue::Int(250));
        assert_eq!(cfg["mana"], ConfigValue::Int(50));
        assert_eq!(cfg["skills"], ConfigValue::List(Vec::new()));
    }

    #[test]
    fn quest_has_no_template() {
        let mut cfg = ConfigMap::new();
        assert!(!apply_config_template(&mut cfg, EntityKind::Quest));
        assert!(cfg.is_empty());
    }

    #[test]
    fn ids() {
        assert_eq!(character_id("warrior", 3), "warrior_3");
        assert_eq!(level_id(12), "level_12");
        assert_eq!(EntityKind::Skill.dir_name(), "skills");
    }
}
