//! Spell library.
//!
//! The read-only catalogue of bard spells a character can learn, plus the
//! conversion from a library definition into a spell the character owns.

use crate::world::{Character, Spell};
use std::collections::HashMap;
use std::sync::LazyLock;

/// School assigned to spells the player invents.
pub const CUSTOM_SPELL_SCHOOL: &str = "general";

/// Highest level a custom spell may have.
pub const MAX_CUSTOM_SPELL_LEVEL: u8 = 5;

/// A static library entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpellDefinition {
    pub name: &'static str,
    pub level: u8,
    pub school: &'static str,
    pub casting_time: &'static str,
    pub range: &'static str,
    pub components: &'static str,
    pub duration: &'static str,
    pub description: &'static str,
}

impl From<&SpellDefinition> for Spell {
    fn from(def: &SpellDefinition) -> Self {
        Spell {
            name: def.name.to_string(),
            level: def.level,
            school: Some(def.school.to_string()),
            casting_time: Some(def.casting_time.to_string()),
            range: Some(def.range.to_string()),
            components: Some(def.components.to_string()),
            duration: Some(def.duration.to_string()),
            description: def.description.to_string(),
        }
    }
}

/// A spell the player wrote themselves.
pub fn custom_spell(name: impl Into<String>, level: u8, description: impl Into<String>) -> Spell {
    let description = description.into();
    Spell {
        name: name.into(),
        level,
        school: Some(CUSTOM_SPELL_SCHOOL.to_string()),
        casting_time: None,
        range: None,
        components: None,
        duration: None,
        description: if description.trim().is_empty() {
            "A custom spell.".to_string()
        } else {
            description
        },
    }
}

// ============================================================================
// Library
// ============================================================================

const BARD_LIBRARY: &[SpellDefinition] = &[
    SpellDefinition {
        name: "Dancing Lights",
        level: 0,
        school: "Evocation",
        casting_time: "1 action",
        range: "120 feet",
        components: "V, S, M",
        duration: "Concentration, up to 1 minute",
        description: "You create up to four torch-sized lights that you can move as a bonus action. They must stay within 20 feet of each other.",
    },
    SpellDefinition {
        name: "Message",
        level: 0,
        school: "Transmutation",
        casting_time: "1 action",
        range: "120 feet",
        components: "V, S, M",
        duration: "1 round",
        description: "You point at a creature and whisper a message. Only the target hears it and can whisper a reply.",
    },
    SpellDefinition {
        name: "Minor Illusion",
        level: 0,
        school: "Illusion",
        casting_time: "1 action",
        range: "30 feet",
        components: "S, M",
        duration: "1 minute",
        description: "You create a sound or a still image of an object no larger than a 5-foot cube.",
    },
    SpellDefinition {
        name: "Detect Magic",
        level: 1,
        school: "Divination",
        casting_time: "1 action",
        range: "Self",
        components: "V, S",
        duration: "Concentration, up to 10 minutes",
        description: "You sense the presence of magic within 30 feet and can see a faint aura around any visible creature or object that bears it.",
    },
    SpellDefinition {
        name: "Tasha's Hideous Laughter",
        level: 1,
        school: "Enchantment",
        casting_time: "1 action",
        range: "30 feet",
        components: "V, S, M",
        duration: "Concentration, up to 1 minute",
        description: "A creature you can see finds everything hilarious, falls prone and is incapacitated for the duration.",
    },
    SpellDefinition {
        name: "Sleep",
        level: 1,
        school: "Enchantment",
        casting_time: "1 action",
        range: "90 feet",
        components: "V, S, M",
        duration: "1 minute",
        description: "Roll 5d8; creatures within 20 feet of a point fall asleep in order of lowest current hit points until the total is spent.",
    },
    SpellDefinition {
        name: "Thunderwave",
        level: 1,
        school: "Evocation",
        casting_time: "1 action",
        range: "Self (15-foot cube)",
        components: "V, S",
        duration: "Instantaneous",
        description: "A wave of thunderous force sweeps out from you. Each creature in the cube makes a Constitution save or takes 2d8 thunder damage and is pushed 10 feet.",
    },
    SpellDefinition {
        name: "Shatter",
        level: 2,
        school: "Evocation",
        casting_time: "1 action",
        range: "60 feet",
        components: "V, S, M",
        duration: "Instantaneous",
        description: "A painfully loud noise erupts in a 10-foot-radius sphere. Each creature makes a Constitution save or takes 3d8 thunder damage.",
    },
    SpellDefinition {
        name: "Invisibility",
        level: 2,
        school: "Illusion",
        casting_time: "1 action",
        range: "Touch",
        components: "V, S, M",
        duration: "Concentration, up to 1 hour",
        description: "A creature you touch becomes invisible until the spell ends or the target attacks or casts a spell.",
    },
    SpellDefinition {
        name: "Heat Metal",
        level: 2,
        school: "Transmutation",
        casting_time: "1 action",
        range: "60 feet",
        components: "V, S, M",
        duration: "Concentration, up to 1 minute",
        description: "A manufactured metal object glows red-hot. Anyone touching it takes 2d8 fire damage, repeatable as a bonus action.",
    },
    SpellDefinition {
        name: "See Invisibility",
        level: 2,
        school: "Divination",
        casting_time: "1 action",
        range: "Self",
        components: "V, S, M",
        duration: "1 hour",
        description: "You see invisible creatures and objects as if they were visible.",
    },
    SpellDefinition {
        name: "Fear",
        level: 3,
        school: "Illusion",
        casting_time: "1 action",
        range: "Self (30-foot cone)",
        components: "V, S, M",
        duration: "Concentration, up to 1 minute",
        description: "Each creature in the cone makes a Wisdom save or drops what it is holding and becomes frightened.",
    },
    SpellDefinition {
        name: "Dispel Magic",
        level: 3,
        school: "Abjuration",
        casting_time: "1 action",
        range: "120 feet",
        components: "V, S",
        duration: "Instantaneous",
        description: "Any spell of 3rd level or lower on the chosen creature, object or magical effect ends.",
    },
    SpellDefinition {
        name: "Sending",
        level: 3,
        school: "Evocation",
        casting_time: "1 action",
        range: "Unlimited",
        components: "V, S, M",
        duration: "1 round",
        description: "You send a message of 25 words or fewer to a creature you are familiar with, and it can reply at once.",
    },
    SpellDefinition {
        name: "Major Image",
        level: 3,
        school: "Illusion",
        casting_time: "1 action",
        range: "120 feet",
        components: "V, S, M",
        duration: "Concentration, up to 10 minutes",
        description: "You create the image of an object, creature or phenomenon no larger than a 20-foot cube, complete with sound, smell and temperature.",
    },
    SpellDefinition {
        name: "Polymorph",
        level: 4,
        school: "Transmutation",
        casting_time: "1 action",
        range: "60 feet",
        components: "V, S, M",
        duration: "Concentration, up to 1 hour",
        description: "A creature is transformed into a beast whose challenge rating is no higher than its own level.",
    },
    SpellDefinition {
        name: "Dimension Door",
        level: 4,
        school: "Conjuration",
        casting_time: "1 action",
        range: "500 feet",
        components: "V",
        duration: "Instantaneous",
        description: "You teleport to an unoccupied spot within range, optionally bringing objects and one willing creature.",
    },
    SpellDefinition {
        name: "Freedom of Movement",
        level: 4,
        school: "Abjuration",
        casting_time: "1 action",
        range: "Touch",
        components: "V, S, M",
        duration: "1 hour",
        description: "The target's speed cannot be reduced by magic, and it cannot be paralyzed or restrained.",
    },
];

static LIBRARY_INDEX: LazyLock<HashMap<String, &'static SpellDefinition>> = LazyLock::new(|| {
    BARD_LIBRARY
        .iter()
        .map(|def| (def.name.to_lowercase(), def))
        .collect()
});

/// Every spell in the library, level ascending then name.
pub fn library() -> Vec<&'static SpellDefinition> {
    let mut spells: Vec<_> = BARD_LIBRARY.iter().collect();
    spells.sort_by(|a, b| a.level.cmp(&b.level).then_with(|| a.name.cmp(b.name)));
    spells
}

/// Look up a library spell by name (case-insensitive).
pub fn find_spell(name: &str) -> Option<&'static SpellDefinition> {
    LIBRARY_INDEX.get(&name.trim().to_lowercase()).copied()
}

/// Library spells the character does not know yet, optionally of one level.
pub fn learnable_spells(character: &Character, level: Option<u8>) -> Vec<&'static SpellDefinition> {
    library()
        .into_iter()
        .filter(|def| level.map_or(true, |l| def.level == l))
        .filter(|def| !character.knows_spell(def.name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::campaign;

    #[test]
    fn test_library_contents() {
        let all = library();
        assert_eq!(all.len(), 18);
        assert_eq!(all.iter().filter(|d| d.level == 0).count(), 3);
        assert_eq!(all.iter().filter(|d| d.level == 4).count(), 3);
        assert!(all.windows(2).all(|w| w[0].level <= w[1].level));
    }

    #[test]
    fn test_find_spell_is_case_insensitive() {
        let shatter = find_spell("SHATTER").unwrap();
        assert_eq!(shatter.name, "Shatter");
        assert_eq!(shatter.level, 2);
        assert!(find_spell("fireball").is_none());
    }

    #[test]
    fn test_learned_spell_is_an_owned_copy() {
        let def = find_spell("Heat Metal").unwrap();
        let mut spell = Spell::from(def);
        spell.description.push_str(" (edited)");
        assert_eq!(spell.school.as_deref(), Some("Transmutation"));
        assert!(!find_spell("Heat Metal").unwrap().description.ends_with("(edited)"));
    }

    #[test]
    fn test_custom_spell_defaults() {
        let spell = custom_spell("Crane's Closing Argument", 3, "");
        assert_eq!(spell.school.as_deref(), Some(CUSTOM_SPELL_SCHOOL));
        assert_eq!(spell.level, 3);
        assert!(!spell.description.is_empty());
    }

    #[test]
    fn test_learnable_spells_exclude_known() {
        let mut character = campaign::default_character();
        let before = learnable_spells(&character, Some(1)).len();
        character.spells.push(Spell::from(find_spell("Sleep").unwrap()));
        let after = learnable_spells(&character, Some(1));
        assert_eq!(after.len(), before - 1);
        assert!(after.iter().all(|d| d.name != "Sleep" && d.level == 1));
    }
}
