//! Spell management outside of level-up.
//!
//! Learning respects the known-spell caps for the character's level,
//! forgetting needs an explicit confirmation, casting spends slots and
//! resting refills them.

use crate::spells::find_spell;
use crate::world::{Character, Spell};
use thiserror::Error;

/// Message sent through the turn pipeline after a long rest.
pub const LONG_REST_MESSAGE: &str =
    "I take a moment to rest and recover my strength (Long Rest complete: HP and spells restored).";

/// Rejections from spell management. None of these reach the narrator.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GrimoireError {
    #[error("Cannot learn more cantrips (limit {limit}); forget one or level up")]
    CantripLimitReached { limit: u32 },
    #[error("Cannot learn more spells (limit {limit}); forget one or level up")]
    SpellLimitReached { limit: u32 },
    #[error("{0} is already known")]
    AlreadyKnown(String),
    #[error("No level {level} spell slots remaining")]
    NoSlotsRemaining { level: u8 },
    #[error("Unknown spell: {0}")]
    UnknownSpell(String),
    #[error("No known spell at position {0}")]
    InvalidIndex(usize),
    #[error("Forgetting a spell must be confirmed")]
    NotConfirmed,
}

/// Whether the character has room for another spell of `level`.
pub fn can_learn(character: &Character, level: u8) -> Result<(), GrimoireError> {
    let limits = character.spell_limits();
    if level == 0 {
        if character.cantrips_known() >= limits.cantrips {
            return Err(GrimoireError::CantripLimitReached {
                limit: limits.cantrips,
            });
        }
    } else if character.spells_known() >= limits.spells_known {
        return Err(GrimoireError::SpellLimitReached {
            limit: limits.spells_known,
        });
    }
    Ok(())
}

/// Add a spell to the character's list, enforcing caps and uniqueness.
pub fn learn_spell(character: &mut Character, spell: Spell) -> Result<(), GrimoireError> {
    if character.knows_spell(&spell.name) {
        return Err(GrimoireError::AlreadyKnown(spell.name));
    }
    can_learn(character, spell.level)?;

    tracing::debug!(spell = %spell.name, level = spell.level, "learned spell");
    character.spells.push(spell);
    character.sort_spells();
    Ok(())
}

/// Copy a library spell into the character's list.
pub fn learn_from_library(character: &mut Character, name: &str) -> Result<(), GrimoireError> {
    let def = find_spell(name).ok_or_else(|| GrimoireError::UnknownSpell(name.to_string()))?;
    learn_spell(character, Spell::from(def))
}

/// Remove the spell at `index`. Nothing changes unless `confirmed` is set.
pub fn forget_spell(
    character: &mut Character,
    index: usize,
    confirmed: bool,
) -> Result<Spell, GrimoireError> {
    if index >= character.spells.len() {
        return Err(GrimoireError::InvalidIndex(index));
    }
    if !confirmed {
        return Err(GrimoireError::NotConfirmed);
    }
    let spell = character.spells.remove(index);
    tracing::debug!(spell = %spell.name, "forgot spell");
    Ok(spell)
}

/// Cast the spell at `index`, spending a slot unless it is a cantrip.
/// Returns the action text to send to the narrator.
pub fn cast_spell(character: &mut Character, index: usize) -> Result<String, GrimoireError> {
    let spell = character
        .spells
        .get(index)
        .ok_or(GrimoireError::InvalidIndex(index))?;
    let message = cast_message(spell);
    let level = spell.level;

    if level > 0 && !character.spell_slots.expend(level) {
        return Err(GrimoireError::NoSlotsRemaining { level });
    }
    Ok(message)
}

/// `I cast {name} (level {n})!`
pub fn cast_message(spell: &Spell) -> String {
    format!("I cast {} (level {})!", spell.name, spell.level)
}

/// Refill slots and hit points. Returns the action text to send.
pub fn long_rest(character: &mut Character) -> &'static str {
    character.long_rest();
    LONG_REST_MESSAGE
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::campaign::default_character;
    use crate::spells::custom_spell;

    fn index_of(character: &Character, name: &str) -> usize {
        character
            .spells
            .iter()
            .position(|s| s.name == name)
            .unwrap()
    }

    #[test]
    fn test_learn_cantrip_at_cap_is_rejected() {
        let mut character = default_character();
        assert_eq!(character.cantrips_known(), character.spell_limits().cantrips);
        let before = character.spells.clone();

        let result = learn_from_library(&mut character, "Minor Illusion");
        assert_eq!(result, Err(GrimoireError::CantripLimitReached { limit: 3 }));
        assert_eq!(character.spells, before);
    }

    #[test]
    fn test_learn_leveled_spell_until_cap() {
        let mut character = default_character();
        for name in ["Sleep", "Shatter", "Fear"] {
            learn_from_library(&mut character, name).unwrap();
        }
        assert_eq!(character.spells_known(), 8);

        let before = character.spells.clone();
        let result = learn_from_library(&mut character, "Sending");
        assert_eq!(result, Err(GrimoireError::SpellLimitReached { limit: 8 }));
        assert_eq!(character.spells, before);
    }

    #[test]
    fn test_learn_keeps_sorted_order() {
        let mut character = default_character();
        learn_from_library(&mut character, "Thunderwave").unwrap();
        learn_spell(&mut character, custom_spell("Aria of Apathy", 2, "")).unwrap();
        assert!(character
            .spells
            .windows(2)
            .all(|w| (w[0].level, &w[0].name) <= (w[1].level, &w[1].name)));
    }

    #[test]
    fn test_learn_rejects_duplicates_and_unknown() {
        let mut character = default_character();
        assert_eq!(
            learn_from_library(&mut character, "fireball"),
            Err(GrimoireError::UnknownSpell("fireball".to_string()))
        );
        learn_from_library(&mut character, "Sleep").unwrap();
        assert!(matches!(
            learn_from_library(&mut character, "sleep"),
            Err(GrimoireError::AlreadyKnown(_))
        ));
    }

    #[test]
    fn test_forget_requires_confirmation() {
        let mut character = default_character();
        let before = character.spells.clone();
        assert_eq!(
            forget_spell(&mut character, 0, false),
            Err(GrimoireError::NotConfirmed)
        );
        assert_eq!(character.spells, before);

        let forgotten = forget_spell(&mut character, 0, true).unwrap();
        assert_eq!(forgotten, before[0]);
        assert_eq!(character.spells.len(), before.len() - 1);

        assert_eq!(
            forget_spell(&mut character, 99, true),
            Err(GrimoireError::InvalidIndex(99))
        );
    }

    #[test]
    fn test_cast_spends_exactly_one_slot() {
        let mut character = default_character();
        let index = index_of(&character, "Suggestion");

        let message = cast_spell(&mut character, index).unwrap();
        assert_eq!(message, "I cast Suggestion (level 2)!");
        assert_eq!(character.spell_slots.remaining(2), 2);
        assert_eq!(character.spell_slots.remaining(1), 4);
        assert_eq!(character.spell_slots.remaining(3), 2);
    }

    #[test]
    fn test_cast_without_slots_is_rejected() {
        let mut character = default_character();
        let index = index_of(&character, "Tongues");
        character.spell_slots.current.insert(3, 0);
        let before = character.spell_slots.clone();

        assert_eq!(
            cast_spell(&mut character, index),
            Err(GrimoireError::NoSlotsRemaining { level: 3 })
        );
        assert_eq!(character.spell_slots, before);
    }

    #[test]
    fn test_cantrips_are_free() {
        let mut character = default_character();
        let index = index_of(&character, "Vicious Mockery");
        let before = character.spell_slots.clone();
        for _ in 0..10 {
            cast_spell(&mut character, index).unwrap();
        }
        assert_eq!(character.spell_slots, before);
    }

    #[test]
    fn test_long_rest_restores_everything() {
        let mut character = default_character();
        let index = index_of(&character, "Charm Person");
        cast_spell(&mut character, index).unwrap();
        character.adjust_hp(-20);

        let message = long_rest(&mut character);
        assert_eq!(message, LONG_REST_MESSAGE);
        assert_eq!(character.hp, character.max_hp);
        assert_eq!(character.spell_slots.current, character.spell_slots.max);
    }
}
