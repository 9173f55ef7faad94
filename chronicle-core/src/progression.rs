//! Level-up engine.
//!
//! When the reconciler sees the xp cross a threshold it hands back a
//! [`LevelUp`]. The player edits a [`LevelUpDraft`] of the spell list (no
//! caps apply here) and [`LevelUpDraft::finish`] produces the new sheet:
//! level set, hit points grown, slots refilled from the new table row and
//! spells sorted.

use crate::spells::{custom_spell, find_spell, learnable_spells, SpellDefinition, MAX_CUSTOM_SPELL_LEVEL};
use crate::tables::spell_slots_for_level;
use crate::world::{Ability, Character, Spell, SpellSlots};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Hit points gained per level before the constitution modifier.
pub const BASE_HP_PER_LEVEL: i64 = 5;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProgressionError {
    #[error("Spell name cannot be empty")]
    EmptyName,
    #[error("Custom spell level must be 0-5, got {0}")]
    InvalidSpellLevel(u8),
    #[error("No spell at position {0}")]
    InvalidIndex(usize),
    #[error("Unknown spell: {0}")]
    UnknownSpell(String),
    #[error("{0} is already in the spell list")]
    AlreadyKnown(String),
}

/// A detected level transition awaiting the player's choices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelUp {
    pub from_level: u8,
    pub to_level: u8,
    /// The sheet right after the turn that caused the level-up.
    pub character: Character,
}

impl LevelUp {
    pub fn new(from_level: u8, to_level: u8, character: Character) -> Self {
        Self {
            from_level,
            to_level,
            character,
        }
    }

    /// `(to - from) * (5 + con modifier)`, never negative.
    pub fn hp_gain(&self) -> u32 {
        let levels = self.to_level.saturating_sub(self.from_level) as i64;
        let per_level =
            BASE_HP_PER_LEVEL + self.character.ability_modifier(Ability::Constitution) as i64;
        (levels * per_level).max(0) as u32
    }

    pub fn new_slot_maximums(&self) -> BTreeMap<u8, u32> {
        spell_slots_for_level(self.to_level)
    }

    /// Start editing the spell list.
    pub fn draft(&self) -> LevelUpDraft {
        LevelUpDraft {
            level_up: self.clone(),
            spells: self.character.spells.clone(),
        }
    }
}

/// The player's in-progress spell choices for a level-up.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelUpDraft {
    level_up: LevelUp,
    spells: Vec<Spell>,
}

impl LevelUpDraft {
    pub fn level_up(&self) -> &LevelUp {
        &self.level_up
    }

    pub fn spells(&self) -> &[Spell] {
        &self.spells
    }

    fn contains(&self, name: &str) -> bool {
        self.spells
            .iter()
            .any(|s| s.name.eq_ignore_ascii_case(name.trim()))
    }

    /// Library spells not already in the draft, optionally of one level.
    pub fn available_library(&self, level: Option<u8>) -> Vec<&'static SpellDefinition> {
        let mut view = self.level_up.character.clone();
        view.spells = self.spells.clone();
        learnable_spells(&view, level)
    }

    pub fn add_from_library(&mut self, name: &str) -> Result<(), ProgressionError> {
        let def = find_spell(name).ok_or_else(|| ProgressionError::UnknownSpell(name.to_string()))?;
        self.push(Spell::from(def))
    }

    pub fn add_custom(
        &mut self,
        name: &str,
        level: u8,
        description: &str,
    ) -> Result<(), ProgressionError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ProgressionError::EmptyName);
        }
        if level > MAX_CUSTOM_SPELL_LEVEL {
            return Err(ProgressionError::InvalidSpellLevel(level));
        }
        self.push(custom_spell(name, level, description))
    }

    fn push(&mut self, spell: Spell) -> Result<(), ProgressionError> {
        if self.contains(&spell.name) {
            return Err(ProgressionError::AlreadyKnown(spell.name));
        }
        self.spells.push(spell);
        self.spells.sort_by(crate::world::spell_order);
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Result<Spell, ProgressionError> {
        if index >= self.spells.len() {
            return Err(ProgressionError::InvalidIndex(index));
        }
        Ok(self.spells.remove(index))
    }

    /// Assemble the leveled-up character.
    pub fn finish(self) -> Character {
        let gain = self.level_up.hp_gain();
        let slots = self.level_up.new_slot_maximums();
        let mut character = self.level_up.character;

        character.level = self.level_up.to_level;
        character.max_hp = character.max_hp.saturating_add(gain);
        character.hp = character.hp.saturating_add(gain).min(character.max_hp);
        character.spell_slots = SpellSlots::full(slots);
        character.spells = self.spells;
        character.sort_spells();

        tracing::info!(
            level = character.level,
            max_hp = character.max_hp,
            spells = character.spells.len(),
            "level-up confirmed"
        );
        character
    }
}

/// The `[SYSTEM]` turn sent after a level-up is confirmed.
pub fn level_up_message(character: &Character) -> String {
    format!(
        "[SYSTEM] I completed leveling up to level {}. My new max HP is {}. I learned new spells.",
        character.level, character.max_hp
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::campaign::default_character;

    fn level_up(from: u8, to: u8) -> LevelUp {
        let mut character = default_character();
        character.level = to;
        LevelUp::new(from, to, character)
    }

    #[test]
    fn test_level_five_to_six() {
        let up = level_up(5, 6);
        assert_eq!(up.hp_gain(), 7);

        let character = up.draft().finish();
        assert_eq!(character.level, 6);
        assert_eq!(character.max_hp, 45);
        assert_eq!(character.hp, 45);
        assert_eq!(character.spell_slots.max, spell_slots_for_level(6));
        assert_eq!(character.spell_slots.current, spell_slots_for_level(6));
    }

    #[test]
    fn test_slots_refilled_even_if_spent() {
        let mut up = level_up(5, 6);
        up.character.spell_slots.expend(1);
        up.character.spell_slots.expend(3);
        let character = up.draft().finish();
        assert_eq!(character.spell_slots.current, character.spell_slots.max);
    }

    #[test]
    fn test_multi_level_hp_gain() {
        assert_eq!(level_up(5, 7).hp_gain(), 14);
    }

    #[test]
    fn test_low_constitution_never_loses_hp() {
        let mut up = level_up(5, 6);
        up.character.abilities.constitution = 1;
        assert_eq!(up.hp_gain(), 0);
    }

    #[test]
    fn test_draft_ignores_caps_and_keeps_order() {
        let mut draft = level_up(5, 6).draft();
        for def in draft.available_library(None) {
            draft.add_from_library(def.name).unwrap();
        }
        draft.add_custom("Danny's Objection", 2, "").unwrap();

        let spells = draft.spells();
        assert!(spells
            .windows(2)
            .all(|w| crate::world::spell_order(&w[0], &w[1]).is_le()));
        assert!(draft.available_library(None).is_empty());

        let custom = spells.iter().find(|s| s.name == "Danny's Objection").unwrap();
        assert_eq!(custom.school.as_deref(), Some("general"));
        assert_eq!(custom.description, "A custom spell.");
    }

    #[test]
    fn test_draft_rejections() {
        let mut draft = level_up(5, 6).draft();
        assert_eq!(draft.add_custom("  ", 1, "x"), Err(ProgressionError::EmptyName));
        assert_eq!(
            draft.add_custom("Big", 6, "x"),
            Err(ProgressionError::InvalidSpellLevel(6))
        );
        assert_eq!(
            draft.add_custom("tongues", 3, ""),
            Err(ProgressionError::AlreadyKnown("tongues".to_string()))
        );
        assert!(matches!(
            draft.add_from_library("Wish"),
            Err(ProgressionError::UnknownSpell(_))
        ));
        let len = draft.spells().len();
        assert_eq!(draft.remove(len), Err(ProgressionError::InvalidIndex(len)));
    }

    #[test]
    fn test_removed_spell_is_gone_after_finish() {
        let mut draft = level_up(5, 6).draft();
        let removed = draft.remove(0).unwrap();
        let character = draft.finish();
        assert!(!character.knows_spell(&removed.name));
    }

    #[test]
    fn test_level_up_message() {
        let character = level_up(5, 6).draft().finish();
        assert_eq!(
            level_up_message(&character),
            "[SYSTEM] I completed leveling up to level 6. My new max HP is 45. I learned new spells."
        );
    }
}
