//! Static progression tables.
//!
//! Spell slots, known-spell limits, experience thresholds and the
//! skill-to-ability mapping. Every table is total over levels 1-20; levels
//! outside that range clamp to the nearest defined row.

use crate::world::{Ability, Skill};
use std::collections::BTreeMap;

/// Highest level the tables describe.
pub const MAX_LEVEL: u8 = 20;

/// Full-caster spell slots per character level, indexed by slot level - 1.
const SPELL_SLOTS: [&[u32]; MAX_LEVEL as usize] = [
    &[2],
    &[3],
    &[4, 2],
    &[4, 3],
    &[4, 3, 2],
    &[4, 3, 3],
    &[4, 3, 3, 1],
    &[4, 3, 3, 2],
    &[4, 3, 3, 3, 1],
    &[4, 3, 3, 3, 2],
    &[4, 3, 3, 3, 2, 1],
    &[4, 3, 3, 3, 2, 1],
    &[4, 3, 3, 3, 2, 1, 1],
    &[4, 3, 3, 3, 2, 1, 1],
    &[4, 3, 3, 3, 2, 1, 1, 1],
    &[4, 3, 3, 3, 2, 1, 1, 1],
    &[4, 3, 3, 3, 2, 1, 1, 1, 1],
    &[4, 3, 3, 3, 3, 1, 1, 1, 1],
    &[4, 3, 3, 3, 3, 2, 1, 1, 1],
    &[4, 3, 3, 3, 3, 2, 2, 1, 1],
];

/// (cantrips known, spells known) per character level.
const KNOWN_SPELLS: [(u32, u32); MAX_LEVEL as usize] = [
    (2, 4),
    (2, 5),
    (2, 6),
    (3, 7),
    (3, 8),
    (3, 9),
    (3, 10),
    (3, 11),
    (3, 12),
    (4, 14),
    (4, 15),
    (4, 15),
    (4, 16),
    (4, 18),
    (4, 19),
    (4, 19),
    (4, 20),
    (4, 22),
    (4, 22),
    (4, 22),
];

/// Cumulative experience required to reach each level.
const XP_THRESHOLDS: [u32; MAX_LEVEL as usize] = [
    0, 300, 900, 2_700, 6_500, 14_000, 23_000, 34_000, 48_000, 64_000, 85_000, 100_000, 120_000,
    140_000, 165_000, 195_000, 225_000, 265_000, 305_000, 355_000,
];

fn row(level: u8) -> usize {
    level.clamp(1, MAX_LEVEL) as usize - 1
}

/// Maximum spell slots for a character level, keyed by slot level.
pub fn spell_slots_for_level(level: u8) -> BTreeMap<u8, u32> {
    SPELL_SLOTS[row(level)]
        .iter()
        .enumerate()
        .map(|(i, &count)| (i as u8 + 1, count))
        .collect()
}

/// How many cantrips and leveled spells a character may know.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpellLimits {
    pub cantrips: u32,
    pub spells_known: u32,
}

/// Known-spell limits for a character level.
pub fn spell_limits(level: u8) -> SpellLimits {
    let (cantrips, spells_known) = KNOWN_SPELLS[row(level)];
    SpellLimits {
        cantrips,
        spells_known,
    }
}

/// Experience needed to reach `level`.
pub fn xp_for_level(level: u8) -> u32 {
    XP_THRESHOLDS[row(level)]
}

/// The highest level whose threshold `xp` meets.
pub fn level_for_xp(xp: u32) -> u8 {
    XP_THRESHOLDS
        .iter()
        .rposition(|&threshold| xp >= threshold)
        .map(|i| i as u8 + 1)
        .unwrap_or(1)
}

/// Experience still needed for the next level, or `None` at the cap.
pub fn xp_to_next_level(level: u8, xp: u32) -> Option<u32> {
    if level >= MAX_LEVEL {
        return None;
    }
    Some(xp_for_level(level + 1).saturating_sub(xp))
}

/// Proficiency bonus: `ceil(1 + level / 4)`.
pub fn proficiency_bonus(level: u8) -> i32 {
    1 + (level as i32 + 3) / 4
}

/// The ability a skill check draws its modifier from.
pub fn skill_ability(skill: Skill) -> Ability {
    match skill {
        Skill::Athletics => Ability::Strength,
        Skill::Acrobatics | Skill::SleightOfHand | Skill::Stealth => Ability::Dexterity,
        Skill::Arcana | Skill::History | Skill::Investigation | Skill::Nature | Skill::Religion => {
            Ability::Intelligence
        }
        Skill::AnimalHandling
        | Skill::Insight
        | Skill::Medicine
        | Skill::Perception
        | Skill::Survival => Ability::Wisdom,
        Skill::Deception | Skill::Intimidation | Skill::Performance | Skill::Persuasion => {
            Ability::Charisma
        }
    }
}
